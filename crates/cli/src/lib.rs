pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use orgroute_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "orgroute",
    about = "Orgroute operator CLI",
    long_about = "Resolve approvers over the organisation hierarchy, preview approval chains, and \
                  manage the backing database.",
    after_help = "Examples:\n  orgroute migrate\n  orgroute resolve --employee 1\n  orgroute step \
                  --employee 1 --slots '[{\"type\":\"role\",\"value\":7}]'\n  orgroute doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an orgroute.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo organisation and verify it")]
    Seed,
    #[command(about = "Find the next approver above an employee")]
    Resolve {
        #[arg(long, help = "Requester employee id")]
        employee: i64,
        #[arg(long, help = "Minimum authority level (defaults to the requester's level + 1)")]
        min_level: Option<i64>,
    },
    #[command(about = "Preview every potential approver above an employee, lowest level first")]
    Chain {
        #[arg(long, help = "Requester employee id")]
        employee: i64,
    },
    #[command(about = "Expand a workflow step's approval slots for an employee")]
    Step {
        #[arg(long, help = "Requester employee id")]
        employee: i64,
        #[arg(long, help = "JSON array of slots, e.g. [{\"type\":\"user\",\"value\":42}]")]
        slots: String,
        #[arg(long = "sector", help = "Restrict position slots to this sector (repeatable)")]
        sectors: Vec<i64>,
        #[arg(long = "unit", help = "Restrict position slots to this unit (repeatable)")]
        units: Vec<i64>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity, schema and org data")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    // A config error here is reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        if let Err(error) = logging::init(&config.logging) {
            eprintln!("logging disabled: {error:#}");
        }
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Resolve { employee, min_level } => {
            commands::resolve::run(&options, employee, min_level)
        }
        Command::Chain { employee } => commands::chain::run(&options, employee),
        Command::Step { employee, slots, sectors, units } => {
            commands::step::run(&options, employee, &slots, sectors, units)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
