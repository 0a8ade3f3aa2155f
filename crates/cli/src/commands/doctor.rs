use orgroute_core::config::{AppConfig, LoadOptions};
use orgroute_db::{connect_from_config, migrations, DbPool, SqlOrgGraphReader};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_VERIFICATION};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] = ["database_connectivity", "migrations_current", "org_data"];

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_VERIFICATION };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(
                DATABASE_CHECKS
                    .into_iter()
                    .map(|name| DoctorCheck::skipped(name, "configuration did not load")),
            );
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("migrations_current", "the runtime did not start"),
                DoctorCheck::skipped("org_data", "the runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("migrations_current", "the database is unreachable"),
                    DoctorCheck::skipped("org_data", "the database is unreachable"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        )];

        let schema_current = match migrations::pending_versions(&pool).await {
            Ok(pending) if pending.is_empty() => {
                checks.push(DoctorCheck::pass("migrations_current", "no pending migrations"));
                true
            }
            Ok(pending) => {
                checks.push(DoctorCheck::fail(
                    "migrations_current",
                    format!("pending migrations {pending:?}; run `orgroute migrate`"),
                ));
                false
            }
            Err(error) => {
                checks.push(DoctorCheck::fail(
                    "migrations_current",
                    format!("could not read migration state: {error}"),
                ));
                false
            }
        };

        if schema_current {
            checks.push(check_org_data(&pool).await);
        } else {
            checks.push(DoctorCheck::skipped("org_data", "the schema is not current"));
        }

        pool.close().await;
        checks
    })
}

async fn check_org_data(pool: &DbPool) -> DoctorCheck {
    match SqlOrgGraphReader::new(pool.clone()).summary().await {
        Ok(summary) if summary.active_units == 0 || summary.active_designations == 0 => {
            DoctorCheck::fail(
                "org_data",
                "no active units or designations; load an org or run `orgroute seed`",
            )
        }
        Ok(summary) => DoctorCheck::pass(
            "org_data",
            format!(
                "{} active unit(s), {} active designation(s), {} user(s)",
                summary.active_units, summary.active_designations, summary.users
            ),
        ),
        Err(error) => DoctorCheck::fail("org_data", format!("could not read org data: {error}")),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
