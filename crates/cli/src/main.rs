use std::process::ExitCode;

fn main() -> ExitCode {
    orgroute_cli::run()
}
