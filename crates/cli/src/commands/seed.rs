use orgroute_core::config::LoadOptions;
use orgroute_db::{migrations, OrgSeedDataset, SeedRoute};

use crate::commands::{
    build_runtime, load_config, open_pool, CommandResult, Failure, EXIT_MIGRATION,
    EXIT_VERIFICATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seed_result = OrgSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

        let verification = OrgSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

        let run_result: Result<Vec<SeedRoute>, Failure> = if verification.all_present {
            Ok(seed_result.routes)
        } else {
            Err((
                "seed_verification",
                verification_message(&verification.checks),
                EXIT_VERIFICATION,
            ))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(routes) => {
            let route_lines: Vec<String> = routes
                .iter()
                .map(|route| {
                    format!(
                        "  - employee {} -> user {} via {} ({})",
                        route.requester_employee_id,
                        route.expected_approver_user_id,
                        route.strategy,
                        route.description
                    )
                })
                .collect();
            let message = format!(
                "demo organisation loaded; expected routes:\n{}",
                route_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
