use orgroute_core::config::LoadOptions;
use orgroute_db::migrations;
use tracing::info;

use crate::commands::{
    build_runtime, load_config, open_pool, CommandResult, Failure, EXIT_MIGRATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("migrate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let pending = migrations::pending_versions(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        pool.close().await;
        Ok::<Vec<i64>, Failure>(pending)
    });

    match result {
        Ok(applied) => {
            info!(
                event_name = "cli.migrate.applied",
                applied = applied.len(),
                "database migrations applied"
            );
            let message = if applied.is_empty() {
                "schema already up to date".to_string()
            } else {
                format!("applied {} pending migration(s)", applied.len())
            };
            CommandResult::success_with_data(
                "migrate",
                message,
                Some(serde_json::json!({ "applied_versions": applied })),
            )
        }
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
