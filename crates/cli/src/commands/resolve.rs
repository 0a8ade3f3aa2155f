use orgroute_core::config::LoadOptions;
use orgroute_core::domain::org::{AuthorityLevel, EmployeeId};

use crate::commands::{
    application_failure, build_runtime, load_config, open_pool, routing_service, CommandResult,
    Failure, EXIT_INVALID_INPUT, EXIT_RESOLUTION,
};

pub fn run(options: &LoadOptions, employee: i64, min_level: Option<i64>) -> CommandResult {
    let min_level = match min_level.map(AuthorityLevel::new).transpose() {
        Ok(min_level) => min_level,
        Err(error) => return application_failure("resolve", error, EXIT_INVALID_INPUT),
    };
    let config = match load_config("resolve", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("resolve") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let requester = EmployeeId(employee);
    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let service = routing_service(&config, pool.clone());
        let approver = service.resolve_next_approver(requester, min_level).await;
        pool.close().await;
        Ok::<_, Failure>(approver)
    });

    match result {
        Ok(Ok(approver)) => {
            let message = match approver {
                Some(user) => format!("employee {requester} routes to user {user}"),
                None => format!("no approver found above employee {requester}"),
            };
            CommandResult::success_with_data(
                "resolve",
                message,
                Some(serde_json::json!({
                    "requester_employee_id": employee,
                    "min_level": min_level,
                    "approver_user_id": approver,
                })),
            )
        }
        Ok(Err(error)) => application_failure("resolve", error, EXIT_RESOLUTION),
        Err(failure) => CommandResult::from_failure("resolve", failure),
    }
}
