use orgroute_core::config::LoadOptions;
use orgroute_core::domain::org::EmployeeId;

use crate::commands::{
    application_failure, build_runtime, load_config, open_pool, routing_service, CommandResult,
    Failure, EXIT_RESOLUTION,
};

pub fn run(options: &LoadOptions, employee: i64) -> CommandResult {
    let config = match load_config("chain", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("chain") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let requester = EmployeeId(employee);
    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let service = routing_service(&config, pool.clone());
        let chain = service.approval_chain(requester).await;
        pool.close().await;
        Ok::<_, Failure>(chain)
    });

    match result {
        Ok(Ok(chain)) => CommandResult::success_with_data(
            "chain",
            format!("{} potential approver(s) above employee {requester}", chain.len()),
            Some(serde_json::json!({ "requester_employee_id": employee, "chain": chain })),
        ),
        Ok(Err(error)) => application_failure("chain", error, EXIT_RESOLUTION),
        Err(failure) => CommandResult::from_failure("chain", failure),
    }
}
