use orgroute_core::approvals::SlotScopeFilter;
use orgroute_core::config::LoadOptions;
use orgroute_core::domain::org::{EmployeeId, SectorId, UnitId};
use orgroute_core::domain::slot::ApprovalSlot;

use crate::commands::{
    application_failure, build_runtime, load_config, open_pool, routing_service, CommandResult,
    Failure, EXIT_INVALID_INPUT, EXIT_RESOLUTION,
};

pub fn run(
    options: &LoadOptions,
    employee: i64,
    slots_json: &str,
    sectors: Vec<i64>,
    units: Vec<i64>,
) -> CommandResult {
    let slots = match parse_slots(slots_json) {
        Ok(slots) => slots,
        Err(message) => {
            return CommandResult::failure("step", "invalid_input", message, EXIT_INVALID_INPUT)
        }
    };
    let scope_filter = SlotScopeFilter {
        sectors: (!sectors.is_empty()).then(|| sectors.into_iter().map(SectorId).collect()),
        units: (!units.is_empty()).then(|| units.into_iter().map(UnitId).collect()),
    };

    let config = match load_config("step", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("step") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let requester = EmployeeId(employee);
    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let service = routing_service(&config, pool.clone());
        let approvers = service.resolve_step_approvers(&slots, requester, &scope_filter).await;
        pool.close().await;
        Ok::<_, Failure>(approvers)
    });

    match result {
        Ok(Ok(approvers)) => {
            let resolved = approvers.iter().filter(|approver| approver.is_resolved()).count();
            CommandResult::success_with_data(
                "step",
                format!(
                    "{resolved} approver(s) resolved, {} unresolved for employee {requester}",
                    approvers.len() - resolved
                ),
                Some(serde_json::json!({
                    "requester_employee_id": employee,
                    "approvers": approvers,
                })),
            )
        }
        Ok(Err(error)) => application_failure("step", error, EXIT_RESOLUTION),
        Err(failure) => CommandResult::from_failure("step", failure),
    }
}

fn parse_slots(raw: &str) -> Result<Vec<ApprovalSlot>, String> {
    serde_json::from_str(raw).map_err(|error| format!("invalid --slots JSON: {error}"))
}

#[cfg(test)]
mod tests {
    use orgroute_core::domain::org::{RoleId, UserId};
    use orgroute_core::domain::slot::ApprovalSlot;

    use super::parse_slots;

    #[test]
    fn parses_tagged_slot_list() {
        let raw = r#"[{"type":"user","value":42},{"type":"role","value":7}]"#;
        let slots = parse_slots(raw).expect("parse");
        assert_eq!(slots, vec![ApprovalSlot::User(UserId(42)), ApprovalSlot::Role(RoleId(7))]);
    }

    #[test]
    fn rejects_unknown_kinds_and_bad_levels() {
        assert!(parse_slots(r#"[{"type":"committee","value":1}]"#).is_err());
        assert!(parse_slots(r#"[{"type":"hierarchical","value":101}]"#).is_err());
        assert!(parse_slots("not json").is_err());
    }
}
