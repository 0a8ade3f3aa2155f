use std::sync::Arc;

use chrono::NaiveDate;

use orgroute_core::approvals::{ApprovalRoutingService, AuthorityResolver, SlotScopeFilter};
use orgroute_core::domain::org::{EmployeeId, RoleId, UserId};
use orgroute_core::domain::slot::{ApprovalSlot, EscalationReason, SlotDiagnostic};
use orgroute_db::fixtures::SEED_ROUTES;
use orgroute_db::{connect_with_settings, migrations, OrgSeedDataset, SqlOrgGraphReader};

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require_eq {
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

async fn seeded_service() -> ContractResult<ApprovalRoutingService> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    OrgSeedDataset::load(&pool).await.map_err(|error| format!("seed: {error}"))?;

    let authority = AuthorityResolver::new(Arc::new(SqlOrgGraphReader::new(pool)))
        .with_reference_date(reference_date());
    Ok(ApprovalRoutingService::from_authority(authority))
}

#[tokio::test]
async fn seeded_routes_resolve_through_sql_reader() -> ContractResult {
    let service = seeded_service().await?;

    for route in SEED_ROUTES {
        let approver = service
            .authority()
            .find_approver(EmployeeId(route.requester_employee_id), None)
            .await
            .map_err(|error| format!("resolve {}: {error}", route.requester_employee_id))?
            .ok_or_else(|| format!("no approver for {}", route.description))?;

        require_eq!(
            approver.user_id,
            Some(UserId(route.expected_approver_user_id)),
            "{}: expected user {}, got {:?}",
            route.description,
            route.expected_approver_user_id,
            approver.user_id
        );
        let strategy = approver.provenance.strategy.map(|strategy| strategy.as_str());
        require_eq!(
            strategy,
            Some(route.strategy),
            "{}: expected strategy {}, got {:?}",
            route.description,
            route.strategy,
            strategy
        );
    }
    Ok(())
}

#[tokio::test]
async fn president_has_no_approver() -> ContractResult {
    let service = seeded_service().await?;
    let next = service
        .resolve_next_approver(EmployeeId(7), None)
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(next, None, "president should have nobody above them, got {next:?}");
    Ok(())
}

#[tokio::test]
async fn step_slots_resolve_against_sql_reader() -> ContractResult {
    let service = seeded_service().await?;
    let slots = [
        ApprovalSlot::User(UserId(101)),
        ApprovalSlot::Role(RoleId(7)),
        ApprovalSlot::Role(RoleId(404)),
    ];

    let approvers = service
        .resolve_step_approvers(&slots, EmployeeId(1), &SlotScopeFilter::default())
        .await
        .map_err(|error| error.to_string())?;

    let users: Vec<_> = approvers.iter().filter_map(|approver| approver.user_id).collect();
    require_eq!(users, vec![UserId(103), UserId(102)], "unexpected approvers {users:?}");
    require_eq!(
        approvers[0].escalation,
        Some(EscalationReason::SelfApproval),
        "self slot should escalate"
    );
    require_eq!(
        approvers.last().and_then(|approver| approver.diagnostic),
        Some(SlotDiagnostic::UnknownRole),
        "unknown role should pass through unresolved"
    );
    Ok(())
}

#[tokio::test]
async fn chain_preview_is_sorted_by_level() -> ContractResult {
    let service = seeded_service().await?;
    let chain = service.approval_chain(EmployeeId(1)).await.map_err(|error| error.to_string())?;

    let users: Vec<_> = chain.iter().filter_map(|approver| approver.user_id).collect();
    require_eq!(
        users,
        vec![UserId(104), UserId(103), UserId(111), UserId(107)],
        "unexpected chain {users:?}"
    );
    Ok(())
}
