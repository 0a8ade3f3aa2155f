use sqlx::Executor;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

struct SeedUnit {
    id: i64,
    sector_id: i64,
    parent_unit_id: Option<i64>,
}

struct SeedDesignation {
    id: i64,
    employee_id: i64,
    unit_id: i64,
    position_id: i64,
    is_primary: bool,
    is_active: bool,
}

const SEED_SECTOR_IDS: &[i64] = &[1, 2];

const SEED_UNITS: &[SeedUnit] = &[
    SeedUnit { id: 1, sector_id: 2, parent_unit_id: None },
    SeedUnit { id: 10, sector_id: 1, parent_unit_id: None },
    SeedUnit { id: 11, sector_id: 1, parent_unit_id: Some(10) },
    SeedUnit { id: 12, sector_id: 1, parent_unit_id: Some(10) },
    SeedUnit { id: 20, sector_id: 2, parent_unit_id: Some(1) },
    SeedUnit { id: 30, sector_id: 1, parent_unit_id: None },
];

const SEED_POSITION_IDS: &[i64] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

const SEED_USER_IDS: &[i64] = &[101, 102, 103, 104, 105, 106, 107, 111];

const SEED_USER_ROLES: &[(i64, i64)] = &[(101, 7), (102, 7), (105, 8), (106, 8)];

const SEED_DESIGNATIONS: &[SeedDesignation] = &[
    SeedDesignation {
        id: 1,
        employee_id: 1,
        unit_id: 11,
        position_id: 1,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 2,
        employee_id: 2,
        unit_id: 11,
        position_id: 1,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 3,
        employee_id: 3,
        unit_id: 10,
        position_id: 3,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 4,
        employee_id: 4,
        unit_id: 12,
        position_id: 2,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 5,
        employee_id: 5,
        unit_id: 20,
        position_id: 4,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 6,
        employee_id: 6,
        unit_id: 20,
        position_id: 5,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 7,
        employee_id: 7,
        unit_id: 1,
        position_id: 6,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 8,
        employee_id: 8,
        unit_id: 11,
        position_id: 2,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 11,
        employee_id: 11,
        unit_id: 30,
        position_id: 8,
        is_primary: true,
        is_active: true,
    },
    SeedDesignation {
        id: 12,
        employee_id: 3,
        unit_id: 11,
        position_id: 7,
        is_primary: false,
        is_active: true,
    },
    SeedDesignation {
        id: 13,
        employee_id: 4,
        unit_id: 10,
        position_id: 3,
        is_primary: true,
        is_active: false,
    },
];

/// Routing outcomes the demo organisation is built to exercise, one per search tier.
pub const SEED_ROUTES: &[SeedRoute] = &[
    SeedRoute {
        requester_employee_id: 1,
        expected_approver_user_id: 103,
        strategy: "ancestor_chain",
        description: "BSCS faculty routes past a userless program chair to the dean",
    },
    SeedRoute {
        requester_employee_id: 4,
        expected_approver_user_id: 103,
        strategy: "ancestor_chain",
        description: "BSIT program chair routes to the dean",
    },
    SeedRoute {
        requester_employee_id: 5,
        expected_approver_user_id: 106,
        strategy: "same_unit",
        description: "HR officer routes to the HR director in the same office",
    },
    SeedRoute {
        requester_employee_id: 3,
        expected_approver_user_id: 107,
        strategy: "system_wide",
        description: "Dean of a root unit routes to the university president",
    },
    SeedRoute {
        requester_employee_id: 11,
        expected_approver_user_id: 107,
        strategy: "system_wide",
        description: "Research director routes to the university president",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedRoute {
    pub requester_employee_id: i64,
    pub expected_approver_user_id: i64,
    pub strategy: &'static str,
    pub description: &'static str,
}

/// Demo organisation for local runs and CLI smoke checks.
///
/// A university with an academic and an administrative sector, a userless designation, a
/// secondary designation and an ended one, so every filter the resolver applies has a row to
/// reject.
pub struct OrgSeedDataset;

impl OrgSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/org_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        info!(
            event_name = "db.seed.loaded",
            units = SEED_UNITS.len(),
            designations = SEED_DESIGNATIONS.len(),
            "org seed dataset loaded"
        );

        Ok(SeedResult {
            units_seeded: SEED_UNITS.len(),
            designations_seeded: SEED_DESIGNATIONS.len(),
            routes: SEED_ROUTES.to_vec(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("sectors", count_ids(pool, "sectors", SEED_SECTOR_IDS).await?));
        let unit_ids: Vec<i64> = SEED_UNITS.iter().map(|unit| unit.id).collect();
        checks.push(("units", count_ids(pool, "units", &unit_ids).await?));
        checks.push(("positions", count_ids(pool, "positions", SEED_POSITION_IDS).await?));
        checks.push(("users", count_ids(pool, "users", SEED_USER_IDS).await?));

        let mut hierarchy_ok = true;
        for unit in SEED_UNITS {
            let linked: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM units WHERE id = ?1 AND sector_id = ?2 AND parent_unit_id IS ?3)",
            )
            .bind(unit.id)
            .bind(unit.sector_id)
            .bind(unit.parent_unit_id)
            .fetch_one(pool)
            .await?;
            hierarchy_ok &= linked == 1;
        }
        checks.push(("unit-hierarchy", hierarchy_ok));

        let mut roles_ok = true;
        for (user_id, role_id) in SEED_USER_ROLES {
            let granted: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ?1 AND role_id = ?2)",
            )
            .bind(user_id)
            .bind(role_id)
            .fetch_one(pool)
            .await?;
            roles_ok &= granted == 1;
        }
        checks.push(("role-grants", roles_ok));

        let mut designations_ok = true;
        for designation in SEED_DESIGNATIONS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM designations
                 WHERE id = ?1 AND employee_id = ?2 AND unit_id = ?3 AND position_id = ?4
                   AND is_primary = ?5 AND is_active = ?6)",
            )
            .bind(designation.id)
            .bind(designation.employee_id)
            .bind(designation.unit_id)
            .bind(designation.position_id)
            .bind(designation.is_primary)
            .bind(designation.is_active)
            .fetch_one(pool)
            .await?;
            designations_ok &= present == 1;
        }
        checks.push(("designations", designations_ok));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[i64]) -> Result<bool, RepositoryError> {
    let mut query = sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT COUNT(1) FROM ");
    query.push(table).push(" WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let count: i64 = query.build_query_scalar().fetch_one(pool).await?;
    Ok(count == ids.len() as i64)
}

#[derive(Debug)]
pub struct SeedResult {
    pub units_seeded: usize,
    pub designations_seeded: usize,
    pub routes: Vec<SeedRoute>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
