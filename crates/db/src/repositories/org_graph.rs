use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use orgroute_core::domain::org::{
    AuthorityLevel, DesignationId, DesignationRecord, EmployeeId, Position, PositionId, RoleId,
    SectorId, Unit, UnitId, UserAccount, UserId, UNCONFIGURED_AUTHORITY_LEVEL,
};
use orgroute_core::org_graph::{DesignationFilter, OrgGraphError, OrgGraphReader};

use super::RepositoryError;
use crate::DbPool;

const DESIGNATION_SELECT: &str = "SELECT d.id, d.employee_id, us.id AS user_id, d.unit_id,
        u.sector_id AS unit_sector_id, COALESCE(u.is_active, 0) AS unit_active,
        d.position_id, p.sector_id AS position_sector_id, p.authority_level,
        d.is_primary, d.is_active, d.start_date, d.end_date
 FROM designations d
 JOIN positions p ON p.id = d.position_id
 LEFT JOIN units u ON u.id = d.unit_id
 LEFT JOIN users us ON us.employee_id = d.employee_id";

pub struct SqlOrgGraphReader {
    pool: DbPool,
}

/// Row counts used by readiness checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrgSummary {
    pub active_units: i64,
    pub active_designations: i64,
    pub users: i64,
}

impl SqlOrgGraphReader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn summary(&self) -> Result<OrgSummary, RepositoryError> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(1) FROM units WHERE is_active = 1) AS active_units,
                    (SELECT COUNT(1) FROM designations WHERE is_active = 1) AS active_designations,
                    (SELECT COUNT(1) FROM users) AS users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrgSummary {
            active_units: decode(&row, "active_units")?,
            active_designations: decode(&row, "active_designations")?,
            users: decode(&row, "users")?,
        })
    }

    async fn load_primary(
        &self,
        employee: EmployeeId,
        as_of: NaiveDate,
    ) -> Result<Option<DesignationRecord>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(DESIGNATION_SELECT);
        query.push(" WHERE d.employee_id = ").push_bind(employee.0);
        query.push(" AND d.is_primary = 1");
        push_current(&mut query, as_of, false);
        query.push(" ORDER BY d.id LIMIT 1");

        let row = query.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_designation).transpose()
    }

    async fn load_designations(
        &self,
        filter: &DesignationFilter,
    ) -> Result<Vec<DesignationRecord>, RepositoryError> {
        if filter.units.as_ref().is_some_and(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(DESIGNATION_SELECT);
        query.push(" WHERE 1 = 1");

        if let Some(units) = &filter.units {
            query.push(" AND d.unit_id IN (");
            let mut separated = query.separated(", ");
            for unit in units {
                separated.push_bind(unit.0);
            }
            separated.push_unseparated(")");
        }
        if let Some(position) = filter.position {
            query.push(" AND d.position_id = ").push_bind(position.0);
        }
        if filter.system_wide_only {
            query.push(" AND p.sector_id IS NULL");
        }
        if let Some(level) = filter.min_authority_level {
            query
                .push(" AND COALESCE(p.authority_level, ")
                .push_bind(i64::from(UNCONFIGURED_AUTHORITY_LEVEL))
                .push(") >= ")
                .push_bind(i64::from(level));
        }
        if filter.primary_only {
            query.push(" AND d.is_primary = 1");
        }
        if let Some(as_of) = filter.active_on {
            push_current(&mut query, as_of, true);
        }
        query.push(" ORDER BY d.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_designation).collect()
    }

    async fn load_unit(&self, unit: UnitId) -> Result<Option<Unit>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, sector_id, parent_unit_id, is_active FROM units WHERE id = ?",
        )
        .bind(unit.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Unit {
                id: UnitId(decode(&row, "id")?),
                name: decode(&row, "name")?,
                sector_id: SectorId(decode(&row, "sector_id")?),
                parent_unit_id: decode::<Option<i64>>(&row, "parent_unit_id")?.map(UnitId),
                active: decode(&row, "is_active")?,
            })
        })
        .transpose()
    }

    async fn load_position(
        &self,
        position: PositionId,
    ) -> Result<Option<Position>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, sector_id, authority_level FROM positions WHERE id = ?")
                .bind(position.0)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| {
            Ok(Position {
                id: PositionId(decode(&row, "id")?),
                name: decode(&row, "name")?,
                sector_id: decode::<Option<i64>>(&row, "sector_id")?.map(SectorId),
                authority_level: authority_level(&row)?,
            })
        })
        .transpose()
    }

    async fn load_user(&self, user: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, employee_id FROM users WHERE id = ?")
            .bind(user.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(UserAccount {
                id: UserId(decode(&row, "id")?),
                username: decode(&row, "username")?,
                employee_id: decode::<Option<i64>>(&row, "employee_id")?.map(EmployeeId),
            })
        })
        .transpose()
    }
}

/// Date window and active flags; `require_active_unit` also drops designations in
/// deactivated units.
fn push_current(query: &mut QueryBuilder<'_, Sqlite>, as_of: NaiveDate, require_active_unit: bool) {
    query.push(" AND d.is_active = 1 AND d.start_date <= ").push_bind(as_of);
    query.push(" AND (d.end_date IS NULL OR d.end_date >= ").push_bind(as_of).push(")");
    if require_active_unit {
        query.push(" AND (d.unit_id IS NULL OR u.is_active = 1)");
    }
}

fn decode<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn authority_level(row: &SqliteRow) -> Result<AuthorityLevel, RepositoryError> {
    match decode::<Option<i64>>(row, "authority_level")? {
        Some(value) => {
            AuthorityLevel::new(value).map_err(|e| RepositoryError::Decode(e.to_string()))
        }
        None => Ok(UNCONFIGURED_AUTHORITY_LEVEL),
    }
}

fn row_to_designation(row: &SqliteRow) -> Result<DesignationRecord, RepositoryError> {
    Ok(DesignationRecord {
        id: DesignationId(decode(row, "id")?),
        employee_id: EmployeeId(decode(row, "employee_id")?),
        user_id: decode::<Option<i64>>(row, "user_id")?.map(UserId),
        unit_id: decode::<Option<i64>>(row, "unit_id")?.map(UnitId),
        unit_sector_id: decode::<Option<i64>>(row, "unit_sector_id")?.map(SectorId),
        unit_active: decode(row, "unit_active")?,
        position_id: PositionId(decode(row, "position_id")?),
        position_sector_id: decode::<Option<i64>>(row, "position_sector_id")?.map(SectorId),
        authority_level: authority_level(row)?,
        is_primary: decode(row, "is_primary")?,
        is_active: decode(row, "is_active")?,
        start_date: decode(row, "start_date")?,
        end_date: decode(row, "end_date")?,
    })
}

#[async_trait]
impl OrgGraphReader for SqlOrgGraphReader {
    async fn primary_active_designation(
        &self,
        employee: EmployeeId,
        as_of: NaiveDate,
    ) -> Result<Option<DesignationRecord>, OrgGraphError> {
        Ok(self.load_primary(employee, as_of).await?)
    }

    async fn find_designations(
        &self,
        filter: &DesignationFilter,
    ) -> Result<Vec<DesignationRecord>, OrgGraphError> {
        Ok(self.load_designations(filter).await?)
    }

    async fn unit(&self, unit: UnitId) -> Result<Option<Unit>, OrgGraphError> {
        Ok(self.load_unit(unit).await?)
    }

    async fn unit_parent(&self, unit: UnitId) -> Result<Option<UnitId>, OrgGraphError> {
        let parent: Option<Option<i64>> =
            sqlx::query_scalar("SELECT parent_unit_id FROM units WHERE id = ?")
                .bind(unit.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?;
        Ok(parent.flatten().map(UnitId))
    }

    async fn units_in_sector(&self, sector: SectorId) -> Result<Vec<UnitId>, OrgGraphError> {
        let units: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM units WHERE sector_id = ? ORDER BY id")
                .bind(sector.0)
                .fetch_all(&self.pool)
                .await
                .map_err(RepositoryError::from)?;
        Ok(units.into_iter().map(UnitId).collect())
    }

    async fn position(&self, position: PositionId) -> Result<Option<Position>, OrgGraphError> {
        Ok(self.load_position(position).await?)
    }

    async fn user(&self, user: UserId) -> Result<Option<UserAccount>, OrgGraphError> {
        Ok(self.load_user(user).await?)
    }

    async fn role_exists(&self, role: RoleId) -> Result<bool, OrgGraphError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?)")
            .bind(role.0)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(exists == 1)
    }

    async fn user_has_role(&self, user: UserId, role: RoleId) -> Result<bool, OrgGraphError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ? AND role_id = ?)",
        )
        .bind(user.0)
        .bind(role.0)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(exists == 1)
    }
}
