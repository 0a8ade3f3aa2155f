//! Read-only view of the organization structure consumed by the approval resolvers.
//!
//! Storage lives elsewhere; `InMemoryOrgGraph` backs tests and fixtures while the SQL adapter
//! lives in `orgroute-db`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::org::{
    AuthorityLevel, DesignationId, DesignationRecord, EmployeeId, Position, PositionId, RoleId,
    SectorId, Unit, UnitId, UserAccount, UserId,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrgGraphError {
    #[error("org graph storage failure: {0}")]
    Storage(String),
    #[error("org graph decode failure: {0}")]
    Decode(String),
}

/// Conditions a designation must satisfy. Unset fields do not constrain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesignationFilter {
    pub units: Option<Vec<UnitId>>,
    pub position: Option<PositionId>,
    pub system_wide_only: bool,
    pub min_authority_level: Option<AuthorityLevel>,
    pub primary_only: bool,
    pub active_on: Option<NaiveDate>,
}

impl DesignationFilter {
    pub fn in_unit(unit: UnitId) -> Self {
        Self { units: Some(vec![unit]), ..Self::default() }
    }

    pub fn in_units(units: Vec<UnitId>) -> Self {
        Self { units: Some(units), ..Self::default() }
    }

    pub fn system_wide() -> Self {
        Self { system_wide_only: true, ..Self::default() }
    }

    pub fn with_position(mut self, position: PositionId) -> Self {
        self.position = Some(position);
        self
    }

    pub fn at_least(mut self, level: AuthorityLevel) -> Self {
        self.min_authority_level = Some(level);
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_only = true;
        self
    }

    pub fn active_on(mut self, as_of: NaiveDate) -> Self {
        self.active_on = Some(as_of);
        self
    }

    pub fn matches(&self, record: &DesignationRecord) -> bool {
        if let Some(units) = &self.units {
            match record.unit_id {
                Some(unit_id) if units.contains(&unit_id) => {}
                _ => return false,
            }
        }

        if self.position.is_some_and(|position| position != record.position_id) {
            return false;
        }

        if self.system_wide_only && !record.is_system_wide() {
            return false;
        }

        if self.min_authority_level.is_some_and(|level| record.authority_level < level) {
            return false;
        }

        if self.primary_only && !record.is_primary {
            return false;
        }

        if let Some(as_of) = self.active_on {
            if !record.is_current(as_of) || (record.unit_id.is_some() && !record.unit_active) {
                return false;
            }
        }

        true
    }
}

#[async_trait]
pub trait OrgGraphReader: Send + Sync {
    async fn primary_active_designation(
        &self,
        employee: EmployeeId,
        as_of: NaiveDate,
    ) -> Result<Option<DesignationRecord>, OrgGraphError>;

    async fn find_designations(
        &self,
        filter: &DesignationFilter,
    ) -> Result<Vec<DesignationRecord>, OrgGraphError>;

    async fn unit(&self, unit: UnitId) -> Result<Option<Unit>, OrgGraphError>;

    async fn unit_parent(&self, unit: UnitId) -> Result<Option<UnitId>, OrgGraphError>;

    async fn units_in_sector(&self, sector: SectorId) -> Result<Vec<UnitId>, OrgGraphError>;

    async fn position(&self, position: PositionId) -> Result<Option<Position>, OrgGraphError>;

    async fn user(&self, user: UserId) -> Result<Option<UserAccount>, OrgGraphError>;

    async fn role_exists(&self, role: RoleId) -> Result<bool, OrgGraphError>;

    async fn user_has_role(&self, user: UserId, role: RoleId) -> Result<bool, OrgGraphError>;
}

#[derive(Clone, Debug)]
pub struct NewDesignation {
    pub id: i64,
    pub employee_id: EmployeeId,
    pub unit_id: Option<UnitId>,
    pub position_id: PositionId,
    pub is_primary: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
struct GraphState {
    units: HashMap<UnitId, Unit>,
    positions: HashMap<PositionId, Position>,
    users: HashMap<UserId, UserAccount>,
    roles: HashSet<RoleId>,
    user_roles: HashSet<(UserId, RoleId)>,
    designations: Vec<(NewDesignation, bool)>,
}

impl GraphState {
    fn user_for_employee(&self, employee: EmployeeId) -> Option<UserId> {
        self.users.values().find(|user| user.employee_id == Some(employee)).map(|user| user.id)
    }

    fn record(&self, designation: &NewDesignation, is_active: bool) -> Option<DesignationRecord> {
        let position = self.positions.get(&designation.position_id)?;
        let unit = designation.unit_id.and_then(|unit_id| self.units.get(&unit_id));

        Some(DesignationRecord {
            id: DesignationId(designation.id),
            employee_id: designation.employee_id,
            user_id: self.user_for_employee(designation.employee_id),
            unit_id: designation.unit_id,
            unit_sector_id: unit.map(|unit| unit.sector_id),
            unit_active: unit.is_some_and(|unit| unit.active),
            position_id: position.id,
            position_sector_id: position.sector_id,
            authority_level: position.authority_level,
            is_primary: designation.is_primary,
            is_active,
            start_date: designation.start_date,
            end_date: designation.end_date,
        })
    }

    fn records(&self) -> Vec<DesignationRecord> {
        let mut records: Vec<DesignationRecord> = self
            .designations
            .iter()
            .filter_map(|(designation, is_active)| self.record(designation, *is_active))
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}

/// Org graph held in memory behind an async lock, mirroring the SQL adapter's semantics.
#[derive(Debug, Default)]
pub struct InMemoryOrgGraph {
    state: RwLock<GraphState>,
}

impl InMemoryOrgGraph {
    pub async fn add_unit(&self, id: i64, name: &str, sector: i64, parent: Option<i64>) {
        let unit = Unit {
            id: UnitId(id),
            name: name.to_owned(),
            sector_id: SectorId(sector),
            parent_unit_id: parent.map(UnitId),
            active: true,
        };
        self.state.write().await.units.insert(unit.id, unit);
    }

    pub async fn set_unit_parent(&self, id: i64, parent: Option<i64>) {
        if let Some(unit) = self.state.write().await.units.get_mut(&UnitId(id)) {
            unit.parent_unit_id = parent.map(UnitId);
        }
    }

    pub async fn deactivate_unit(&self, id: i64) {
        if let Some(unit) = self.state.write().await.units.get_mut(&UnitId(id)) {
            unit.active = false;
        }
    }

    pub async fn add_position(
        &self,
        id: i64,
        name: &str,
        sector: Option<i64>,
        authority_level: AuthorityLevel,
    ) {
        let position = Position {
            id: PositionId(id),
            name: name.to_owned(),
            sector_id: sector.map(SectorId),
            authority_level,
        };
        self.state.write().await.positions.insert(position.id, position);
    }

    pub async fn add_user(&self, id: i64, username: &str, employee: Option<i64>) {
        let user = UserAccount {
            id: UserId(id),
            username: username.to_owned(),
            employee_id: employee.map(EmployeeId),
        };
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn grant_role(&self, user: i64, role: i64) {
        let mut state = self.state.write().await;
        state.roles.insert(RoleId(role));
        state.user_roles.insert((UserId(user), RoleId(role)));
    }

    pub async fn add_designation(&self, designation: NewDesignation) {
        self.state.write().await.designations.push((designation, true));
    }

    pub async fn end_designation(&self, id: i64) {
        let mut state = self.state.write().await;
        for (designation, is_active) in state.designations.iter_mut() {
            if designation.id == id {
                *is_active = false;
            }
        }
    }
}

#[async_trait]
impl OrgGraphReader for InMemoryOrgGraph {
    async fn primary_active_designation(
        &self,
        employee: EmployeeId,
        as_of: NaiveDate,
    ) -> Result<Option<DesignationRecord>, OrgGraphError> {
        let state = self.state.read().await;
        Ok(state
            .records()
            .into_iter()
            .find(|record| {
                record.employee_id == employee && record.is_primary && record.is_current(as_of)
            }))
    }

    async fn find_designations(
        &self,
        filter: &DesignationFilter,
    ) -> Result<Vec<DesignationRecord>, OrgGraphError> {
        let state = self.state.read().await;
        Ok(state.records().into_iter().filter(|record| filter.matches(record)).collect())
    }

    async fn unit(&self, unit: UnitId) -> Result<Option<Unit>, OrgGraphError> {
        Ok(self.state.read().await.units.get(&unit).cloned())
    }

    async fn unit_parent(&self, unit: UnitId) -> Result<Option<UnitId>, OrgGraphError> {
        Ok(self.state.read().await.units.get(&unit).and_then(|unit| unit.parent_unit_id))
    }

    async fn units_in_sector(&self, sector: SectorId) -> Result<Vec<UnitId>, OrgGraphError> {
        let state = self.state.read().await;
        let mut units: Vec<UnitId> = state
            .units
            .values()
            .filter(|unit| unit.sector_id == sector)
            .map(|unit| unit.id)
            .collect();
        units.sort();
        Ok(units)
    }

    async fn position(&self, position: PositionId) -> Result<Option<Position>, OrgGraphError> {
        Ok(self.state.read().await.positions.get(&position).cloned())
    }

    async fn user(&self, user: UserId) -> Result<Option<UserAccount>, OrgGraphError> {
        Ok(self.state.read().await.users.get(&user).cloned())
    }

    async fn role_exists(&self, role: RoleId) -> Result<bool, OrgGraphError> {
        Ok(self.state.read().await.roles.contains(&role))
    }

    async fn user_has_role(&self, user: UserId, role: RoleId) -> Result<bool, OrgGraphError> {
        Ok(self.state.read().await.user_roles.contains(&(user, role)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DesignationFilter, InMemoryOrgGraph, NewDesignation, OrgGraphReader};
    use crate::domain::org::{AuthorityLevel, EmployeeId, PositionId, SectorId, UnitId, UserId};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
    }

    fn level(value: i64) -> AuthorityLevel {
        AuthorityLevel::new(value).expect("valid level")
    }

    async fn graph() -> InMemoryOrgGraph {
        let graph = InMemoryOrgGraph::default();
        graph.add_unit(10, "College", 1, None).await;
        graph.add_unit(11, "Program", 1, Some(10)).await;
        graph.add_position(1, "Faculty", Some(1), level(50)).await;
        graph.add_position(2, "President", None, level(100)).await;
        graph.add_user(101, "ana", Some(1)).await;
        graph
            .add_designation(NewDesignation {
                id: 1,
                employee_id: EmployeeId(1),
                unit_id: Some(UnitId(11)),
                position_id: PositionId(1),
                is_primary: true,
                start_date: today(),
                end_date: None,
            })
            .await;
        graph
            .add_designation(NewDesignation {
                id: 2,
                employee_id: EmployeeId(2),
                unit_id: None,
                position_id: PositionId(2),
                is_primary: true,
                start_date: today(),
                end_date: None,
            })
            .await;
        graph
    }

    #[tokio::test]
    async fn primary_designation_joins_user_and_sector() {
        let graph = graph().await;
        let record = graph
            .primary_active_designation(EmployeeId(1), today())
            .await
            .expect("read")
            .expect("designation present");

        assert_eq!(record.user_id, Some(UserId(101)));
        assert_eq!(record.unit_sector_id.map(|sector| sector.0), Some(1));
        assert_eq!(record.authority_level, level(50));
    }

    #[tokio::test]
    async fn filter_selects_system_wide_positions() {
        let graph = graph().await;
        let found = graph
            .find_designations(&DesignationFilter::system_wide().primary().active_on(today()))
            .await
            .expect("read");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].employee_id, EmployeeId(2));
        assert!(found[0].user_id.is_none());
    }

    #[tokio::test]
    async fn ended_designations_and_inactive_units_are_not_current() {
        let graph = graph().await;
        graph.deactivate_unit(11).await;
        let in_program = graph
            .find_designations(&DesignationFilter::in_unit(UnitId(11)).active_on(today()))
            .await
            .expect("read");
        assert!(in_program.is_empty());

        graph.end_designation(2).await;
        let system_wide = graph
            .find_designations(&DesignationFilter::system_wide().active_on(today()))
            .await
            .expect("read");
        assert!(system_wide.is_empty());
    }

    #[tokio::test]
    async fn units_in_sector_are_sorted() {
        let graph = graph().await;
        let units = graph.units_in_sector(SectorId(1)).await.expect("read");
        assert_eq!(units, vec![UnitId(10), UnitId(11)]);
    }
}
