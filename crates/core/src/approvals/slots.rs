use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::approvals::authority::AuthorityResolver;
use crate::domain::org::{
    AuthorityLevel, DesignationRecord, EmployeeId, PositionId, RoleId, SectorId, UnitId, UserId,
};
use crate::domain::slot::{
    ApprovalSlot, EscalationReason, Provenance, ResolvedApprover, SlotDiagnostic, SlotKind,
};
use crate::errors::ResolutionError;
use crate::org_graph::DesignationFilter;

/// Optional sector/unit allow-lists a workflow can attach to position slots.
/// An absent or empty list does not restrict.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotScopeFilter {
    pub sectors: Option<Vec<SectorId>>,
    pub units: Option<Vec<UnitId>>,
}

impl SlotScopeFilter {
    fn allows(&self, record: &DesignationRecord) -> bool {
        allow_listed(self.sectors.as_deref(), record.unit_sector_id)
            && allow_listed(self.units.as_deref(), record.unit_id)
    }
}

fn allow_listed<T: PartialEq>(allowed: Option<&[T]>, value: Option<T>) -> bool {
    match allowed {
        None => true,
        Some([]) => true,
        Some(allowed) => value.is_some_and(|value| allowed.contains(&value)),
    }
}

struct Requester {
    employee: EmployeeId,
    designation: Option<DesignationRecord>,
}

impl Requester {
    fn unit(&self) -> Option<UnitId> {
        self.designation.as_ref().and_then(|designation| designation.unit_id)
    }

    fn level(&self) -> Option<AuthorityLevel> {
        self.designation.as_ref().map(|designation| designation.authority_level)
    }
}

/// Expands configured approval slots into concrete approvers for one requester.
pub struct ApprovalSlotResolver {
    authority: Arc<AuthorityResolver>,
}

impl ApprovalSlotResolver {
    pub fn new(authority: Arc<AuthorityResolver>) -> Self {
        Self { authority }
    }

    pub async fn resolve(
        &self,
        slots: &[ApprovalSlot],
        requester: EmployeeId,
        scope_filter: &SlotScopeFilter,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let requester = Requester {
            employee: requester,
            designation: self.authority.requester_designation(requester).await?,
        };

        let mut expanded = Vec::with_capacity(slots.len());
        for slot in slots {
            let entries = match *slot {
                ApprovalSlot::User(user) => self.expand_user(*slot, user, &requester).await?,
                ApprovalSlot::Role(role) => self.expand_role(*slot, role, &requester).await?,
                ApprovalSlot::Position(position) => {
                    self.expand_position(*slot, position, &requester, scope_filter).await?
                }
                ApprovalSlot::Hierarchical(level) => {
                    self.expand_hierarchical(*slot, level, &requester).await?
                }
            };
            expanded.extend(entries);
        }

        Ok(dedupe(expanded))
    }

    async fn expand_user(
        &self,
        slot: ApprovalSlot,
        user: UserId,
        requester: &Requester,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let reader = self.authority.reader();
        let Some(account) = reader.user(user).await? else {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::UnknownUser)]);
        };

        if account.employee_id == Some(requester.employee) {
            return Ok(self
                .escalate(slot, requester, EscalationReason::SelfApproval)
                .await?
                .into_iter()
                .collect());
        }

        let designation = match account.employee_id {
            Some(employee) => {
                reader.primary_active_designation(employee, self.authority.as_of()).await?
            }
            None => None,
        };

        let is_peer = match (requester.level(), &designation) {
            (Some(requester_level), Some(designation)) => {
                designation.authority_level == requester_level
            }
            _ => false,
        };
        if is_peer {
            return Ok(self
                .escalate(slot, requester, EscalationReason::PeerApproval)
                .await?
                .into_iter()
                .collect());
        }

        Ok(vec![ResolvedApprover {
            slot: Some(slot),
            user_id: Some(account.id),
            employee_id: account.employee_id,
            provenance: Provenance::slot(SlotKind::User),
            escalation: None,
            authority_level: designation.as_ref().map(|designation| designation.authority_level),
            unit_id: designation.and_then(|designation| designation.unit_id),
            diagnostic: None,
        }])
    }

    async fn expand_role(
        &self,
        slot: ApprovalSlot,
        role: RoleId,
        requester: &Requester,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let reader = self.authority.reader();
        if !reader.role_exists(role).await? {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::UnknownRole)]);
        }
        let Some(unit) = requester.unit() else {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::RequesterNotScoped)]);
        };

        let filter = DesignationFilter::in_unit(unit).active_on(self.authority.as_of());
        let mut seen_users = HashSet::new();
        let mut holders = Vec::new();
        for record in reader.find_designations(&filter).await? {
            let Some(user) = record.user_id else {
                continue;
            };
            if seen_users.insert(user) && reader.user_has_role(user, role).await? {
                holders.push(record);
            }
        }

        if holders.is_empty() {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::NoMatch)]);
        }

        let sole_holder = holders.len() == 1 && holders[0].employee_id == requester.employee;
        let mut entries = Vec::with_capacity(holders.len());
        for record in holders {
            if record.employee_id == requester.employee {
                entries.extend(
                    self.escalate(slot, requester, EscalationReason::SelfApproval).await?,
                );
                continue;
            }
            entries.push(slot_approver(slot, record));
        }

        // Other holders still cover the slot; a lone requester must leave a trace.
        if sole_holder && entries.is_empty() {
            entries.push(ResolvedApprover::unresolved(slot, SlotDiagnostic::EscalationExhausted));
        }
        Ok(entries)
    }

    async fn expand_position(
        &self,
        slot: ApprovalSlot,
        position: PositionId,
        requester: &Requester,
        scope_filter: &SlotScopeFilter,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let reader = self.authority.reader();
        if reader.position(position).await?.is_none() {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::UnknownPosition)]);
        }
        let Some(unit) = requester.unit() else {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::RequesterNotScoped)]);
        };

        let filter = DesignationFilter::in_unit(unit)
            .with_position(position)
            .active_on(self.authority.as_of());
        let mut records = reader.find_designations(&filter).await?;
        records.sort_by_key(|record| record.id);

        let (own, others): (Vec<_>, Vec<_>) = records
            .into_iter()
            .filter(|record| record.user_id.is_some() || record.employee_id == requester.employee)
            .partition(|record| record.employee_id == requester.employee);

        if let Some(record) = others.iter().find(|record| scope_filter.allows(record)) {
            return Ok(vec![slot_approver(slot, record.clone())]);
        }

        // Escalate only when the requester is the sole holder.
        if own.is_empty() || !others.is_empty() {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::NoMatch)]);
        }

        let escalated = self.escalate(slot, requester, EscalationReason::SelfApproval).await?;
        Ok(vec![escalated.unwrap_or_else(|| {
            ResolvedApprover::unresolved(slot, SlotDiagnostic::EscalationExhausted)
        })])
    }

    async fn expand_hierarchical(
        &self,
        slot: ApprovalSlot,
        level: AuthorityLevel,
        requester: &Requester,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        if requester.unit().is_none() {
            return Ok(vec![ResolvedApprover::unresolved(slot, SlotDiagnostic::RequesterNotScoped)]);
        }

        let approver = self.authority.find_approver(requester.employee, Some(level)).await?;
        Ok(vec![match approver {
            Some(approver) => approver.for_slot(slot, None),
            None => ResolvedApprover::unresolved(slot, SlotDiagnostic::NoApproverInHierarchy),
        }])
    }

    /// Replace an invalid approver with the requester's next superior.
    async fn escalate(
        &self,
        slot: ApprovalSlot,
        requester: &Requester,
        reason: EscalationReason,
    ) -> Result<Option<ResolvedApprover>, ResolutionError> {
        let approver = self.authority.find_approver(requester.employee, None).await?;

        debug!(
            event_name = "approvals.slots.escalated",
            requester = requester.employee.0,
            slot_kind = slot.kind().as_str(),
            configured_id = slot.configured_id(),
            reason = ?reason,
            resolved = approver.is_some(),
            "slot approver escalated"
        );

        Ok(approver.map(|approver| approver.for_slot(slot, Some(reason))))
    }
}

fn slot_approver(slot: ApprovalSlot, record: DesignationRecord) -> ResolvedApprover {
    ResolvedApprover {
        slot: Some(slot),
        user_id: record.user_id,
        employee_id: Some(record.employee_id),
        provenance: Provenance::slot(slot.kind()),
        escalation: None,
        authority_level: Some(record.authority_level),
        unit_id: record.unit_id,
        diagnostic: None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum DedupeKey {
    User(UserId),
    Unresolved(SlotKind, i64),
}

/// Resolved entries collapse on the approving user, unresolved ones on their configuration.
fn dedupe(entries: Vec<ResolvedApprover>) -> Vec<ResolvedApprover> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let key = match (entry.user_id, entry.slot) {
                (Some(user), _) => DedupeKey::User(user),
                (None, Some(slot)) => DedupeKey::Unresolved(slot.kind(), slot.configured_id()),
                (None, None) => return true,
            };
            seen.insert(key)
        })
        .collect()
}
