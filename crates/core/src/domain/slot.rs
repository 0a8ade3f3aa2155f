use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::org::{AuthorityLevel, EmployeeId, PositionId, RoleId, UnitId, UserId};

/// One configured approver slot of a workflow step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ApprovalSlot {
    User(UserId),
    Role(RoleId),
    Position(PositionId),
    Hierarchical(AuthorityLevel),
}

impl ApprovalSlot {
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::User(_) => SlotKind::User,
            Self::Role(_) => SlotKind::Role,
            Self::Position(_) => SlotKind::Position,
            Self::Hierarchical(_) => SlotKind::Hierarchical,
        }
    }

    /// Identifier carried by the slot configuration.
    pub fn configured_id(&self) -> i64 {
        match self {
            Self::User(id) => id.0,
            Self::Role(id) => id.0,
            Self::Position(id) => id.0,
            Self::Hierarchical(level) => i64::from(*level),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    User,
    Role,
    Position,
    Hierarchical,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Position => "position",
            Self::Hierarchical => "hierarchical",
        }
    }
}

/// Search scope of the authority walker, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    SameUnit,
    AncestorChain,
    SystemWide,
    SectorWide,
}

impl SearchStrategy {
    pub const ORDERED: [Self; 4] =
        [Self::SameUnit, Self::AncestorChain, Self::SystemWide, Self::SectorWide];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SameUnit => "same_unit",
            Self::AncestorChain => "ancestor_chain",
            Self::SystemWide => "system_wide",
            Self::SectorWide => "sector_wide",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    SelfApproval,
    PeerApproval,
}

/// Why a slot produced no approver. Carried on unresolved entries so the caller can flag
/// an unassignable step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDiagnostic {
    UnknownUser,
    UnknownRole,
    UnknownPosition,
    RequesterNotScoped,
    NoMatch,
    NoApproverInHierarchy,
    EscalationExhausted,
}

/// Where a resolved approver came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub slot_kind: Option<SlotKind>,
    /// Set whenever the authority walker produced the approver, including escalations.
    pub strategy: Option<SearchStrategy>,
}

impl Provenance {
    pub fn slot(slot_kind: SlotKind) -> Self {
        Self { slot_kind: Some(slot_kind), strategy: None }
    }

    pub fn strategy(strategy: SearchStrategy) -> Self {
        Self { slot_kind: None, strategy: Some(strategy) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApprover {
    pub slot: Option<ApprovalSlot>,
    pub user_id: Option<UserId>,
    pub employee_id: Option<EmployeeId>,
    pub provenance: Provenance,
    pub escalation: Option<EscalationReason>,
    pub authority_level: Option<AuthorityLevel>,
    pub unit_id: Option<UnitId>,
    pub diagnostic: Option<SlotDiagnostic>,
}

impl ResolvedApprover {
    pub fn unresolved(slot: ApprovalSlot, diagnostic: SlotDiagnostic) -> Self {
        Self {
            slot: Some(slot),
            user_id: None,
            employee_id: None,
            provenance: Provenance::slot(slot.kind()),
            escalation: None,
            authority_level: None,
            unit_id: None,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn escalated(&self) -> bool {
        self.escalation.is_some()
    }

    /// Re-label a walker result as the outcome of a configured slot.
    pub(crate) fn for_slot(
        mut self,
        slot: ApprovalSlot,
        escalation: Option<EscalationReason>,
    ) -> Self {
        self.slot = Some(slot);
        self.provenance.slot_kind = Some(slot.kind());
        self.escalation = escalation;
        self
    }
}
