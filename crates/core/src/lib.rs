pub mod approvals;
pub mod config;
pub mod domain;
pub mod errors;
pub mod org_graph;

pub use approvals::{
    ApprovalChainBuilder, ApprovalRoutingService, ApprovalSlotResolver, AuthorityResolver,
    ResolutionCache, SlotScopeFilter,
};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::org::{
    AuthorityLevel, DesignationRecord, EmployeeId, PositionId, RoleId, SectorId, UnitId, UserId,
};
pub use domain::slot::{
    ApprovalSlot, EscalationReason, ResolvedApprover, SearchStrategy, SlotDiagnostic, SlotKind,
};
pub use errors::{ApplicationError, DomainError, InterfaceError, ResolutionError};
pub use org_graph::{DesignationFilter, InMemoryOrgGraph, OrgGraphError, OrgGraphReader};
