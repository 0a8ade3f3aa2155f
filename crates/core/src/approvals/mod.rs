//! Approver resolution over the organisation graph.
//!
//! [`AuthorityResolver`] answers "who is the nearest person above this requester", the slot
//! resolver expands a workflow step's configured approvers, and the chain builder previews
//! everyone who could sign off. [`ApprovalRoutingService`] bundles the three around one cache.

pub mod authority;
pub mod cache;
pub mod chain;
pub mod service;
pub mod slots;

#[cfg(test)]
mod test_support;

pub use authority::{AuthorityResolver, RequesterScope, DEFAULT_MAX_HIERARCHY_DEPTH};
pub use cache::{CacheKey, CacheStats, PickMode, ResolutionCache, DEFAULT_CACHE_TTL};
pub use chain::ApprovalChainBuilder;
pub use service::ApprovalRoutingService;
pub use slots::{ApprovalSlotResolver, SlotScopeFilter};
