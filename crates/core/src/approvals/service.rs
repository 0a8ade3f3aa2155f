use std::sync::Arc;

use tracing::info;

use crate::approvals::authority::AuthorityResolver;
use crate::approvals::cache::ResolutionCache;
use crate::approvals::chain::ApprovalChainBuilder;
use crate::approvals::slots::{ApprovalSlotResolver, SlotScopeFilter};
use crate::config::ResolverConfig;
use crate::domain::org::{AuthorityLevel, EmployeeId, UserId};
use crate::domain::slot::{ApprovalSlot, ResolvedApprover};
use crate::errors::ResolutionError;
use crate::org_graph::OrgGraphReader;

/// Entry point the workflow engine calls for routing decisions.
pub struct ApprovalRoutingService {
    authority: Arc<AuthorityResolver>,
    slots: ApprovalSlotResolver,
    chain: ApprovalChainBuilder,
}

impl ApprovalRoutingService {
    pub fn new(reader: Arc<dyn OrgGraphReader>, config: &ResolverConfig) -> Self {
        let mut authority =
            AuthorityResolver::new(reader).with_max_depth(config.max_hierarchy_depth);
        if config.cache_enabled {
            authority = authority.with_cache(Arc::new(ResolutionCache::new(config.cache_ttl())));
        }
        Self::from_authority(authority)
    }

    pub fn from_authority(authority: AuthorityResolver) -> Self {
        let authority = Arc::new(authority);
        Self {
            slots: ApprovalSlotResolver::new(authority.clone()),
            chain: ApprovalChainBuilder::new(authority.clone()),
            authority,
        }
    }

    pub fn authority(&self) -> &AuthorityResolver {
        &self.authority
    }

    pub async fn resolve_next_approver(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
    ) -> Result<Option<UserId>, ResolutionError> {
        let approver = self.authority.find_approver(requester, min_level).await?;
        let user = approver.as_ref().and_then(|approver| approver.user_id);

        info!(
            event_name = "approvals.routing.next_approver",
            requester = requester.0,
            min_level = min_level.map(AuthorityLevel::value),
            approver = user.map(|user| user.0),
            strategy = approver
                .as_ref()
                .and_then(|approver| approver.provenance.strategy)
                .map(|strategy| strategy.as_str()),
            "next approver resolved"
        );

        Ok(user)
    }

    pub async fn resolve_step_approvers(
        &self,
        slots: &[ApprovalSlot],
        requester: EmployeeId,
        scope_filter: &SlotScopeFilter,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let approvers = self.slots.resolve(slots, requester, scope_filter).await?;

        info!(
            event_name = "approvals.routing.step_resolved",
            requester = requester.0,
            slot_count = slots.len(),
            resolved = approvers.iter().filter(|approver| approver.is_resolved()).count(),
            unresolved = approvers.iter().filter(|approver| !approver.is_resolved()).count(),
            "step approvers resolved"
        );

        Ok(approvers)
    }

    pub async fn approval_chain(
        &self,
        requester: EmployeeId,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        self.chain.build_chain(requester).await
    }

    pub async fn invalidate_requester(&self, requester: EmployeeId) {
        if let Some(cache) = self.authority.cache() {
            cache.invalidate_requester(requester).await;
        }
    }

    pub async fn invalidate_all(&self) {
        if let Some(cache) = self.authority.cache() {
            cache.invalidate_all().await;
        }
    }
}
