use std::sync::Arc;

use crate::approvals::authority::AuthorityResolver;
use crate::domain::org::EmployeeId;
use crate::domain::slot::ResolvedApprover;
use crate::errors::ResolutionError;

/// Preview of everyone above a requester who could approve, lowest authority first.
pub struct ApprovalChainBuilder {
    authority: Arc<AuthorityResolver>,
}

impl ApprovalChainBuilder {
    pub fn new(authority: Arc<AuthorityResolver>) -> Self {
        Self { authority }
    }

    pub async fn build_chain(
        &self,
        requester: EmployeeId,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let mut chain = self.authority.find_approvers(requester, None).await?;
        // stable: equal levels keep tier order
        chain.sort_by_key(|approver| approver.authority_level);
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ApprovalChainBuilder;
    use crate::approvals::authority::AuthorityResolver;
    use crate::approvals::test_support::{campus, designation, level, today, ANA, GINA};
    use crate::domain::org::{EmployeeId, UserId};
    use crate::domain::slot::SearchStrategy;
    use crate::org_graph::InMemoryOrgGraph;

    fn builder(graph: &Arc<InMemoryOrgGraph>) -> ApprovalChainBuilder {
        let authority = AuthorityResolver::new(graph.clone()).with_reference_date(today());
        ApprovalChainBuilder::new(Arc::new(authority))
    }

    #[tokio::test]
    async fn chain_is_ordered_by_authority_level() {
        let graph = campus().await;
        let chain = builder(&graph).build_chain(ANA).await.expect("chain");

        let users: Vec<_> = chain.iter().filter_map(|approver| approver.user_id).collect();
        assert_eq!(users, vec![UserId(104), UserId(103), UserId(111), UserId(107)]);

        let levels: Vec<_> = chain.iter().filter_map(|approver| approver.authority_level).collect();
        assert_eq!(levels, vec![level(60), level(85), level(90), level(100)]);
    }

    #[tokio::test]
    async fn equal_levels_keep_tier_order() {
        let graph = campus().await;
        graph.add_user(115, "jo", Some(15)).await;
        graph.add_designation(designation(15, 15, Some(30), 3)).await;

        let chain = builder(&graph).build_chain(ANA).await.expect("chain");
        let at_85: Vec<_> = chain
            .iter()
            .filter(|approver| approver.authority_level == Some(level(85)))
            .map(|approver| (approver.user_id, approver.provenance.strategy))
            .collect();

        assert_eq!(
            at_85,
            vec![
                (Some(UserId(103)), Some(SearchStrategy::AncestorChain)),
                (Some(UserId(115)), Some(SearchStrategy::SectorWide)),
            ]
        );
    }

    #[tokio::test]
    async fn top_of_hierarchy_and_unknown_requesters_have_empty_chains() {
        let graph = campus().await;
        let builder = builder(&graph);

        assert!(builder.build_chain(GINA).await.expect("chain").is_empty());
        assert!(builder.build_chain(EmployeeId(999)).await.expect("chain").is_empty());
    }
}
