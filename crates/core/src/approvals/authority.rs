use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::approvals::cache::{CacheKey, PickMode, ResolutionCache};
use crate::domain::org::{AuthorityLevel, DesignationRecord, EmployeeId, SectorId, UnitId};
use crate::domain::slot::{Provenance, ResolvedApprover, SearchStrategy};
use crate::errors::ResolutionError;
use crate::org_graph::{DesignationFilter, OrgGraphReader};

/// Ancestor walks stop after this many parent hops unless configured otherwise.
pub const DEFAULT_MAX_HIERARCHY_DEPTH: usize = 64;

/// Where the requester sits in the org tree, taken from their primary designation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequesterScope {
    pub employee: EmployeeId,
    pub unit: UnitId,
    pub sector: Option<SectorId>,
    pub level: AuthorityLevel,
}

/// Finds approvers at or above an authority threshold by walking same unit, ancestor
/// units, system-wide positions and finally the requester's sector.
pub struct AuthorityResolver {
    reader: Arc<dyn OrgGraphReader>,
    cache: Option<Arc<ResolutionCache>>,
    max_depth: usize,
    reference_date: Option<NaiveDate>,
}

impl AuthorityResolver {
    pub fn new(reader: Arc<dyn OrgGraphReader>) -> Self {
        Self { reader, cache: None, max_depth: DEFAULT_MAX_HIERARCHY_DEPTH, reference_date: None }
    }

    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Pin "today" for designation windows. Defaults to the current UTC date.
    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = Some(reference_date);
        self
    }

    pub fn reader(&self) -> &Arc<dyn OrgGraphReader> {
        &self.reader
    }

    pub fn cache(&self) -> Option<&Arc<ResolutionCache>> {
        self.cache.as_ref()
    }

    pub fn as_of(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub async fn requester_designation(
        &self,
        requester: EmployeeId,
    ) -> Result<Option<DesignationRecord>, ResolutionError> {
        Ok(self.reader.primary_active_designation(requester, self.as_of()).await?)
    }

    /// `None` when the requester has no primary designation or holds it without a unit.
    pub async fn requester_scope(
        &self,
        requester: EmployeeId,
    ) -> Result<Option<RequesterScope>, ResolutionError> {
        let Some(designation) = self.requester_designation(requester).await? else {
            return Ok(None);
        };
        let Some(unit) = designation.unit_id else {
            return Ok(None);
        };

        Ok(Some(RequesterScope {
            employee: requester,
            unit,
            sector: designation.unit_sector_id,
            level: designation.authority_level,
        }))
    }

    /// Nearest-above approver from the first strategy tier that yields one.
    pub async fn find_approver(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
    ) -> Result<Option<ResolvedApprover>, ResolutionError> {
        let approvers = self.cached(requester, min_level, PickMode::Single).await?;
        Ok(approvers.into_iter().next())
    }

    /// Same as [`Self::find_approver`] but always reads the org graph.
    pub async fn find_approver_live(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
    ) -> Result<Option<ResolvedApprover>, ResolutionError> {
        let approvers = self.resolve(requester, min_level, PickMode::Single).await?;
        Ok(approvers.into_iter().next())
    }

    /// Every qualifying approver across all tiers, one entry per user, in tier order.
    pub async fn find_approvers(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        self.cached(requester, min_level, PickMode::All).await
    }

    pub async fn find_approvers_live(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        self.resolve(requester, min_level, PickMode::All).await
    }

    async fn cached(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
        mode: PickMode,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let Some(cache) = &self.cache else {
            return self.resolve(requester, min_level, mode).await;
        };

        let key = CacheKey { requester, min_level, mode };
        if let Some(hit) = cache.get(&key).await {
            return Ok(hit);
        }

        let approvers = self.resolve(requester, min_level, mode).await?;
        cache.insert(key, approvers.clone()).await;
        Ok(approvers)
    }

    async fn resolve(
        &self,
        requester: EmployeeId,
        min_level: Option<AuthorityLevel>,
        mode: PickMode,
    ) -> Result<Vec<ResolvedApprover>, ResolutionError> {
        let Some(scope) = self.requester_scope(requester).await? else {
            debug!(
                event_name = "approvals.authority.requester_unscoped",
                requester = requester.0,
                "requester has no primary designation with a unit"
            );
            return Ok(Vec::new());
        };

        let Some(min_level) = min_level.or_else(|| scope.level.next()) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<ResolvedApprover> = Vec::new();
        for strategy in SearchStrategy::ORDERED {
            let hits = match strategy {
                SearchStrategy::SameUnit => {
                    self.candidates(&scope, DesignationFilter::in_unit(scope.unit), min_level)
                        .await?
                }
                SearchStrategy::AncestorChain => self.ancestors(&scope, min_level, mode).await?,
                SearchStrategy::SystemWide => {
                    self.candidates(&scope, DesignationFilter::system_wide(), min_level).await?
                }
                SearchStrategy::SectorWide => match scope.sector {
                    Some(sector) => {
                        let units = self.reader.units_in_sector(sector).await?;
                        self.candidates(&scope, DesignationFilter::in_units(units), min_level)
                            .await?
                    }
                    None => Vec::new(),
                },
            };

            if hits.is_empty() {
                continue;
            }

            debug!(
                event_name = "approvals.authority.tier_hit",
                requester = requester.0,
                strategy = strategy.as_str(),
                min_level = min_level.value(),
                candidates = hits.len(),
                "authority tier produced candidates"
            );

            let approvers = hits.into_iter().map(|record| approver_from(record, strategy));
            if mode == PickMode::Single {
                return Ok(approvers.take(1).collect());
            }
            found.extend(approvers);
        }

        let mut seen = HashSet::new();
        found.retain(|approver| approver.user_id.is_some_and(|user| seen.insert(user)));
        Ok(found)
    }

    /// Walks parents nearest first. Single-pick stops at the first unit with a candidate;
    /// a revisited unit or the depth cap ends the walk.
    async fn ancestors(
        &self,
        scope: &RequesterScope,
        min_level: AuthorityLevel,
        mode: PickMode,
    ) -> Result<Vec<DesignationRecord>, ResolutionError> {
        let mut visited = HashSet::from([scope.unit]);
        let mut current = scope.unit;
        let mut found = Vec::new();

        for _ in 0..self.max_depth {
            let Some(parent) = self.reader.unit_parent(current).await? else {
                return Ok(found);
            };

            if !visited.insert(parent) {
                warn!(
                    event_name = "approvals.authority.unit_cycle",
                    requester = scope.employee.0,
                    unit = parent.0,
                    "unit parent chain revisits a unit; stopping ancestor search"
                );
                return Ok(found);
            }

            let hits = self.candidates(scope, DesignationFilter::in_unit(parent), min_level).await?;
            if mode == PickMode::Single && !hits.is_empty() {
                return Ok(hits);
            }
            found.extend(hits);
            current = parent;
        }

        if self.reader.unit_parent(current).await?.is_some() {
            warn!(
                event_name = "approvals.authority.depth_exceeded",
                requester = scope.employee.0,
                max_depth = self.max_depth,
                "unit parent chain exceeds maximum depth; stopping ancestor search"
            );
        }
        Ok(found)
    }

    /// Qualifying designations for `filter`, lowest authority first.
    async fn candidates(
        &self,
        scope: &RequesterScope,
        filter: DesignationFilter,
        min_level: AuthorityLevel,
    ) -> Result<Vec<DesignationRecord>, ResolutionError> {
        let filter = filter.at_least(min_level).primary().active_on(self.as_of());
        let mut records: Vec<DesignationRecord> = self
            .reader
            .find_designations(&filter)
            .await?
            .into_iter()
            .filter(|record| record.employee_id != scope.employee && record.user_id.is_some())
            .collect();

        records.sort_by(|left, right| {
            left.authority_level.cmp(&right.authority_level).then_with(|| left.id.cmp(&right.id))
        });
        Ok(records)
    }
}

fn approver_from(record: DesignationRecord, strategy: SearchStrategy) -> ResolvedApprover {
    ResolvedApprover {
        slot: None,
        user_id: record.user_id,
        employee_id: Some(record.employee_id),
        provenance: Provenance::strategy(strategy),
        escalation: None,
        authority_level: Some(record.authority_level),
        unit_id: record.unit_id,
        diagnostic: None,
    }
}
