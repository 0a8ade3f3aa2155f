//! Per-requester memo of authority searches with a short TTL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::org::{AuthorityLevel, EmployeeId};
use crate::domain::slot::ResolvedApprover;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PickMode {
    Single,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub requester: EmployeeId,
    /// `None` when the caller asked for the requester's default threshold.
    pub min_level: Option<AuthorityLevel>,
    pub mode: PickMode,
}

#[derive(Clone, Debug)]
struct CachedResolution {
    approvers: Vec<ResolvedApprover>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub total_count: usize,
    pub expired_count: usize,
}

/// Concurrent read/insert map; racing writers for one key store equal values.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<CacheKey, CachedResolution>>,
    ttl: chrono::Duration,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<ResolvedApprover>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|cached| Utc::now() < cached.expires_at)
            .map(|cached| cached.approvers.clone())
    }

    /// Stores `approvers` and evicts whatever has expired since the last write.
    pub async fn insert(&self, key: CacheKey, approvers: Vec<ResolvedApprover>) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, cached| cached.expires_at > now);
        entries.insert(key, CachedResolution { approvers, expires_at: now + self.ttl });
    }

    /// Drop every entry computed for `requester`.
    pub async fn invalidate_requester(&self, requester: EmployeeId) {
        self.entries.write().await.retain(|key, _| key.requester != requester);
    }

    /// Drop everything. Designation writes can change any requester's chain, so this is the
    /// usual hook for org-structure changes.
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    pub async fn clear_expired(&self) {
        let now = Utc::now();
        self.entries.write().await.retain(|_, cached| cached.expires_at > now);
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let entries = self.entries.read().await;
        CacheStats {
            total_count: entries.len(),
            expired_count: entries.values().filter(|cached| cached.expires_at <= now).count(),
        }
    }
}
