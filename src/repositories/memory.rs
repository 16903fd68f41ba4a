use std::cmp::Reverse;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DEFAULT_QUERY_LIMIT, PolicyStore};
use crate::entities::{
    CrawlLogEntry, DedupKey, PersistedSchedulerState, PolicyCandidate, PolicyFilter, PolicyStats,
    StoredPolicy,
};

/// In-process store for demo mode and tests. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: RwLock<Vec<StoredPolicy>>,
    logs: RwLock<Vec<CrawlLogEntry>>,
    scheduler: RwLock<Option<PersistedSchedulerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn policy_count(&self) -> usize {
        self.policies.read().await.len()
    }
}

fn matches_filter(stored: &StoredPolicy, filter: &PolicyFilter) -> bool {
    let policy = &stored.policy;
    filter.site_id.as_ref().is_none_or(|s| &policy.site_id == s)
        && filter.category.as_ref().is_none_or(|c| &policy.category == c)
        && filter.status.is_none_or(|s| policy.status == s)
        && filter
            .credit_required
            .is_none_or(|c| policy.credit_required == c)
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn exists(&self, key: &DedupKey) -> Result<bool> {
        Ok(self
            .policies
            .read()
            .await
            .iter()
            .any(|stored| key.matches(&stored.policy)))
    }

    async fn insert_policy(&self, policy: &PolicyCandidate) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.policies.write().await.push(StoredPolicy {
            id,
            policy: policy.clone(),
            is_new: true,
            views: 0,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn query_policies(&self, filter: &PolicyFilter) -> Result<Vec<StoredPolicy>> {
        let policies = self.policies.read().await;
        // Insertion order breaks created_at ties, newest first.
        let mut matched: Vec<(usize, &StoredPolicy)> = policies
            .iter()
            .enumerate()
            .filter(|(_, p)| matches_filter(p, filter))
            .collect();
        matched.sort_by_key(|(idx, p)| Reverse((p.created_at, *idx)));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT).max(0) as usize;
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn aggregate(&self) -> Result<PolicyStats> {
        let policies = self.policies.read().await;
        let mut stats = PolicyStats {
            total: policies.len() as i64,
            ..PolicyStats::default()
        };
        for stored in policies.iter() {
            if stored.is_new {
                stats.new_count += 1;
            }
            *stats
                .by_status
                .entry(stored.policy.status.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_category
                .entry(stored.policy.category.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }

    async fn append_crawl_log(&self, entry: &CrawlLogEntry) -> Result<()> {
        self.logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_crawl_logs(&self, limit: usize) -> Result<Vec<CrawlLogEntry>> {
        let logs = self.logs.read().await;
        let mut ordered: Vec<(usize, &CrawlLogEntry)> = logs.iter().enumerate().collect();
        ordered.sort_by_key(|(idx, entry)| Reverse((entry.completed_at, *idx)));
        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn load_scheduler_state(&self) -> Result<Option<PersistedSchedulerState>> {
        Ok(*self.scheduler.read().await)
    }

    async fn save_scheduler_state(&self, state: &PersistedSchedulerState) -> Result<()> {
        *self.scheduler.write().await = Some(*state);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
