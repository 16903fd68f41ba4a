//! Deduplication and persistence gateway.
//!
//! [`PolicyStore`] is the document-store port the crawler writes through.
//! Existence checks are point queries, not transactions; the crawler's
//! single-run guard is what keeps check-then-insert race free.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgPolicyStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{
    CrawlLogEntry, DedupKey, PersistedSchedulerState, PolicyCandidate, PolicyFilter, PolicyStats,
    StoredPolicy,
};

/// Default page size for policy queries without an explicit limit.
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Whether a policy with this key is already stored.
    async fn exists(&self, key: &DedupKey) -> Result<bool>;

    /// Store a new policy, stamping `created_at` and `is_new = true`.
    async fn insert_policy(&self, policy: &PolicyCandidate) -> Result<Uuid>;

    /// Equality-filtered query, newest first.
    async fn query_policies(&self, filter: &PolicyFilter) -> Result<Vec<StoredPolicy>>;

    async fn aggregate(&self) -> Result<PolicyStats>;

    async fn append_crawl_log(&self, entry: &CrawlLogEntry) -> Result<()>;

    /// Most recent entries first, by completion time.
    async fn list_crawl_logs(&self, limit: usize) -> Result<Vec<CrawlLogEntry>>;

    async fn load_scheduler_state(&self) -> Result<Option<PersistedSchedulerState>>;

    async fn save_scheduler_state(&self, state: &PersistedSchedulerState) -> Result<()>;

    /// Cheap liveness probe of the backing store.
    async fn ping(&self) -> Result<()>;

    /// Short backend label for health reporting.
    fn backend(&self) -> &'static str;
}
