use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{StatusCounts, WatchRecord, WatchStatus};

/// Read/aggregate access to per-user watch records, owned elsewhere.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchHistoryStore: Send + Sync {
    /// A user's watch records, optionally restricted to the given statuses
    async fn find_by_user(
        &self,
        user_id: Uuid,
        statuses: Option<Vec<WatchStatus>>,
    ) -> AppResult<Vec<WatchRecord>>;

    /// Live per-status distribution for one user; the authoritative source
    /// for watchlist reconciliation
    async fn aggregate_status_counts(&self, user_id: Uuid) -> AppResult<StatusCounts>;

    /// Every watch record in the store; episode and watch-time totals are
    /// derived from `current_episode` across the result
    async fn all_records(&self) -> AppResult<Vec<WatchRecord>>;
}

/// In-memory watch history used for local serving and tests
#[derive(Default)]
pub struct InMemoryWatchHistory {
    records: RwLock<Vec<WatchRecord>>,
}

impl InMemoryWatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for the (user, show) pair
    pub async fn upsert(&self, record: WatchRecord) {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .find(|r| r.user_id == record.user_id && r.show_id == record.show_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }
}

#[async_trait]
impl WatchHistoryStore for InMemoryWatchHistory {
    async fn find_by_user(
        &self,
        user_id: Uuid,
        statuses: Option<Vec<WatchStatus>>,
    ) -> AppResult<Vec<WatchRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| match &statuses {
                Some(wanted) => wanted.contains(&r.status),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn aggregate_status_counts(&self, user_id: Uuid) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for record in self.records.read().await.iter() {
            if record.user_id == user_id {
                counts.increment(record.status);
            }
        }
        Ok(counts)
    }

    async fn all_records(&self) -> AppResult<Vec<WatchRecord>> {
        Ok(self.records.read().await.clone())
    }
}
