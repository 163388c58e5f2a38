use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ActivityEvent, GlobalAnalyticsSnapshot, UserAnalyticsRecord};

/// Maximum number of events retained in the recent-activity feed
pub const ACTIVITY_FEED_CAPACITY: usize = 50;

/// Shared in-memory analytics state: per-user records, the global snapshot
/// cache, and the recent-activity ring buffer.
///
/// All per-user mutation runs inside `with_record` under the map's write
/// lock, so a record is created exactly once and read-modify-write cycles
/// on its counters cannot interleave.
#[derive(Default)]
pub struct AnalyticsStore {
    records: RwLock<HashMap<Uuid, UserAnalyticsRecord>>,
    snapshot: RwLock<Option<GlobalAnalyticsSnapshot>>,
    feed: RwLock<VecDeque<ActivityEvent>>,
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `mutate` against the user's record, creating it first if absent.
    /// Creation and mutation happen under one write-lock acquisition.
    pub async fn with_record<F, T>(&self, user_id: Uuid, mutate: F) -> T
    where
        F: FnOnce(&mut UserAnalyticsRecord) -> T,
    {
        let mut records = self.records.write().await;
        let record = records
            .entry(user_id)
            .or_insert_with(|| UserAnalyticsRecord::new(user_id, Utc::now()));
        mutate(record)
    }

    pub async fn get_record(&self, user_id: Uuid) -> Option<UserAnalyticsRecord> {
        self.records.read().await.get(&user_id).cloned()
    }

    pub async fn all_records(&self) -> Vec<UserAnalyticsRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Full-overwrite refresh of the snapshot cache
    pub async fn replace_snapshot(&self, snapshot: GlobalAnalyticsSnapshot) {
        *self.snapshot.write().await = Some(snapshot);
    }

    pub async fn latest_snapshot(&self) -> Option<GlobalAnalyticsSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Prepends an event to the feed, evicting the oldest past capacity
    pub async fn push_activity(&self, event: ActivityEvent) {
        let mut feed = self.feed.write().await;
        feed.push_front(event);
        feed.truncate(ACTIVITY_FEED_CAPACITY);
    }

    /// Most recent events, newest first
    pub async fn recent_activity(&self, limit: usize) -> Vec<ActivityEvent> {
        self.feed.read().await.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;

    fn event(user_id: Uuid) -> ActivityEvent {
        ActivityEvent {
            kind: ActivityKind::EpisodeWatched,
            user_id,
            show_id: Some(Uuid::new_v4()),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_with_record_creates_once() {
        let store = AnalyticsStore::new();
        let user = Uuid::new_v4();

        store.with_record(user, |r| r.episodes_watched += 1).await;
        store.with_record(user, |r| r.episodes_watched += 1).await;

        assert_eq!(store.all_records().await.len(), 1);
        let record = store.get_record(user).await.unwrap();
        assert_eq!(record.episodes_watched, 2);
    }

    #[tokio::test]
    async fn test_get_record_does_not_create() {
        let store = AnalyticsStore::new();
        assert!(store.get_record(Uuid::new_v4()).await.is_none());
        assert!(store.all_records().await.is_empty());
    }

    #[tokio::test]
    async fn test_feed_is_bounded_and_newest_first() {
        let store = AnalyticsStore::new();
        let mut users = Vec::new();
        for _ in 0..(ACTIVITY_FEED_CAPACITY + 1) {
            let user = Uuid::new_v4();
            users.push(user);
            store.push_activity(event(user)).await;
        }

        let feed = store.recent_activity(usize::MAX).await;
        assert_eq!(feed.len(), ACTIVITY_FEED_CAPACITY);
        // Newest first; the very first event has been evicted
        assert_eq!(feed[0].user_id, users[users.len() - 1]);
        assert!(feed.iter().all(|e| e.user_id != users[0]));
    }

    #[tokio::test]
    async fn test_recent_activity_respects_limit() {
        let store = AnalyticsStore::new();
        for _ in 0..10 {
            store.push_activity(event(Uuid::new_v4())).await;
        }
        assert_eq!(store.recent_activity(3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_replace_overwrites() {
        let store = AnalyticsStore::new();
        assert!(store.latest_snapshot().await.is_none());

        let mut snapshot = GlobalAnalyticsSnapshot::empty(Utc::now());
        snapshot.total_users = 7;
        store.replace_snapshot(snapshot.clone()).await;
        assert_eq!(store.latest_snapshot().await.unwrap().total_users, 7);

        snapshot.total_users = 9;
        store.replace_snapshot(snapshot).await;
        assert_eq!(store.latest_snapshot().await.unwrap().total_users, 9);
    }
}
