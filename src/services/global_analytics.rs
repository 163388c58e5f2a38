use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        ActivityEvent, ActivityKind, GenreCount, GlobalAnalyticsSnapshot, ShowWatchCount,
        DEFAULT_EPISODE_MINUTES,
    },
    stores::{AnalyticsStore, ShowCatalog, WatchHistoryStore},
};

const TOP_LIST_SIZE: usize = 10;

/// Maintains the site-wide analytics snapshot and the recent-activity feed.
///
/// The snapshot is a cache: `recompute_snapshot` rebuilds it wholesale from
/// authoritative sources, which makes it idempotent for a fixed underlying
/// state and safe to trigger from concurrent requests. The feed is
/// independent of the snapshot.
pub struct GlobalAnalyticsAggregator {
    store: Arc<AnalyticsStore>,
    catalog: Arc<dyn ShowCatalog>,
    watch_history: Arc<dyn WatchHistoryStore>,
}

impl GlobalAnalyticsAggregator {
    pub fn new(
        store: Arc<AnalyticsStore>,
        catalog: Arc<dyn ShowCatalog>,
        watch_history: Arc<dyn WatchHistoryStore>,
    ) -> Self {
        Self {
            store,
            catalog,
            watch_history,
        }
    }

    /// Rebuilds the snapshot from user records, the catalog, and the watch
    /// history, then overwrites the cached copy. An empty platform yields
    /// an all-zero snapshot.
    pub async fn recompute_snapshot(&self) -> AppResult<GlobalAnalyticsSnapshot> {
        let now = Utc::now();
        let records = self.store.all_records().await;
        let watch_records = self.watch_history.all_records().await?;

        let total_episodes: u64 = watch_records
            .iter()
            .map(|r| u64::from(r.current_episode))
            .sum();

        // Count watch records per show, then expand genres per record
        let mut watch_counts: HashMap<Uuid, u64> = HashMap::new();
        for record in &watch_records {
            *watch_counts.entry(record.show_id).or_insert(0) += 1;
        }

        let mut genre_counts: HashMap<String, u64> = HashMap::new();
        let mut titles: HashMap<Uuid, String> = HashMap::new();
        for (show_id, count) in &watch_counts {
            match self.catalog.get(*show_id).await? {
                Some(show) => {
                    titles.insert(*show_id, show.title);
                    for genre in show.genres {
                        *genre_counts.entry(genre).or_insert(0) += count;
                    }
                }
                None => {
                    tracing::debug!(show_id = %show_id, "Watched show missing from catalog");
                }
            }
        }

        let mut most_watched: Vec<ShowWatchCount> = watch_counts
            .into_iter()
            .map(|(show_id, watch_count)| ShowWatchCount {
                show_id,
                title: titles
                    .get(&show_id)
                    .cloned()
                    .unwrap_or_else(|| show_id.to_string()),
                watch_count,
            })
            .collect();
        most_watched.sort_by(|a, b| {
            b.watch_count
                .cmp(&a.watch_count)
                .then(a.show_id.cmp(&b.show_id))
        });
        most_watched.truncate(TOP_LIST_SIZE);

        let mut top_genres: Vec<GenreCount> = genre_counts
            .into_iter()
            .map(|(genre, count)| GenreCount { genre, count })
            .collect();
        top_genres.sort_by(|a, b| b.count.cmp(&a.count).then(a.genre.cmp(&b.genre)));
        top_genres.truncate(TOP_LIST_SIZE);

        let active_since = |days: i64| {
            let cutoff = now - Duration::days(days);
            records.iter().filter(|r| r.last_activity_at >= cutoff).count() as u64
        };

        let snapshot = GlobalAnalyticsSnapshot {
            total_users: records.len() as u64,
            total_shows: self.catalog.count().await?,
            total_reviews: records.iter().map(|r| r.reviews_posted).sum(),
            total_clubs: records.iter().map(|r| r.clubs_joined).sum(),
            total_episodes_tracked: total_episodes,
            total_watch_time_minutes: total_episodes * u64::from(DEFAULT_EPISODE_MINUTES),
            most_watched_shows: most_watched,
            top_genres,
            active_users_daily: active_since(1),
            active_users_weekly: active_since(7),
            active_users_monthly: active_since(30),
            generated_at: now,
        };

        self.store.replace_snapshot(snapshot.clone()).await;
        tracing::info!(
            total_users = snapshot.total_users,
            total_shows = snapshot.total_shows,
            total_episodes = snapshot.total_episodes_tracked,
            "Recomputed global analytics snapshot"
        );
        Ok(snapshot)
    }

    /// The cached snapshot, computed on first access
    pub async fn current_snapshot(&self) -> AppResult<GlobalAnalyticsSnapshot> {
        match self.store.latest_snapshot().await {
            Some(snapshot) => Ok(snapshot),
            None => self.recompute_snapshot().await,
        }
    }

    /// Prepends one event to the recent-activity feed. Does not require a
    /// snapshot recompute.
    pub async fn append_activity(&self, kind: ActivityKind, user_id: Uuid, show_id: Option<Uuid>) {
        self.store
            .push_activity(ActivityEvent {
                kind,
                user_id,
                show_id,
                occurred_at: Utc::now(),
            })
            .await;
    }

    /// Most recent events, newest first
    pub async fn recent_activity(&self, limit: usize) -> Vec<ActivityEvent> {
        self.store.recent_activity(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rating, ShowProfile, WatchRecord, WatchStatus};
    use crate::stores::{InMemoryShowCatalog, InMemoryWatchHistory, ACTIVITY_FEED_CAPACITY};
    use std::collections::BTreeSet;

    fn components() -> (
        GlobalAnalyticsAggregator,
        Arc<AnalyticsStore>,
        Arc<InMemoryShowCatalog>,
        Arc<InMemoryWatchHistory>,
    ) {
        let store = Arc::new(AnalyticsStore::new());
        let catalog = Arc::new(InMemoryShowCatalog::new());
        let history = Arc::new(InMemoryWatchHistory::new());
        let aggregator =
            GlobalAnalyticsAggregator::new(store.clone(), catalog.clone(), history.clone());
        (aggregator, store, catalog, history)
    }

    fn show(title: &str, genres: &[&str]) -> ShowProfile {
        ShowProfile {
            id: Uuid::new_v4(),
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            tags: BTreeSet::new(),
            rating: Rating {
                average: 7.5,
                count: 10,
            },
            is_popular: false,
            release_year: 2022,
        }
    }

    #[tokio::test]
    async fn test_recompute_on_empty_state_is_all_zero() {
        let (aggregator, _, _, _) = components();
        let snapshot = aggregator.recompute_snapshot().await.unwrap();

        assert_eq!(snapshot.total_users, 0);
        assert_eq!(snapshot.total_shows, 0);
        assert_eq!(snapshot.total_episodes_tracked, 0);
        assert_eq!(snapshot.total_watch_time_minutes, 0);
        assert!(snapshot.most_watched_shows.is_empty());
        assert!(snapshot.top_genres.is_empty());
        assert_eq!(snapshot.active_users_daily, 0);
    }

    #[tokio::test]
    async fn test_recompute_aggregates_watch_records() {
        let (aggregator, store, catalog, history) = components();
        let hit = show("Hit Show", &["Action", "Drama"]);
        let niche = show("Niche Show", &["Drama"]);
        catalog.insert(hit.clone()).await;
        catalog.insert(niche.clone()).await;

        for (show_id, episodes) in [(hit.id, 10), (hit.id, 4), (niche.id, 6)] {
            history
                .upsert(WatchRecord {
                    user_id: Uuid::new_v4(),
                    show_id,
                    status: WatchStatus::Watching,
                    current_episode: episodes,
                })
                .await;
        }

        store.with_record(Uuid::new_v4(), |r| r.reviews_posted = 3).await;
        store.with_record(Uuid::new_v4(), |r| r.clubs_joined = 2).await;

        let snapshot = aggregator.recompute_snapshot().await.unwrap();

        assert_eq!(snapshot.total_users, 2);
        assert_eq!(snapshot.total_shows, 2);
        assert_eq!(snapshot.total_reviews, 3);
        assert_eq!(snapshot.total_clubs, 2);
        assert_eq!(snapshot.total_episodes_tracked, 20);
        assert_eq!(snapshot.total_watch_time_minutes, 20 * 24);

        assert_eq!(snapshot.most_watched_shows[0].show_id, hit.id);
        assert_eq!(snapshot.most_watched_shows[0].title, "Hit Show");
        assert_eq!(snapshot.most_watched_shows[0].watch_count, 2);

        // Drama appears in all three watch records, Action in two
        assert_eq!(snapshot.top_genres[0].genre, "Drama");
        assert_eq!(snapshot.top_genres[0].count, 3);
        assert_eq!(snapshot.top_genres[1].genre, "Action");
        assert_eq!(snapshot.top_genres[1].count, 2);

        // Both records were just touched
        assert_eq!(snapshot.active_users_daily, 2);
        assert_eq!(snapshot.active_users_monthly, 2);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent_for_fixed_state() {
        let (aggregator, _, catalog, history) = components();
        let s = show("Some Show", &["Action"]);
        catalog.insert(s.clone()).await;
        history
            .upsert(WatchRecord {
                user_id: Uuid::new_v4(),
                show_id: s.id,
                status: WatchStatus::Completed,
                current_episode: 12,
            })
            .await;

        let first = aggregator.recompute_snapshot().await.unwrap();
        let second = aggregator.recompute_snapshot().await.unwrap();

        assert_eq!(first.total_episodes_tracked, second.total_episodes_tracked);
        assert_eq!(first.most_watched_shows, second.most_watched_shows);
        assert_eq!(first.top_genres, second.top_genres);
    }

    #[tokio::test]
    async fn test_active_user_windows() {
        let (aggregator, store, _, _) = components();
        let fresh = Uuid::new_v4();
        let stale = Uuid::new_v4();
        let ancient = Uuid::new_v4();

        store.with_record(fresh, |_| ()).await;
        store
            .with_record(stale, |r| {
                r.last_activity_at = Utc::now() - Duration::days(3);
            })
            .await;
        store
            .with_record(ancient, |r| {
                r.last_activity_at = Utc::now() - Duration::days(45);
            })
            .await;

        let snapshot = aggregator.recompute_snapshot().await.unwrap();
        assert_eq!(snapshot.active_users_daily, 1);
        assert_eq!(snapshot.active_users_weekly, 2);
        assert_eq!(snapshot.active_users_monthly, 2);
        assert_eq!(snapshot.total_users, 3);
    }

    #[tokio::test]
    async fn test_append_activity_keeps_feed_bounded() {
        let (aggregator, _, _, _) = components();
        let mut users = Vec::new();
        for _ in 0..(ACTIVITY_FEED_CAPACITY + 1) {
            let user = Uuid::new_v4();
            users.push(user);
            aggregator
                .append_activity(ActivityKind::ShowAdded, user, Some(Uuid::new_v4()))
                .await;
        }

        let feed = aggregator.recent_activity(usize::MAX).await;
        assert_eq!(feed.len(), ACTIVITY_FEED_CAPACITY);
        assert_eq!(feed[0].user_id, *users.last().unwrap());
        assert!(feed.iter().all(|e| e.user_id != users[0]));
    }

    #[tokio::test]
    async fn test_current_snapshot_computes_lazily_then_caches() {
        let (aggregator, store, _, _) = components();
        assert!(store.latest_snapshot().await.is_none());

        let snapshot = aggregator.current_snapshot().await.unwrap();
        assert_eq!(snapshot.total_users, 0);
        assert!(store.latest_snapshot().await.is_some());
    }
}
