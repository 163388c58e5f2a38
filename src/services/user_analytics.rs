use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ClubActivityKind, UserAnalyticsRecord, DEFAULT_EPISODE_MINUTES},
    stores::{AnalyticsStore, ShowCatalog, WatchHistoryStore},
};

const WEEKLY_SPAN_DAYS: i64 = 7;
const MONTHLY_SPAN_DAYS: i64 = 30;

/// Maintains per-user lifetime and windowed activity counters.
///
/// Every operation get-or-creates the user's record before mutating, rolls
/// expired weekly/monthly windows, and stamps `last_activity_at`. Each
/// returns the updated record so callers can acknowledge with fresh
/// counters.
pub struct UserAnalyticsAggregator {
    store: Arc<AnalyticsStore>,
    catalog: Arc<dyn ShowCatalog>,
    watch_history: Arc<dyn WatchHistoryStore>,
}

impl UserAnalyticsAggregator {
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

    pub async fn record_episode_watched(
        &self,
        user_id: Uuid,
        show_id: Uuid,
        duration_minutes: Option<u32>,
    ) -> AppResult<UserAnalyticsRecord> {
        let minutes = duration_minutes.unwrap_or(DEFAULT_EPISODE_MINUTES);
        let now = Utc::now();
        let record = self
            .store
            .with_record(user_id, |record| {
                roll_windows(record, now);
                record.episodes_watched += 1;
                record.total_watch_time_minutes += u64::from(minutes);
                record.weekly.counters.episodes_watched += 1;
                record.monthly.counters.episodes_watched += 1;
                record.last_activity_at = now;
                record.clone()
            })
            .await;

        tracing::debug!(user_id = %user_id, show_id = %show_id, minutes, "Recorded episode watched");
        Ok(record)
    }

    pub async fn record_review_posted(
        &self,
        user_id: Uuid,
        show_id: Uuid,
    ) -> AppResult<UserAnalyticsRecord> {
        let now = Utc::now();
        let record = self
            .store
            .with_record(user_id, |record| {
                roll_windows(record, now);
                record.reviews_posted += 1;
                record.weekly.counters.reviews_posted += 1;
                record.monthly.counters.reviews_posted += 1;
                record.last_activity_at = now;
                record.clone()
            })
            .await;

        tracing::debug!(user_id = %user_id, show_id = %show_id, "Recorded review posted");
        Ok(record)
    }

    /// Counts a watchlist addition and folds the show's genres into the
    /// user's favorite-genre multiset. A show missing from the catalog
    /// still counts as an addition, it just contributes no genres.
    pub async fn record_show_added(
        &self,
        user_id: Uuid,
        show_id: Uuid,
    ) -> AppResult<UserAnalyticsRecord> {
        let genres = match self.catalog.get(show_id).await {
            Ok(Some(show)) => show.genres.into_iter().collect::<Vec<_>>(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(show_id = %show_id, error = %e, "Genre lookup failed, counting add without genres");
                Vec::new()
            }
        };

        let now = Utc::now();
        let record = self
            .store
            .with_record(user_id, |record| {
                roll_windows(record, now);
                record.shows_in_watchlist += 1;
                record.weekly.counters.shows_added += 1;
                record.monthly.counters.shows_added += 1;
                for genre in &genres {
                    *record.favorite_genres.entry(genre.clone()).or_insert(0) += 1;
                }
                record.last_activity_at = now;
                record.clone()
            })
            .await;

        tracing::debug!(user_id = %user_id, show_id = %show_id, "Recorded show added");
        Ok(record)
    }

    /// PollVote only touches the window counters; the other kinds also
    /// bump their lifetime counter.
    pub async fn record_club_activity(
        &self,
        user_id: Uuid,
        kind: ClubActivityKind,
    ) -> AppResult<UserAnalyticsRecord> {
        let now = Utc::now();
        let record = self
            .store
            .with_record(user_id, |record| {
                roll_windows(record, now);
                match kind {
                    ClubActivityKind::Post => {
                        record.club_posts += 1;
                        record.weekly.counters.club_posts += 1;
                        record.monthly.counters.club_posts += 1;
                    }
                    ClubActivityKind::Like => record.club_likes += 1,
                    ClubActivityKind::Join => record.clubs_joined += 1,
                    ClubActivityKind::PollVote => {
                        record.weekly.counters.poll_votes += 1;
                        record.monthly.counters.poll_votes += 1;
                    }
                }
                record.last_activity_at = now;
                record.clone()
            })
            .await;

        tracing::debug!(user_id = %user_id, kind = ?kind, "Recorded club activity");
        Ok(record)
    }

    /// Overwrites the per-status counters and the watchlist size with the
    /// live distribution from the watch-history store. Idempotent: with
    /// unchanged underlying data, repeated calls produce identical
    /// counters.
    pub async fn reconcile_watchlist_status_counts(
        &self,
        user_id: Uuid,
    ) -> AppResult<UserAnalyticsRecord> {
        let counts = self.watch_history.aggregate_status_counts(user_id).await?;

        let now = Utc::now();
        let record = self
            .store
            .with_record(user_id, |record| {
                record.status_counts = counts;
                record.shows_in_watchlist = counts.total();
                record.last_activity_at = now;
                record.clone()
            })
            .await;

        tracing::debug!(user_id = %user_id, total = counts.total(), "Reconciled watchlist status counts");
        Ok(record)
    }

    pub async fn set_display_name(&self, user_id: Uuid, display_name: String) {
        self.store
            .with_record(user_id, |record| {
                record.display_name = display_name;
            })
            .await;
    }

    pub async fn get_record(&self, user_id: Uuid) -> Option<UserAnalyticsRecord> {
        self.store.get_record(user_id).await
    }
}

fn roll_windows(record: &mut UserAnalyticsRecord, now: DateTime<Utc>) {
    record
        .weekly
        .roll_if_expired(now, Duration::days(WEEKLY_SPAN_DAYS));
    record
        .monthly
        .roll_if_expired(now, Duration::days(MONTHLY_SPAN_DAYS));
}
