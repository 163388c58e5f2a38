use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Assumed runtime of one episode when the caller does not supply one
pub const DEFAULT_EPISODE_MINUTES: u32 = 24;

/// Aggregate rating for a show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
}

/// Show metadata as exposed by the catalog.
///
/// Immutable from this subsystem's viewpoint; the catalog owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowProfile {
    pub id: Uuid,
    pub title: String,
    pub genres: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub rating: Rating,
    pub is_popular: bool,
    pub release_year: i32,
}

/// Watch progress state for one (user, show) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

/// One entry in a user's watch history, owned by the watch-history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub user_id: Uuid,
    pub show_id: Uuid,
    pub status: WatchStatus,
    pub current_episode: u32,
}

/// Per-status show counts for one user's watchlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub watching: u32,
    pub completed: u32,
    pub on_hold: u32,
    pub dropped: u32,
    pub plan_to_watch: u32,
}

impl StatusCounts {
    pub fn total(&self) -> u32 {
        self.watching + self.completed + self.on_hold + self.dropped + self.plan_to_watch
    }

    pub fn increment(&mut self, status: WatchStatus) {
        match status {
            WatchStatus::Watching => self.watching += 1,
            WatchStatus::Completed => self.completed += 1,
            WatchStatus::OnHold => self.on_hold += 1,
            WatchStatus::Dropped => self.dropped += 1,
            WatchStatus::PlanToWatch => self.plan_to_watch += 1,
        }
    }
}

/// Counters tracked inside a rolling weekly/monthly window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounters {
    pub episodes_watched: u32,
    pub reviews_posted: u32,
    pub shows_added: u32,
    pub club_posts: u32,
    pub poll_votes: u32,
}

/// A rolling window: counters plus the timestamp they are anchored at.
///
/// The window resets when the elapsed time since the anchor exceeds the
/// window span, rather than accumulating forever.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityWindow {
    pub counters: WindowCounters,
    pub anchor: DateTime<Utc>,
}

impl ActivityWindow {
    pub fn anchored_at(now: DateTime<Utc>) -> Self {
        Self {
            counters: WindowCounters::default(),
            anchor: now,
        }
    }

    /// Resets the counters and re-anchors the window if it has expired.
    pub fn roll_if_expired(&mut self, now: DateTime<Utc>, span: Duration) {
        if now - self.anchor >= span {
            self.counters = WindowCounters::default();
            self.anchor = now;
        }
    }
}

/// Per-user analytics record, created lazily on the first tracked event
/// and updated in place afterwards. Never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnalyticsRecord {
    pub user_id: Uuid,
    pub display_name: String,

    // Lifetime counters
    pub episodes_watched: u64,
    pub total_watch_time_minutes: u64,
    pub reviews_posted: u64,
    pub club_posts: u64,
    pub club_likes: u64,
    pub clubs_joined: u64,
    pub shows_in_watchlist: u32,
    pub status_counts: StatusCounts,

    /// Genre -> occurrence count, built up from watchlist additions
    pub favorite_genres: BTreeMap<String, u32>,

    pub weekly: ActivityWindow,
    pub monthly: ActivityWindow,

    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserAnalyticsRecord {
    /// Fresh record with both windows anchored at `now`
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        let short = user_id.as_simple().to_string();
        Self {
            user_id,
            display_name: format!("user-{}", &short[..8]),
            episodes_watched: 0,
            total_watch_time_minutes: 0,
            reviews_posted: 0,
            club_posts: 0,
            club_likes: 0,
            clubs_joined: 0,
            shows_in_watchlist: 0,
            status_counts: StatusCounts::default(),
            favorite_genres: BTreeMap::new(),
            weekly: ActivityWindow::anchored_at(now),
            monthly: ActivityWindow::anchored_at(now),
            last_activity_at: now,
            created_at: now,
        }
    }
}

/// Club interactions that feed per-user counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClubActivityKind {
    Post,
    Like,
    Join,
    PollVote,
}

/// Event kinds that appear in the site-wide recent-activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    EpisodeWatched,
    ReviewPosted,
    ShowAdded,
    ClubJoined,
}

/// One entry in the recent-activity feed; ephemeral, feeds the ring buffer only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub user_id: Uuid,
    pub show_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

/// A show and how many watch records reference it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowWatchCount {
    pub show_id: Uuid,
    pub title: String,
    pub watch_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

/// Site-wide analytics cache entity.
///
/// Recomputed wholesale from authoritative sources; `generated_at` marks
/// the version. Safe to recompute concurrently because every refresh is
/// a full overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAnalyticsSnapshot {
    pub total_users: u64,
    pub total_shows: u64,
    pub total_reviews: u64,
    pub total_clubs: u64,
    pub total_episodes_tracked: u64,
    pub total_watch_time_minutes: u64,
    pub most_watched_shows: Vec<ShowWatchCount>,
    pub top_genres: Vec<GenreCount>,
    pub active_users_daily: u64,
    pub active_users_weekly: u64,
    pub active_users_monthly: u64,
    pub generated_at: DateTime<Utc>,
}

impl GlobalAnalyticsSnapshot {
    /// All-zero snapshot, used before the first recompute
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_users: 0,
            total_shows: 0,
            total_reviews: 0,
            total_clubs: 0,
            total_episodes_tracked: 0,
            total_watch_time_minutes: 0,
            most_watched_shows: Vec::new(),
            top_genres: Vec::new(),
            active_users_daily: 0,
            active_users_weekly: 0,
            active_users_monthly: 0,
            generated_at: now,
        }
    }
}

/// One row of the global leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub display_name: String,
    pub episodes_watched: u64,
}

/// A user's position in the global leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRank {
    /// 1-based position ordered by lifetime episodes watched
    pub rank: usize,
    pub total_users: usize,
    pub top3: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_total() {
        let counts = StatusCounts {
            watching: 2,
            completed: 5,
            on_hold: 1,
            dropped: 0,
            plan_to_watch: 3,
        };
        assert_eq!(counts.total(), 11);
    }

    #[test]
    fn test_status_counts_increment() {
        let mut counts = StatusCounts::default();
        counts.increment(WatchStatus::Watching);
        counts.increment(WatchStatus::Watching);
        counts.increment(WatchStatus::Dropped);
        assert_eq!(counts.watching, 2);
        assert_eq!(counts.dropped, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_window_does_not_roll_before_expiry() {
        let start = Utc::now();
        let mut window = ActivityWindow::anchored_at(start);
        window.counters.episodes_watched = 4;

        window.roll_if_expired(start + Duration::days(6), Duration::days(7));
        assert_eq!(window.counters.episodes_watched, 4);
        assert_eq!(window.anchor, start);
    }

    #[test]
    fn test_window_rolls_after_expiry() {
        let start = Utc::now();
        let mut window = ActivityWindow::anchored_at(start);
        window.counters.episodes_watched = 4;
        window.counters.poll_votes = 2;

        let later = start + Duration::days(8);
        window.roll_if_expired(later, Duration::days(7));
        assert_eq!(window.counters, WindowCounters::default());
        assert_eq!(window.anchor, later);
    }

    #[test]
    fn test_new_record_is_zeroed() {
        let now = Utc::now();
        let record = UserAnalyticsRecord::new(Uuid::new_v4(), now);
        assert_eq!(record.episodes_watched, 0);
        assert_eq!(record.status_counts, StatusCounts::default());
        assert!(record.favorite_genres.is_empty());
        assert_eq!(record.weekly.anchor, now);
        assert_eq!(record.monthly.anchor, now);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_default_display_name_derives_from_id() {
        let id = Uuid::new_v4();
        let record = UserAnalyticsRecord::new(id, Utc::now());
        assert!(record.display_name.starts_with("user-"));
        assert_eq!(record.display_name.len(), "user-".len() + 8);
    }

    #[test]
    fn test_watch_status_serde_snake_case() {
        let json = serde_json::to_string(&WatchStatus::PlanToWatch).unwrap();
        assert_eq!(json, r#""plan_to_watch""#);
        let back: WatchStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WatchStatus::PlanToWatch);
    }

    #[test]
    fn test_empty_snapshot_is_all_zero() {
        let snapshot = GlobalAnalyticsSnapshot::empty(Utc::now());
        assert_eq!(snapshot.total_users, 0);
        assert_eq!(snapshot.total_watch_time_minutes, 0);
        assert!(snapshot.most_watched_shows.is_empty());
        assert!(snapshot.top_genres.is_empty());
    }
}
