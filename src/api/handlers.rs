use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityEvent, ActivityKind, ClubActivityKind, GlobalAnalyticsSnapshot, LeaderboardEntry,
    ShowProfile, UserAnalyticsRecord, WatchRecord,
};

use super::AppState;

/// Header carrying the authenticated user's id, set by the auth layer
/// upstream of this subsystem
pub const USER_ID_HEADER: &str = "x-user-id";

const DEFAULT_PERSONALIZED_LIMIT: usize = 10;
const DEFAULT_POPULAR_LIMIT: usize = 20;
const DEFAULT_TRENDING_LIMIT: usize = 10;
const DEFAULT_GENRE_LIMIT: usize = 20;
const DEFAULT_SEASONAL_LIMIT: usize = 15;
const DEFAULT_SIMILAR_LIMIT: usize = 10;
const DEFAULT_FEED_LIMIT: usize = 50;
const RECENT_WATCHLIST_LIMIT: usize = 10;
const RECENT_REVIEWS_LIMIT: usize = 10;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Activity kinds accepted by the tracking endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedActivity {
    EpisodeWatched,
    ReviewPosted,
    ShowAdded,
    ClubPost,
    ClubLike,
    ClubJoin,
    PollVote,
}

#[derive(Debug, Deserialize)]
pub struct TrackActivityRequest {
    pub activity_type: TrackedActivity,
    pub show_id: Option<Uuid>,
    pub duration_minutes: Option<u32>,
    pub display_name: Option<String>,
}

/// Updated-counter acknowledgment returned by the tracking endpoint
#[derive(Debug, Serialize)]
pub struct TrackAckResponse {
    pub user_id: Uuid,
    pub episodes_watched: u64,
    pub total_watch_time_minutes: u64,
    pub reviews_posted: u64,
    pub club_posts: u64,
    pub club_likes: u64,
    pub clubs_joined: u64,
    pub shows_in_watchlist: u32,
}

impl From<&UserAnalyticsRecord> for TrackAckResponse {
    fn from(record: &UserAnalyticsRecord) -> Self {
        Self {
            user_id: record.user_id,
            episodes_watched: record.episodes_watched,
            total_watch_time_minutes: record.total_watch_time_minutes,
            reviews_posted: record.reviews_posted,
            club_posts: record.club_posts,
            club_likes: record.club_likes,
            clubs_joined: record.clubs_joined,
            shows_in_watchlist: record.shows_in_watchlist,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: UserAnalyticsRecord,
    pub global: GlobalAnalyticsSnapshot,
    pub rank: usize,
    pub total_users: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub recent_watchlist: Vec<WatchRecord>,
    pub recent_reviews: Vec<ActivityEvent>,
}

/// Public-safe aggregate stats; carries no per-user data
#[derive(Debug, Serialize)]
pub struct PublicStatsResponse {
    pub total_users: u64,
    pub total_shows: u64,
    pub total_reviews: u64,
    pub total_clubs: u64,
    pub top_watched_shows: Vec<crate::models::ShowWatchCount>,
    pub top_genres: Vec<crate::models::GenreCount>,
}

fn user_id_from_headers(headers: &HeaderMap) -> AppResult<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Missing or malformed {} header", USER_ID_HEADER))
        })
}

// Recommendation handlers

pub async fn personalized_recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<ShowProfile>>> {
    let user_id = user_id_from_headers(&headers)?;
    let limit = query.limit.unwrap_or(DEFAULT_PERSONALIZED_LIMIT);
    Ok(Json(
        state.recommendations.recommend_for_user(user_id, limit).await,
    ))
}

pub async fn popular_shows(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    Json(state.recommendations.popular(limit).await)
}

pub async fn trending_shows(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    Json(state.recommendations.trending(limit).await)
}

pub async fn shows_by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_GENRE_LIMIT);
    Json(state.recommendations.by_genre(&genre, limit).await)
}

pub async fn shows_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_GENRE_LIMIT);
    Json(state.recommendations.by_tag(&tag, limit).await)
}

pub async fn seasonal_shows(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_SEASONAL_LIMIT);
    Json(state.recommendations.seasonal(limit).await)
}

pub async fn similar_shows(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ShowProfile>> {
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT);
    Json(state.recommendations.similar_to(show_id, limit).await)
}

// Analytics handlers

/// Records one tracked activity and acknowledges with the user's updated
/// lifetime counters
pub async fn track_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TrackActivityRequest>,
) -> AppResult<Json<TrackAckResponse>> {
    let user_id = user_id_from_headers(&headers)?;

    if let Some(name) = request.display_name {
        state.user_analytics.set_display_name(user_id, name).await;
    }

    let require_show = || {
        request.show_id.ok_or_else(|| {
            AppError::InvalidInput("show_id is required for this activity type".to_string())
        })
    };

    let record = match request.activity_type {
        TrackedActivity::EpisodeWatched => {
            let show_id = require_show()?;
            state
                .user_analytics
                .record_episode_watched(user_id, show_id, request.duration_minutes)
                .await?
        }
        TrackedActivity::ReviewPosted => {
            let show_id = require_show()?;
            state
                .user_analytics
                .record_review_posted(user_id, show_id)
                .await?
        }
        TrackedActivity::ShowAdded => {
            let show_id = require_show()?;
            state
                .user_analytics
                .record_show_added(user_id, show_id)
                .await?
        }
        TrackedActivity::ClubPost => {
            state
                .user_analytics
                .record_club_activity(user_id, ClubActivityKind::Post)
                .await?
        }
        TrackedActivity::ClubLike => {
            state
                .user_analytics
                .record_club_activity(user_id, ClubActivityKind::Like)
                .await?
        }
        TrackedActivity::ClubJoin => {
            state
                .user_analytics
                .record_club_activity(user_id, ClubActivityKind::Join)
                .await?
        }
        TrackedActivity::PollVote => {
            state
                .user_analytics
                .record_club_activity(user_id, ClubActivityKind::PollVote)
                .await?
        }
    };

    // Feed only carries the site-wide event kinds
    let feed_kind = match request.activity_type {
        TrackedActivity::EpisodeWatched => Some(ActivityKind::EpisodeWatched),
        TrackedActivity::ReviewPosted => Some(ActivityKind::ReviewPosted),
        TrackedActivity::ShowAdded => Some(ActivityKind::ShowAdded),
        TrackedActivity::ClubJoin => Some(ActivityKind::ClubJoined),
        _ => None,
    };
    if let Some(kind) = feed_kind {
        state
            .global_analytics
            .append_activity(kind, user_id, request.show_id)
            .await;
    }

    Ok(Json(TrackAckResponse::from(&record)))
}

/// Re-derives the caller's per-status watchlist counters from the live
/// watch-history distribution
pub async fn reconcile_watchlist(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<TrackAckResponse>> {
    let user_id = user_id_from_headers(&headers)?;
    let record = state
        .user_analytics
        .reconcile_watchlist_status_counts(user_id)
        .await?;
    Ok(Json(TrackAckResponse::from(&record)))
}

/// Per-user dashboard payload: record, global snapshot, rank and
/// leaderboard, plus recent watchlist entries and review events
pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DashboardResponse>> {
    let user_id = user_id_from_headers(&headers)?;

    let user = state
        .user_analytics
        .get_record(user_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No analytics record for user {}", user_id)))?;

    let rank = state.ranking.get_user_rank(user_id).await?;

    // Collaborator failures degrade to empty sections rather than failing
    // the whole dashboard
    let global = match state.global_analytics.current_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot unavailable, serving zeroed totals");
            GlobalAnalyticsSnapshot::empty(chrono::Utc::now())
        }
    };

    let recent_watchlist = match state.watch_history.find_by_user(user_id, None).await {
        Ok(mut records) => {
            records.truncate(RECENT_WATCHLIST_LIMIT);
            records
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Watch history unavailable for dashboard");
            Vec::new()
        }
    };

    let recent_reviews = state
        .global_analytics
        .recent_activity(crate::stores::ACTIVITY_FEED_CAPACITY)
        .await
        .into_iter()
        .filter(|e| e.kind == ActivityKind::ReviewPosted && e.user_id == user_id)
        .take(RECENT_REVIEWS_LIMIT)
        .collect();

    Ok(Json(DashboardResponse {
        user,
        global,
        rank: rank.rank,
        total_users: rank.total_users,
        leaderboard: rank.top3,
        recent_watchlist,
        recent_reviews,
    }))
}

/// Aggregate stats safe to expose without authentication
pub async fn public_stats(State(state): State<AppState>) -> AppResult<Json<PublicStatsResponse>> {
    let mut snapshot = state.global_analytics.current_snapshot().await?;
    snapshot.most_watched_shows.truncate(5);
    snapshot.top_genres.truncate(5);

    Ok(Json(PublicStatsResponse {
        total_users: snapshot.total_users,
        total_shows: snapshot.total_shows,
        total_reviews: snapshot.total_reviews,
        total_clubs: snapshot.total_clubs,
        top_watched_shows: snapshot.most_watched_shows,
        top_genres: snapshot.top_genres,
    }))
}

/// Explicit full refresh of the global snapshot cache
pub async fn recompute_snapshot(
    State(state): State<AppState>,
) -> AppResult<Json<GlobalAnalyticsSnapshot>> {
    Ok(Json(state.global_analytics.recompute_snapshot().await?))
}

/// Recent cross-user activity, newest first
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<ActivityEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    Json(state.global_analytics.recent_activity(limit).await)
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "healthy" })),
    )
}
