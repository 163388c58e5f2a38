use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route(
            "/recommendations",
            get(handlers::personalized_recommendations),
        )
        .route("/recommendations/popular", get(handlers::popular_shows))
        .route("/recommendations/trending", get(handlers::trending_shows))
        .route(
            "/recommendations/genre/:genre",
            get(handlers::shows_by_genre),
        )
        .route("/recommendations/tag/:tag", get(handlers::shows_by_tag))
        .route("/recommendations/seasonal", get(handlers::seasonal_shows))
        .route(
            "/recommendations/similar/:show_id",
            get(handlers::similar_shows),
        )
        // Analytics
        .route("/analytics/track", post(handlers::track_activity))
        .route("/analytics/reconcile", post(handlers::reconcile_watchlist))
        .route("/analytics/dashboard", get(handlers::dashboard))
        .route("/analytics/public", get(handlers::public_stats))
        .route("/analytics/activity", get(handlers::recent_activity))
        .route("/analytics/recompute", post(handlers::recompute_snapshot))
}
