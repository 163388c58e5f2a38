use std::sync::Arc;

use crate::services::{
    GlobalAnalyticsAggregator, RankingService, RecommendationScorer, UserAnalyticsAggregator,
};
use crate::stores::{AnalyticsStore, ShowCatalog, WatchHistoryStore};

/// Shared application state: collaborator handles plus the assembled
/// recommendation and analytics services
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn ShowCatalog>,
    pub watch_history: Arc<dyn WatchHistoryStore>,
    pub recommendations: Arc<RecommendationScorer>,
    pub user_analytics: Arc<UserAnalyticsAggregator>,
    pub global_analytics: Arc<GlobalAnalyticsAggregator>,
    pub ranking: Arc<RankingService>,
}

impl AppState {
    /// Wires the services against the given collaborators, sharing one
    /// analytics store between aggregators and ranking
    pub fn new(catalog: Arc<dyn ShowCatalog>, watch_history: Arc<dyn WatchHistoryStore>) -> Self {
        let analytics = Arc::new(AnalyticsStore::new());

        let recommendations = Arc::new(RecommendationScorer::new(
            catalog.clone(),
            watch_history.clone(),
        ));
        let user_analytics = Arc::new(UserAnalyticsAggregator::new(
            analytics.clone(),
            catalog.clone(),
            watch_history.clone(),
        ));
        let global_analytics = Arc::new(GlobalAnalyticsAggregator::new(
            analytics.clone(),
            catalog.clone(),
            watch_history.clone(),
        ));
        let ranking = Arc::new(RankingService::new(analytics));

        Self {
            catalog,
            watch_history,
            recommendations,
            user_analytics,
            global_analytics,
            ranking,
        }
    }
}
