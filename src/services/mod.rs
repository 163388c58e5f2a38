pub mod global_analytics;
pub mod ranking;
pub mod recommendations;
pub mod user_analytics;

pub use global_analytics::GlobalAnalyticsAggregator;
pub use ranking::RankingService;
pub use recommendations::RecommendationScorer;
pub use user_analytics::UserAnalyticsAggregator;
