pub mod analytics;
pub mod catalog;
pub mod watch_history;

pub use analytics::{AnalyticsStore, ACTIVITY_FEED_CAPACITY};
pub use catalog::{InMemoryShowCatalog, ShowCatalog};
pub use watch_history::{InMemoryWatchHistory, WatchHistoryStore};

#[cfg(test)]
pub use catalog::MockShowCatalog;
#[cfg(test)]
pub use watch_history::MockWatchHistoryStore;
