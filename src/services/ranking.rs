use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{LeaderboardEntry, UserRank},
    stores::AnalyticsStore,
};

const LEADERBOARD_SIZE: usize = 3;

/// Computes a user's position in the global leaderboard, ordered by
/// lifetime episodes watched.
///
/// Each call sorts the full user population, O(U log U). That is the
/// documented scaling limit of this service; at production scale an
/// incrementally maintained ordered index should replace the re-sort.
pub struct RankingService {
    store: Arc<AnalyticsStore>,
}

impl RankingService {
    pub fn new(store: Arc<AnalyticsStore>) -> Self {
        Self { store }
    }

    /// 1-based rank, population size, and the top-3 leaderboard. Ties are
    /// broken by record creation time then user id, so consecutive calls
    /// over unchanged data return identical results.
    pub async fn get_user_rank(&self, user_id: Uuid) -> AppResult<UserRank> {
        let mut records = self.store.all_records().await;
        records.sort_by(|a, b| {
            b.episodes_watched
                .cmp(&a.episodes_watched)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.user_id.cmp(&b.user_id))
        });

        let position = records
            .iter()
            .position(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("No analytics record for user {}", user_id)))?;

        let top3 = records
            .iter()
            .take(LEADERBOARD_SIZE)
            .map(|r| LeaderboardEntry {
                user_id: r.user_id,
                display_name: r.display_name.clone(),
                episodes_watched: r.episodes_watched,
            })
            .collect();

        Ok(UserRank {
            rank: position + 1,
            total_users: records.len(),
            top3,
        })
    }
}
