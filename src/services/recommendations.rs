use chrono::{Datelike, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ShowProfile, WatchStatus},
    stores::{ShowCatalog, WatchHistoryStore},
};

const GENRE_WEIGHT: f64 = 2.0;
const TAG_WEIGHT: f64 = 1.0;
const RATING_WEIGHT: f64 = 0.5;
const POPULARITY_BONUS: f64 = 3.0;
const RECENCY_BONUS: f64 = 2.0;
/// A show released within this many years of now counts as recent
const RECENCY_WINDOW_YEARS: i32 = 2;

/// Turns a user's watch history into a ranked list of unseen shows.
///
/// Every public read degrades rather than errors: personalized
/// recommendations fall back to the popularity list, projection queries
/// fall back to an empty list.
pub struct RecommendationScorer {
    catalog: Arc<dyn ShowCatalog>,
    watch_history: Arc<dyn WatchHistoryStore>,
}

impl RecommendationScorer {
    pub fn new(catalog: Arc<dyn ShowCatalog>, watch_history: Arc<dyn WatchHistoryStore>) -> Self {
        Self {
            catalog,
            watch_history,
        }
    }

    /// Personalized recommendations for one user, best candidates first.
    ///
    /// Falls back to the popularity list when the user has no usable
    /// history or when any step fails along the way.
    pub async fn recommend_for_user(&self, user_id: Uuid, limit: usize) -> Vec<ShowProfile> {
        match self.scored_candidates(user_id, limit).await {
            Ok(Some(shows)) => shows,
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "No watch history, using popularity fallback");
                self.popular(limit).await
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Scoring failed, using popularity fallback");
                self.popular(limit).await
            }
        }
    }

    /// Runs the affinity-scoring pipeline. `Ok(None)` means the user has
    /// no watched/completed history and the caller should fall back.
    async fn scored_candidates(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Option<Vec<ShowProfile>>> {
        let history = self
            .watch_history
            .find_by_user(
                user_id,
                Some(vec![WatchStatus::Watching, WatchStatus::Completed]),
            )
            .await?;

        if history.is_empty() {
            return Ok(None);
        }

        let watched: HashSet<Uuid> = history.iter().map(|r| r.show_id).collect();

        let mut genre_affinity: HashMap<String, u32> = HashMap::new();
        let mut tag_affinity: HashMap<String, u32> = HashMap::new();
        for show_id in &watched {
            // A show missing from the catalog contributes no affinity
            let Some(show) = self.catalog.get(*show_id).await? else {
                continue;
            };
            for genre in &show.genres {
                *genre_affinity.entry(genre.clone()).or_insert(0) += 1;
            }
            for tag in &show.tags {
                *tag_affinity.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        let candidates = self.catalog.find_excluding(watched).await?;
        let current_year = Utc::now().year();

        let mut scored: Vec<(f64, ShowProfile)> = candidates
            .into_iter()
            .map(|show| {
                let score = score_show(&show, &genre_affinity, &tag_affinity, current_year);
                (score, show)
            })
            .collect();

        // Score descending; ties broken by rating then id so the output
        // is stable across calls
        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .total_cmp(a_score)
                .then(b.rating.average.total_cmp(&a.rating.average))
                .then(a.id.cmp(&b.id))
        });

        Ok(Some(
            scored.into_iter().take(limit).map(|(_, show)| show).collect(),
        ))
    }

    /// All shows ordered by rating; the global fallback list
    pub async fn popular(&self, limit: usize) -> Vec<ShowProfile> {
        fail_open("popular", self.catalog.all().await, limit)
    }

    /// Popularity-flagged shows ordered by rating
    pub async fn trending(&self, limit: usize) -> Vec<ShowProfile> {
        fail_open("trending", self.catalog.find_popular().await, limit)
    }

    pub async fn by_genre(&self, genre: &str, limit: usize) -> Vec<ShowProfile> {
        fail_open(
            "by_genre",
            self.catalog.find_by_genre(genre.to_string()).await,
            limit,
        )
    }

    pub async fn by_tag(&self, tag: &str, limit: usize) -> Vec<ShowProfile> {
        fail_open(
            "by_tag",
            self.catalog.find_by_tag(tag.to_string()).await,
            limit,
        )
    }

    /// Shows released this calendar year, ordered by rating
    pub async fn seasonal(&self, limit: usize) -> Vec<ShowProfile> {
        let year = Utc::now().year();
        fail_open("seasonal", self.catalog.find_by_year(year).await, limit)
    }

    /// Shows sharing at least one genre or tag with the target show.
    /// An unknown target yields an empty list.
    pub async fn similar_to(&self, show_id: Uuid, limit: usize) -> Vec<ShowProfile> {
        let target = match self.catalog.get(show_id).await {
            Ok(Some(show)) => show,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(show_id = %show_id, error = %e, "Similar-show lookup failed");
                return Vec::new();
            }
        };

        let candidates = match self.catalog.all().await {
            Ok(shows) => shows,
            Err(e) => {
                tracing::warn!(show_id = %show_id, error = %e, "Similar-show query failed");
                return Vec::new();
            }
        };

        let mut similar: Vec<ShowProfile> = candidates
            .into_iter()
            .filter(|s| s.id != target.id)
            .filter(|s| {
                s.genres.intersection(&target.genres).next().is_some()
                    || s.tags.intersection(&target.tags).next().is_some()
            })
            .collect();
        sort_by_rating(&mut similar);
        similar.truncate(limit);
        similar
    }
}

/// Multi-factor candidate score: genre affinity, tag affinity, rating,
/// popularity flag, and recency
fn score_show(
    show: &ShowProfile,
    genre_affinity: &HashMap<String, u32>,
    tag_affinity: &HashMap<String, u32>,
    current_year: i32,
) -> f64 {
    let mut score = 0.0;
    for genre in &show.genres {
        if let Some(count) = genre_affinity.get(genre) {
            score += f64::from(*count) * GENRE_WEIGHT;
        }
    }
    for tag in &show.tags {
        if let Some(count) = tag_affinity.get(tag) {
            score += f64::from(*count) * TAG_WEIGHT;
        }
    }
    score += show.rating.average * RATING_WEIGHT;
    if show.is_popular {
        score += POPULARITY_BONUS;
    }
    if show.release_year >= current_year - RECENCY_WINDOW_YEARS {
        score += RECENCY_BONUS;
    }
    score
}

/// Rating order shared by every projection query: average desc, vote
/// count desc, id as the final deterministic key
fn sort_by_rating(shows: &mut [ShowProfile]) {
    shows.sort_by(|a, b| {
        b.rating
            .average
            .total_cmp(&a.rating.average)
            .then(b.rating.count.cmp(&a.rating.count))
            .then(a.id.cmp(&b.id))
    });
}

/// Degrades a failed projection query to an empty list, otherwise sorts
/// by rating and applies the limit
fn fail_open(query: &str, result: AppResult<Vec<ShowProfile>>, limit: usize) -> Vec<ShowProfile> {
    match result {
        Ok(mut shows) => {
            sort_by_rating(&mut shows);
            shows.truncate(limit);
            shows
        }
        Err(e) => {
            tracing::warn!(query = query, error = %e, "Catalog query failed, returning empty list");
            Vec::new()
        }
    }
}
