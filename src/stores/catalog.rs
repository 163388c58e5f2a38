use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::ShowProfile;

/// Read access to show metadata, owned elsewhere in the system.
///
/// Every query is bounded; implementations report failures through
/// `AppResult` and callers decide whether to degrade or surface them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShowCatalog: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<ShowProfile>>;

    /// All shows whose id is not in `exclude`
    async fn find_excluding(&self, exclude: HashSet<Uuid>) -> AppResult<Vec<ShowProfile>>;

    async fn find_by_genre(&self, genre: String) -> AppResult<Vec<ShowProfile>>;

    async fn find_by_tag(&self, tag: String) -> AppResult<Vec<ShowProfile>>;

    async fn find_popular(&self) -> AppResult<Vec<ShowProfile>>;

    async fn find_by_year(&self, year: i32) -> AppResult<Vec<ShowProfile>>;

    async fn all(&self) -> AppResult<Vec<ShowProfile>>;

    async fn count(&self) -> AppResult<u64>;
}

/// In-memory catalog used for local serving and tests
#[derive(Default)]
pub struct InMemoryShowCatalog {
    shows: RwLock<HashMap<Uuid, ShowProfile>>,
}

impl InMemoryShowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, show: ShowProfile) {
        self.shows.write().await.insert(show.id, show);
    }
}

#[async_trait]
impl ShowCatalog for InMemoryShowCatalog {
    async fn get(&self, id: Uuid) -> AppResult<Option<ShowProfile>> {
        Ok(self.shows.read().await.get(&id).cloned())
    }

    async fn find_excluding(&self, exclude: HashSet<Uuid>) -> AppResult<Vec<ShowProfile>> {
        Ok(self
            .shows
            .read()
            .await
            .values()
            .filter(|s| !exclude.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn find_by_genre(&self, genre: String) -> AppResult<Vec<ShowProfile>> {
        Ok(self
            .shows
            .read()
            .await
            .values()
            .filter(|s| s.genres.contains(&genre))
            .cloned()
            .collect())
    }

    async fn find_by_tag(&self, tag: String) -> AppResult<Vec<ShowProfile>> {
        Ok(self
            .shows
            .read()
            .await
            .values()
            .filter(|s| s.tags.contains(&tag))
            .cloned()
            .collect())
    }

    async fn find_popular(&self) -> AppResult<Vec<ShowProfile>> {
        Ok(self
            .shows
            .read()
            .await
            .values()
            .filter(|s| s.is_popular)
            .cloned()
            .collect())
    }

    async fn find_by_year(&self, year: i32) -> AppResult<Vec<ShowProfile>> {
        Ok(self
            .shows
            .read()
            .await
            .values()
            .filter(|s| s.release_year == year)
            .cloned()
            .collect())
    }

    async fn all(&self) -> AppResult<Vec<ShowProfile>> {
        Ok(self.shows.read().await.values().cloned().collect())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.shows.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;
    use std::collections::BTreeSet;

    fn show(genre: &str, year: i32, popular: bool) -> ShowProfile {
        ShowProfile {
            id: Uuid::new_v4(),
            title: format!("{} show", genre),
            genres: BTreeSet::from([genre.to_string()]),
            tags: BTreeSet::new(),
            rating: Rating {
                average: 7.0,
                count: 100,
            },
            is_popular: popular,
            release_year: year,
        }
    }

    #[tokio::test]
    async fn test_find_by_genre_filters() {
        let catalog = InMemoryShowCatalog::new();
        catalog.insert(show("Action", 2020, false)).await;
        catalog.insert(show("Drama", 2021, false)).await;

        let action = catalog.find_by_genre("Action".to_string()).await.unwrap();
        assert_eq!(action.len(), 1);
        assert!(action[0].genres.contains("Action"));
    }

    #[tokio::test]
    async fn test_find_excluding_removes_watched() {
        let catalog = InMemoryShowCatalog::new();
        let seen = show("Action", 2020, false);
        let seen_id = seen.id;
        catalog.insert(seen).await;
        catalog.insert(show("Drama", 2021, false)).await;

        let rest = catalog
            .find_excluding(HashSet::from([seen_id]))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_ne!(rest[0].id, seen_id);
    }

    #[tokio::test]
    async fn test_find_popular_and_count() {
        let catalog = InMemoryShowCatalog::new();
        catalog.insert(show("Action", 2020, true)).await;
        catalog.insert(show("Drama", 2021, false)).await;

        assert_eq!(catalog.count().await.unwrap(), 2);
        assert_eq!(catalog.find_popular().await.unwrap().len(), 1);
    }
}
