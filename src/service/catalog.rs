use crate::api::JikanApi;
use crate::config::{CacheConfig, RetryConfig};
use crate::db::CacheStorage;
use crate::error::AnidexError;
use crate::types::jikan::{Anime, BrowseFilters, Genre, GenreSort, JikanPage, TopFilter};
use backon::{ConstantBuilder, Retryable};
use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, warn};

const GENRES_CACHE_KEY: &str = "jikan-genres";
const RELATED_GENRES: usize = 3;
const RANDOM_TOP_PAGES: u32 = 100;

/// Genre page: the genre, one page of its anime, and derived stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreDetails {
    pub genre: Genre,
    pub page: u32,
    pub sort: GenreSort,
    pub anime: Vec<Anime>,
    pub has_next_page: bool,
    pub stats: GenreStats,
    pub related: Vec<Genre>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreStats {
    pub count: u64,
    /// Mean of the scored entries on this page, two decimals.
    pub average_score: Option<f64>,
    pub mal_id: u64,
}

#[derive(Debug, Clone, Copy)]
struct RandomPick {
    retries: usize,
    delay: Duration,
    timeout: Duration,
}

/// Read views over the metadata API, with cache-aside on listings.
#[derive(Clone)]
pub struct CatalogService {
    jikan: JikanApi,
    cache: CacheStorage,
    ttl: Duration,
    random: RandomPick,
}

impl CatalogService {
    pub fn new(jikan: JikanApi, cache: CacheStorage, cache_cfg: &CacheConfig, retry: &RetryConfig) -> Self {
        Self {
            jikan,
            cache,
            ttl: cache_cfg.ttl(),
            random: RandomPick {
                retries: retry.random_pick_retries,
                delay: Duration::from_millis(retry.random_pick_delay_ms),
                timeout: Duration::from_secs(retry.random_pick_timeout_secs),
            },
        }
    }

    pub fn cache(&self) -> &CacheStorage {
        &self.cache
    }

    pub async fn search(&self, q: &str, limit: u32) -> Result<JikanPage<Anime>, AnidexError> {
        let q = q.trim();
        if q.is_empty() {
            return Err(AnidexError::InvalidInput("search query is empty".into()));
        }
        self.jikan.search(q, limit).await
    }

    pub async fn anime(&self, id: u64) -> Result<Anime, AnidexError> {
        self.jikan.anime(id).await
    }

    pub async fn anime_full(&self, id: u64) -> Result<Anime, AnidexError> {
        self.jikan.anime_full(id, None).await
    }

    pub async fn top(
        &self,
        filter: Option<TopFilter>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<JikanPage<Anime>, AnidexError> {
        let key = format!(
            "jikan-top-{}-{}-{}",
            filter.map(|f| f.as_str()).unwrap_or("all"),
            page.unwrap_or(1),
            limit.map(|l| l.to_string()).unwrap_or_default(),
        );
        self.cached(&key, || self.jikan.top(filter, page, limit))
            .await
    }

    pub async fn season_now(&self, limit: u32) -> Result<JikanPage<Anime>, AnidexError> {
        let key = format!("jikan-season-now-{limit}");
        self.cached(&key, || self.jikan.season_now(limit)).await
    }

    pub async fn trending(&self, filters: &BrowseFilters) -> Result<JikanPage<Anime>, AnidexError> {
        self.cached(&filters.cache_key(), || self.jikan.browse(filters))
            .await
    }

    pub async fn genres(&self) -> Result<Vec<Genre>, AnidexError> {
        self.cached(GENRES_CACHE_KEY, || self.jikan.genres()).await
    }

    pub async fn genre_details(
        &self,
        name: &str,
        page: u32,
        sort: GenreSort,
    ) -> Result<GenreDetails, AnidexError> {
        let page = page.max(1);
        let genres = self.genres().await?;
        let genre = find_genre(&genres, name)
            .cloned()
            .ok_or_else(|| AnidexError::GenreNotFound(name.to_string()))?;

        let key = genre_page_key(name, page, sort);
        let listing = self
            .cached(&key, || self.jikan.anime_by_genre(genre.mal_id, page, sort))
            .await?;

        let stats = GenreStats {
            count: genre.count,
            average_score: average_score(&listing.data),
            mal_id: genre.mal_id,
        };
        let related = related_genres(&genres, genre.mal_id);
        let has_next_page = listing
            .pagination
            .as_ref()
            .is_some_and(|p| p.has_next_page);

        Ok(GenreDetails {
            genre,
            page,
            sort,
            anime: listing.data,
            has_next_page,
            stats,
            related,
        })
    }

    /// Drop the cached taxonomy and the given genre page so the next read refetches.
    pub async fn refresh_genre(&self, name: &str, page: u32, sort: GenreSort) -> Result<(), AnidexError> {
        self.cache.invalidate(GENRES_CACHE_KEY).await?;
        self.cache
            .invalidate(&genre_page_key(name, page.max(1), sort))
            .await?;
        info!(genre = name, page, sort = sort.as_str(), "genre cache invalidated");
        Ok(())
    }

    /// A random well-ranked anime with full details (trailer included).
    /// Any failure is retried a fixed number of times after a fixed delay.
    pub async fn random_pick(&self) -> Result<Anime, AnidexError> {
        let policy = ConstantBuilder::default()
            .with_delay(self.random.delay)
            .with_max_times(self.random.retries);

        (|| async {
            let page = rand::rng().random_range(1..=RANDOM_TOP_PAGES);
            let top = self.jikan.top(None, Some(page), Some(1)).await?;
            let first = top
                .data
                .into_iter()
                .next()
                .ok_or_else(|| AnidexError::EntryNotFound(format!("top anime page {page}")))?;
            self.jikan
                .anime_full(first.mal_id, Some(self.random.timeout))
                .await
        })
        .retry(policy)
        .notify(|err, dur: Duration| {
            warn!("random pick failed: {}, retrying in {:?}", err, dur);
        })
        .await
    }

    async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, AnidexError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AnidexError>>,
    {
        match self.cache.get::<T>(key, self.ttl).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "cache read failed; fetching upstream"),
        }

        let fresh = fetch().await?;
        if let Err(e) = self.cache.put(key, &fresh).await {
            warn!(key, error = %e, "cache write failed");
        }
        Ok(fresh)
    }
}

fn genre_page_key(name: &str, page: u32, sort: GenreSort) -> String {
    format!(
        "jikan-anime-{}-{}-{}",
        name.trim().to_lowercase(),
        page,
        sort.as_str()
    )
}

pub fn find_genre<'a>(genres: &'a [Genre], name: &str) -> Option<&'a Genre> {
    let name = name.trim();
    genres.iter().find(|g| g.name.eq_ignore_ascii_case(name))
}

/// Unscored (missing or zero) entries are left out.
pub fn average_score(anime: &[Anime]) -> Option<f64> {
    let scores: Vec<f64> = anime
        .iter()
        .filter_map(|a| a.score)
        .filter(|s| *s != 0.0)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// The most populous other genres.
pub fn related_genres(genres: &[Genre], exclude_id: u64) -> Vec<Genre> {
    let mut others: Vec<Genre> = genres
        .iter()
        .filter(|g| g.mal_id != exclude_id)
        .cloned()
        .collect();
    others.sort_by(|a, b| b.count.cmp(&a.count));
    others.truncate(RELATED_GENRES);
    others
}
