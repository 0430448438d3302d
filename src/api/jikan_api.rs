use crate::config::{RetryConfig, UpstreamConfig};
use crate::error::{AnidexError, IsRetryable, Upstream};
use crate::types::jikan::{
    Anime, BrowseFilters, Genre, GenreSort, JikanItem, JikanPage, TopFilter,
};
use backon::{ConstantBuilder, Retryable};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Rate-limit retry policy: on HTTP 429 wait the server-suggested delay (or the
/// default) and try again, at most `max_retries` times. No jitter, no backoff growth.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRetry {
    pub max_retries: usize,
    pub default_delay: Duration,
    pub max_delay: Duration,
}

impl From<&RetryConfig> for RateLimitRetry {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            default_delay: cfg.default_retry_after(),
            max_delay: cfg.max_retry_after(),
        }
    }
}

impl RateLimitRetry {
    fn policy(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.default_delay)
            .with_max_times(self.max_retries)
    }

    /// Delay for a 429 response: leading integer of `Retry-After` in seconds;
    /// zero or unparseable falls back to the default.
    pub fn delay_for(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(leading_seconds)
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.default_delay)
            .min(self.max_delay)
    }
}

fn leading_seconds(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Anime metadata API caller. Every request passes the outbound throttle and the
/// rate-limit retry loop.
#[derive(Clone)]
pub struct JikanApi {
    client: reqwest::Client,
    base_url: Url,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RateLimitRetry,
}

impl JikanApi {
    pub fn new(client: reqwest::Client, upstream: &UpstreamConfig, retry: RateLimitRetry) -> Self {
        let per_second = NonZeroU32::new(upstream.jikan_requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            base_url: upstream.jikan_base_url.clone(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            retry,
        }
    }

    pub async fn search(&self, q: &str, limit: u32) -> Result<JikanPage<Anime>, AnidexError> {
        self.get_json("anime", &[("q", q.to_string()), ("limit", limit.to_string())])
            .await
    }

    pub async fn anime(&self, id: u64) -> Result<Anime, AnidexError> {
        let item: JikanItem<Anime> = self.get_json(&format!("anime/{id}"), &[]).await?;
        Ok(item.data)
    }

    /// Full record (trailer, relations, ...), with an optional tighter timeout.
    pub async fn anime_full(&self, id: u64, timeout: Option<Duration>) -> Result<Anime, AnidexError> {
        let item: JikanItem<Anime> = self
            .fetch(&format!("anime/{id}/full"), &[], timeout)
            .await?;
        Ok(item.data)
    }

    pub async fn top(
        &self,
        filter: Option<TopFilter>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<JikanPage<Anime>, AnidexError> {
        let mut query = Vec::new();
        if let Some(filter) = filter {
            query.push(("filter", filter.as_str().to_string()));
        }
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_json("top/anime", &query).await
    }

    pub async fn season_now(&self, limit: u32) -> Result<JikanPage<Anime>, AnidexError> {
        self.get_json("seasons/now", &[("limit", limit.to_string())])
            .await
    }

    pub async fn genres(&self) -> Result<Vec<Genre>, AnidexError> {
        let page: JikanPage<Genre> = self.get_json("genres/anime", &[]).await?;
        Ok(page.data)
    }

    pub async fn anime_by_genre(
        &self,
        genre_id: u64,
        page: u32,
        sort: GenreSort,
    ) -> Result<JikanPage<Anime>, AnidexError> {
        let (order_by, direction) = sort.order();
        self.get_json(
            "anime",
            &[
                ("genres", genre_id.to_string()),
                ("page", page.to_string()),
                ("order_by", order_by.to_string()),
                ("sort", direction.to_string()),
            ],
        )
        .await
    }

    pub async fn browse(&self, filters: &BrowseFilters) -> Result<JikanPage<Anime>, AnidexError> {
        self.get_json("anime", &filters.to_query()).await
    }

    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, AnidexError>
    where
        T: DeserializeOwned,
    {
        self.fetch(path, query, None).await
    }

    async fn fetch<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<T, AnidexError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, query)?;

        (|| async { self.fetch_once(url.clone(), timeout).await })
            .retry(self.retry.policy())
            .when(|e: &AnidexError| e.is_retryable())
            .adjust(|e: &AnidexError, dur: Option<Duration>| {
                dur.map(|d| e.retry_after().unwrap_or(d))
            })
            .notify(|err, dur: Duration| {
                warn!(path, "metadata API {}, retrying in {:?}", err, dur);
            })
            .await
    }

    async fn fetch_once<T>(&self, url: Url, timeout: Option<Duration>) -> Result<T, AnidexError>
    where
        T: DeserializeOwned,
    {
        self.limiter.until_ready().await;

        debug!(url = %url, "GET metadata API");
        let mut req = self.client.get(url);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AnidexError::RateLimited {
                retry_after: self.retry.delay_for(resp.headers()),
            });
        }
        if !status.is_success() {
            return Err(AnidexError::UpstreamStatus {
                service: Upstream::Jikan,
                status,
            });
        }
        Ok(resp.json::<T>().await?)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, AnidexError> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}
