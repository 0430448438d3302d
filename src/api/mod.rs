//! Stateless callers for the two external collaborators.

pub mod backend_api;
pub mod jikan_api;

pub use backend_api::BackendApi;
pub use jikan_api::{JikanApi, RateLimitRetry};

use crate::config::UpstreamConfig;
use crate::error::AnidexError;
use std::time::Duration;

/// Shared outbound HTTP client configured from the upstream section.
pub fn build_http_client(cfg: &UpstreamConfig) -> Result<reqwest::Client, AnidexError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs));
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}
