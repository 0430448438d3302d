use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::error::AnidexError;

pub const DEFAULT_CONFIG_FILE: &str = "anidex.toml";

/// Process-wide configuration, resolved once on first access.
pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid anidex configuration"));

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    /// Key guarding the `/admin` routes. Empty disables them.
    pub admin_key: String,
    /// Browser origins allowed by CORS. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            admin_key: String::new(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:anidex.db".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Anime metadata API (Jikan v4). Must end with a slash.
    pub jikan_base_url: Url,
    /// Application backend (users, lists, votes, topics).
    pub backend_base_url: Url,
    pub proxy: Option<Url>,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Outbound throttle for the metadata API.
    pub jikan_requests_per_second: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            jikan_base_url: Url::parse("https://api.jikan.moe/v4/").expect("valid default url"),
            backend_base_url: Url::parse("http://localhost:5000/").expect("valid default url"),
            proxy: None,
            user_agent: "anidex/0.1".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 15,
            jikan_requests_per_second: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Once the stored total exceeds this, the oldest entries are evicted.
    pub soft_limit_bytes: u64,
    pub evict_fraction: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            soft_limit_bytes: 4 * 1024 * 1024,
            evict_fraction: 0.25,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first rate-limited attempt.
    pub max_retries: usize,
    /// Delay used when the upstream sends no usable `Retry-After`.
    pub default_retry_after_ms: u64,
    pub max_retry_after_ms: u64,
    pub random_pick_retries: usize,
    pub random_pick_delay_ms: u64,
    pub random_pick_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_retry_after_ms: 3_000,
            max_retry_after_ms: 60_000,
            random_pick_retries: 3,
            random_pick_delay_ms: 2_000,
            random_pick_timeout_secs: 5,
        }
    }
}

impl RetryConfig {
    pub fn default_retry_after(&self) -> Duration {
        Duration::from_millis(self.default_retry_after_ms)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_millis(self.max_retry_after_ms)
    }
}

impl Config {
    /// Defaults, then `anidex.toml` (or `$ANIDEX_CONFIG`), then `ANIDEX_*` env vars.
    pub fn load() -> Result<Self, AnidexError> {
        let path = std::env::var("ANIDEX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::figment(&path).extract().map_err(Into::into)
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ANIDEX_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_cache_and_retry_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.cache.soft_limit_bytes, 4 * 1024 * 1024);
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.retry.max_retries, 3);
        assert!(cfg.basic.admin_key.is_empty());
        assert_eq!(cfg.retry.default_retry_after(), Duration::from_secs(3));
        assert_eq!(cfg.upstream.jikan_base_url.as_str(), "https://api.jikan.moe/v4/");
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "anidex.toml",
                r#"
                [basic]
                admin_key = "from-file"

                [cache]
                ttl_secs = 60
                "#,
            )?;
            jail.set_env("ANIDEX_CACHE__TTL_SECS", "120");
            jail.set_env("ANIDEX_RETRY__MAX_RETRIES", "5");

            let cfg: Config = Config::figment("anidex.toml").extract()?;
            assert_eq!(cfg.basic.admin_key, "from-file");
            assert_eq!(cfg.cache.ttl_secs, 120);
            assert_eq!(cfg.retry.max_retries, 5);
            assert_eq!(cfg.cache.evict_fraction, 0.25);
            Ok(())
        });
    }
}
