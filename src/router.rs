use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::AnidexError;
use crate::api::{BackendApi, JikanApi, RateLimitRetry, build_http_client};
use crate::config::Config;
use crate::db::{CacheStorage, HistoryStorage, SqlitePool};
use crate::handlers::{admin, catalog, community, genres, lists, recommend, users};
use crate::middleware::auth::{ADMIN_KEY_HEADER, AdminKey, USER_EMAIL_HEADER, USER_ID_HEADER};
use crate::service::{CatalogService, CommunityService, ListService, RecommendService, UserService};

#[derive(Clone)]
pub struct AnidexState {
    pub catalog: CatalogService,
    pub recommend: RecommendService,
    pub lists: ListService,
    pub community: CommunityService,
    pub users: UserService,
    pub admin_key: AdminKey,
    pub pool: SqlitePool,
}

impl AnidexState {
    /// Wire every service from configuration and an initialized pool.
    pub fn new(cfg: &Config, pool: SqlitePool) -> Result<Self, AnidexError> {
        let client = build_http_client(&cfg.upstream)?;
        let jikan = JikanApi::new(
            client.clone(),
            &cfg.upstream,
            RateLimitRetry::from(&cfg.retry),
        );
        let backend = BackendApi::new(client, &cfg.upstream);
        let cache = CacheStorage::new(
            pool.clone(),
            cfg.cache.soft_limit_bytes,
            cfg.cache.evict_fraction,
        );
        let history = HistoryStorage::new(pool.clone());

        Ok(Self {
            catalog: CatalogService::new(jikan.clone(), cache, &cfg.cache, &cfg.retry),
            recommend: RecommendService::new(backend.clone(), jikan.clone(), history),
            lists: ListService::new(backend.clone(), jikan.clone()),
            community: CommunityService::new(backend.clone(), jikan),
            users: UserService::new(backend),
            admin_key: AdminKey(Arc::from(cfg.basic.admin_key.as_str())),
            pool,
        })
    }
}

impl FromRef<AnidexState> for AdminKey {
    fn from_ref(state: &AnidexState) -> Self {
        state.admin_key.clone()
    }
}

pub fn anidex_router(state: AnidexState, cfg: &Config) -> Router {
    let api = Router::new()
        // catalog
        .route("/anime/search", get(catalog::search))
        .route("/anime/top", get(catalog::top))
        .route("/anime/season/now", get(catalog::season_now))
        .route("/anime/trending", get(catalog::trending))
        .route("/anime/random", get(catalog::random))
        .route("/anime/{id}", get(catalog::anime))
        .route("/anime/{id}/full", get(catalog::anime_full))
        .route("/genres", get(genres::list))
        .route("/genres/{name}", get(genres::details))
        .route("/genres/{name}/refresh", post(genres::refresh))
        // recommendations
        .route("/recommend", post(recommend::recommend))
        .route("/recommend/suggestions", get(recommend::suggestions))
        .route("/recommend/lucky", get(recommend::lucky))
        .route("/recommend/history", get(recommend::history))
        // per-user lists
        .route(
            "/wishlist",
            get(lists::wishlist).post(lists::add_to_wishlist),
        )
        .route("/wishlist/{id}", delete(lists::remove_from_wishlist))
        .route("/wishlist/{id}/watched", post(lists::mark_watched))
        .route("/watchlist", get(lists::watchlist))
        .route("/watchlist/{id}", delete(lists::remove_from_watchlist))
        // community
        .route("/votes", post(community::vote_anime))
        .route("/votes/top", get(community::top_voted))
        .route("/votes/community", post(community::community_vote))
        .route(
            "/topics",
            get(community::topics).post(community::create_topic),
        )
        .route("/topics/{id}", get(community::topic))
        .route("/topics/{id}/vote", post(community::vote_topic))
        .route("/topics/{id}/comments", post(community::add_comment))
        .route("/comments/{id}/vote", post(community::vote_comment))
        .route("/users/sync", post(users::sync))
        .route("/news", get(community::news));

    let admin = Router::new().route(
        "/cache",
        get(admin::cache_stats).delete(admin::clear_cache),
    );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest("/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&cfg.basic.cors_origins))
        .with_state(state)
}

/// Reports whether the local store answers; upstreams are not probed.
async fn health(State(state): State<AnidexState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(error = %e, "health check: database unavailable");
            "unavailable"
        }
    };
    Json(json!({"status": "ok", "database": database}))
}

/// Empty `origins` allows any origin. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(ADMIN_KEY_HEADER),
            HeaderName::from_static(USER_EMAIL_HEADER),
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .max_age(Duration::from_secs(3600))
}
