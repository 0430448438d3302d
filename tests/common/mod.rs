#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

pub const ADMIN_KEY: &str = "test-admin";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}/")).expect("stub url")
}

/// Gateway wired to the given stub upstreams with an in-memory database.
pub async fn gateway(jikan: Router, backend: Router) -> Router {
    let mut cfg = anidex::config::Config::default();
    cfg.basic.admin_key = ADMIN_KEY.to_string();
    cfg.upstream.jikan_base_url = spawn_stub(jikan).await;
    cfg.upstream.backend_base_url = spawn_stub(backend).await;
    cfg.upstream.jikan_requests_per_second = 1000;
    cfg.retry.default_retry_after_ms = 10;
    cfg.retry.random_pick_delay_ms = 10;

    let pool = anidex::db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    let state = anidex::router::AnidexState::new(&cfg, pool).expect("state");
    anidex::router::anidex_router(state, &cfg)
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(email) = user {
        builder = builder.header("x-user-email", email);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}
