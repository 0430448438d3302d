mod common;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    routing::{get, post},
};
use common::{ADMIN_KEY, gateway, get as get_req, json_body, post_json, send};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

#[tokio::test]
async fn health_reports_database() {
    let app = gateway(Router::new(), Router::new()).await;
    let resp = send(&app, get_req("/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn wishlist_without_user_prompts_login() {
    let app = gateway(Router::new(), Router::new()).await;
    let resp = send(&app, get_req("/api/wishlist")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "LOGIN_REQUIRED");
}

#[derive(Clone, Default)]
struct Hits {
    genres: Arc<AtomicUsize>,
    listing: Arc<AtomicUsize>,
}

fn genre_stub(hits: Hits) -> Router {
    Router::new()
        .route(
            "/genres/anime",
            get(|State(hits): State<Hits>| async move {
                hits.genres.fetch_add(1, Ordering::SeqCst);
                Json(json!({"data": [
                    {"mal_id": 1, "name": "Action", "count": 5000},
                    {"mal_id": 4, "name": "Comedy", "count": 7000},
                    {"mal_id": 22, "name": "Romance", "count": 2000},
                    {"mal_id": 8, "name": "Drama", "count": 3000},
                    {"mal_id": 10, "name": "Fantasy", "count": 4000}
                ]}))
            }),
        )
        .route(
            "/anime",
            get(
                |State(hits): State<Hits>, Query(q): Query<HashMap<String, String>>| async move {
                    hits.listing.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(q.get("genres").map(String::as_str), Some("22"));
                    assert_eq!(q.get("order_by").map(String::as_str), Some("score"));
                    Json(json!({
                        "data": [
                            {"mal_id": 100, "title": "Toradora!", "score": 8.0},
                            {"mal_id": 101, "title": "Clannad", "score": 9.0},
                            {"mal_id": 102, "title": "Unrated"}
                        ],
                        "pagination": {"has_next_page": true, "last_visible_page": 9}
                    }))
                },
            ),
        )
        .with_state(hits)
}

#[tokio::test]
async fn genre_page_is_served_from_cache_on_second_read() {
    let hits = Hits::default();
    let app = gateway(genre_stub(hits.clone()), Router::new()).await;

    let first = send(&app, get_req("/api/genres/romance?page=1&sort=score")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = json_body(first).await;
    assert_eq!(body["genre"]["mal_id"], 22);
    assert_eq!(body["stats"]["count"], 2000);
    assert_eq!(body["stats"]["average_score"], 8.5);
    assert_eq!(body["has_next_page"], true);
    let related: Vec<u64> = body["related"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["mal_id"].as_u64().unwrap())
        .collect();
    assert_eq!(related, vec![4, 1, 10]);

    let second = send(&app, get_req("/api/genres/Romance?page=1&sort=score")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(hits.genres.load(Ordering::SeqCst), 1);
    assert_eq!(hits.listing.load(Ordering::SeqCst), 1);

    let missing = send(&app, get_req("/api/genres/mecha")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing).await["error"]["code"], "GENRE_NOT_FOUND");
}

#[tokio::test]
async fn recommendation_falls_back_to_title_search() {
    let backend_queries: Arc<std::sync::Mutex<Vec<String>>> = Arc::default();
    let backend = Router::new()
        .route(
            "/ai-recommend",
            post(
                |State(seen): State<Arc<std::sync::Mutex<Vec<String>>>>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(body["query"].as_str().unwrap_or_default().to_string());
                    Json(json!([]))
                },
            ),
        )
        .with_state(backend_queries.clone());
    let jikan = Router::new().route(
        "/anime",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            assert_eq!(q.get("limit").map(String::as_str), Some("20"));
            Json(json!({"data": [{"mal_id": 1535, "title": q["q"].clone()}]}))
        }),
    );
    let app = gateway(jikan, backend).await;

    let resp = send(
        &app,
        post_json(
            "/api/recommend",
            Some("fan@example.com"),
            json!({"query": "Anime like Death Note?"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["source"], "catalog_search");
    assert_eq!(body["extracted_title"], "Death Note");
    assert_eq!(body["results"][0]["title"], "Death Note");
    assert_eq!(
        *backend_queries.lock().unwrap(),
        vec!["Anime like Death Note?".to_string(), "I watched Death Note".to_string()]
    );

    let history = send(
        &app,
        Request::builder()
            .uri("/api/recommend/history")
            .header("x-user-email", "fan@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(json_body(history).await["queries"], json!(["Anime like Death Note?"]));
}

#[tokio::test]
async fn admin_cache_requires_key() {
    let app = gateway(Router::new(), Router::new()).await;

    let denied = send(&app, get_req("/admin/cache")).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = send(
        &app,
        Request::builder()
            .uri("/admin/cache")
            .header("x-admin-key", ADMIN_KEY)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(allowed.status(), StatusCode::OK);
    let stats = json_body(allowed).await;
    assert_eq!(stats["entries"], 0);
}

#[tokio::test]
async fn user_sync_creates_missing_record() {
    let backend = Router::new()
        .route("/users/{uid}", get(|Path(_uid): Path<String>| async { StatusCode::NOT_FOUND }))
        .route(
            "/users",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["role"], "customer");
                assert_eq!(body["uid"], "uid-42");
                Json(json!({"insertedId": "abc"}))
            }),
        );
    let app = gateway(Router::new(), backend).await;

    let resp = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/users/sync")
            .header("content-type", "application/json")
            .header("x-user-email", "spike@bebop.io")
            .header("x-user-id", "uid-42")
            .body(Body::from(json!({"name": "Spike"}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["user"]["role"], "customer");
}

#[tokio::test]
async fn news_falls_back_when_backend_is_down() {
    let backend = Router::new().route("/api/news", get(|| async { StatusCode::BAD_GATEWAY }));
    let app = gateway(Router::new(), backend).await;
    let body = json_body(send(&app, get_req("/api/news")).await).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn suggestions_are_filtered_canned_queries() {
    let app = gateway(Router::new(), Router::new()).await;
    let body = json_body(send(&app, get_req("/api/recommend/suggestions?q=titan")).await).await;
    assert_eq!(
        body["queries"],
        json!(["I watched Attack on Titan", "Shows like Attack on Titan"])
    );
}

#[tokio::test]
async fn community_writes_identify_the_caller_by_email() {
    let seen: Arc<std::sync::Mutex<Vec<Value>>> = Arc::default();
    let record = |State(seen): State<Arc<std::sync::Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
        seen.lock().unwrap().push(body);
        Json(json!({"acknowledged": true}))
    };
    let backend = Router::new()
        .route("/api/topics", post(record))
        .route("/api/topics/{id}/vote", post(record))
        .route("/api/topics/{id}/comments", post(record))
        .route("/api/comments/{id}/vote", post(record))
        .with_state(seen.clone());
    let app = gateway(Router::new(), backend).await;

    let with_identity = |uri: &str, body: Value| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-user-email", "spike@bebop.io")
            .header("x-user-id", "uid-42")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let created = send(&app, with_identity("/api/topics", json!({"title": "Best OST"}))).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    send(&app, with_identity("/api/topics/t1/vote", json!({"direction": "up"}))).await;
    send(&app, with_identity("/api/topics/t1/comments", json!({"content": "Tank!"}))).await;
    send(&app, with_identity("/api/comments/c1/vote", json!({"direction": "down"}))).await;

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies.len(), 4);
    assert_eq!(bodies[0]["authorId"], "spike@bebop.io");
    assert_eq!(bodies[1]["userId"], "spike@bebop.io");
    assert_eq!(bodies[2]["authorId"], "spike@bebop.io");
    assert_eq!(bodies[3]["userId"], "spike@bebop.io");
}

#[tokio::test]
async fn wishlist_tolerates_sparse_backend_entries() {
    let backend = Router::new().route(
        "/wishList/{email}",
        get(|Path(email): Path<String>| async move {
            Json(json!([
                {"_id": "w1", "animeId": 1, "title": "Cowboy Bebop", "userEmail": email},
                {"_id": "w2", "animeId": 2, "userEmail": email}
            ]))
        }),
    );
    let app = gateway(Router::new(), backend).await;

    let resp = send(
        &app,
        Request::builder()
            .uri("/api/wishlist")
            .header("x-user-email", "fan@example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[1]["_id"], "w2");
}

#[tokio::test]
async fn search_defaults_to_twelve_results() {
    let jikan = Router::new().route(
        "/anime",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            if q.get("limit").map(String::as_str) != Some("12") {
                return Err(StatusCode::BAD_REQUEST);
            }
            Ok(Json(json!({"data": [{"mal_id": 1, "title": q["q"].clone()}]})))
        }),
    );
    let app = gateway(jikan, Router::new()).await;

    let resp = send(&app, get_req("/api/anime/search?q=bebop")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"][0]["title"], "bebop");

    let blank = send(&app, get_req("/api/anime/search?q=%20")).await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
}
