//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use sqlx::PgPool;
use storyforge_core::clock::Clock;
use storyforge_core::generator::NarrativeGenerator;
use storyforge_store::pg_job_repository::PgJobRepository;
use storyforge_store::pg_story_repository::PgStoryRepository;
use storyforge_test_support::{FixedClock, ScriptedGenerator};
use tower::ServiceExt;

use storyforge_api::build_router;
use storyforge_api::state::AppState;

/// A three-node story: a root with a losing and a winning ending.
pub const FORK_STORY: &str = r#"```json
{
  "title": "The Fork",
  "rootNode": {
    "content": "A road splits in two.",
    "isEnding": false,
    "options": [
      { "text": "Left", "nextNode": { "content": "A dragon.", "isEnding": true, "isWinningEnding": false, "options": [] } },
      { "text": "Right", "nextNode": { "content": "Treasure!", "isEnding": true, "isWinningEnding": true } }
    ]
  }
}
```"#;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router with PostgreSQL repositories and a generator
/// that always returns `FORK_STORY`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_generator(pool, Arc::new(ScriptedGenerator::new(FORK_STORY)))
}

/// Build the full app router with a custom generator.
pub fn build_test_app_with_generator(
    pool: PgPool,
    generator: Arc<dyn NarrativeGenerator>,
) -> Router {
    let app_state = AppState::new(
        fixed_clock(),
        Arc::new(PgJobRepository::new(pool.clone())),
        Arc::new(PgStoryRepository::new(pool)),
        generator,
    );
    build_router(app_state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let (status, _, json) = post_json_with_cookie(app, uri, body, None).await;
    (status, json)
}

/// Send a POST request with a JSON body and an optional `Cookie` header;
/// returns the response headers too.
pub async fn post_json_with_cookie(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
    cookie: Option<&str>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, headers, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();

    (status, json)
}

/// Polls `GET /api/v1/jobs/{job_id}` until the job leaves `processing`.
pub async fn poll_until_terminal(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, json) = get_json(app.clone(), &format!("/api/v1/jobs/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        if json["status"] != "processing" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never left processing");
}
