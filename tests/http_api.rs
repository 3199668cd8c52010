//! End-to-end tests of the HTTP API over an in-memory rating document

mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use faction_poll::http::build_router;
use faction_poll::store::{InMemoryDocumentStorage, MockDocumentStorage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

use fixtures::running_state;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn memory_app() -> Router {
    let state = running_state(Arc::new(InMemoryDocumentStorage::new())).await;
    build_router(state)
}

#[tokio::test]
async fn test_factions_in_catalog_order() {
    let app = memory_app().await;
    let (status, body) = send(&app, "GET", "/factions", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["factions"][0], "归元");
    assert_eq!(body["factions"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_session_then_submit_then_view() {
    let app = memory_app().await;

    let (status, body) = send(&app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["user_id"].as_str().unwrap().to_string();
    assert_eq!(user_id.len(), 8);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/users/{}/scores", user_id),
        Some(json!({"scores": {"归元": 4, "节制": 0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rated_count"], 1);
    assert_eq!(body["history_length"], 1);

    let (status, body) = send(&app, "GET", &format!("/users/{}/scores", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scores"], json!({"归元": 4, "节制": 0}));

    let (status, body) = send(&app, "GET", &format!("/users/{}/history", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"][0]["rated_count"], 1);
    assert_eq!(body["history"][0]["sample_text"], "归元:4分");
    assert_eq!(body["current_ratings"][0]["faction"], "归元");
    assert_eq!(body["display_id"], format!("{}...", &user_id[..6]));
}

#[tokio::test]
async fn test_invalid_submissions_are_bad_requests() {
    let app = memory_app().await;

    let (status, body) = send(
        &app,
        "PUT",
        "/users/u1/scores",
        Some(json!({"scores": {"归元": 7}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_score");

    let (status, body) = send(
        &app,
        "PUT",
        "/users/u1/scores",
        Some(json!({"scores": {"Nope": 3}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_faction");

    // Nothing was saved by the rejected requests
    let (status, _) = send(&app, "GET", "/users/u1/scores", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_integer_scores_are_bad_requests() {
    let app = memory_app().await;

    for score in [json!(2.5), json!("3"), Value::Null, json!(true)] {
        let (status, body) = send(
            &app,
            "PUT",
            "/users/u1/scores",
            Some(json!({"scores": {"归元": score}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "score {}", score);
        assert_eq!(body["error"], "invalid_submission");
        assert!(body["message"].as_str().unwrap().contains("归元"));
    }

    let (status, _) = send(&app, "GET", "/users/u1/scores", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_scores_are_invalid_scores() {
    let app = memory_app().await;

    // Written out by hand: json! cannot hold a literal this large
    for literal in ["99999999999999999999", "18446744073709551615", "-99999999999999999999"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/users/u1/scores")
                    .header("content-type", "application/json")
                    .body(Body::from(format!(r#"{{"scores": {{"归元": {}}}}}"#, literal)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "score {}", literal);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_score");
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = memory_app().await;

    let (status, body) = send(&app, "PUT", "/users/u1/scores", Some(json!({"ratings": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_submission");

    let (status, body) = send(&app, "PUT", "/users/u1/scores", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_submission");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_submissions_keep_liveness_responsive() {
    let app = memory_app().await;

    let submissions: Vec<_> = (0..30)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send(
                    &app,
                    "PUT",
                    &format!("/users/user{:02}/scores", i),
                    Some(json!({"scores": {"节制": i % 5 + 1}})),
                )
                .await
                .0
            })
        })
        .collect();

    let (status, _) = send(&app, "GET", "/alive", None).await;
    assert_eq!(status, StatusCode::OK);

    for status in futures::future::join_all(submissions).await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let (_, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(body["participation"]["user_count"], 30);
}

#[tokio::test]
async fn test_stats_and_faction_detail() {
    let app = memory_app().await;
    for (user, score) in [("u1", 2), ("u2", 4), ("u3", 4)] {
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/users/{}/scores", user),
            Some(json!({"scores": {"归元": score}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["factions"][0]["faction"], "归元");
    assert_eq!(body["factions"][0]["mean"], 3.33);
    assert_eq!(body["participation"]["user_count"], 3);
    assert_eq!(body["participation"]["total_ratings"], 3);
    assert_eq!(body["chart"].as_array().unwrap().len(), 1);

    let uri = format!("/stats/{}", urlencode("归元"));
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let users: Vec<_> = body["ratings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["user_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users, vec!["u2", "u3", "u1"]);
    assert_eq!(body["distribution"], json!([0, 1, 0, 2, 0]));
    assert_eq!(body["summary"]["rated_count"], 3);
}

#[tokio::test]
async fn test_unknown_faction_detail_is_not_found() {
    let app = memory_app().await;
    let (status, body) = send(&app, "GET", "/stats/Nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_faction");
}

#[tokio::test]
async fn test_storage_failure_is_service_unavailable() {
    let storage = Arc::new(MockDocumentStorage::new());
    storage.set_fail_loads(true);
    let app = build_router(running_state(storage).await);

    let (status, body) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "storage_unavailable");

    let (status, _) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_reflect_submissions() {
    let app = memory_app().await;
    send(
        &app,
        "PUT",
        "/users/u1/scores",
        Some(json!({"scores": {"节制": 3}})),
    )
    .await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("faction_poll_submissions_total"));
}

/// Percent-encode a path segment
fn urlencode(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
