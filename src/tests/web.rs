use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::volatile_service;
use crate::web::router;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_document_lifecycle() {
    let app = router(volatile_service());

    let (status, created) = send(
        &app,
        "POST",
        "/api/documents",
        Some(json!({"content": "Use ripgrep for code search", "tags": ["tools"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "created");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, doc) = send(&app, "GET", &format!("/api/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["content"], "Use ripgrep for code search");
    assert_eq!(doc["tags"], json!(["tools"]));
    assert_eq!(doc["favorite"], false);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/documents/{id}"),
        Some(json!({"content": "Use ripgrep or fd for search"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "updated");

    let (status, fav) = send(
        &app,
        "PUT",
        &format!("/api/documents/{id}/favorite"),
        Some(json!({"favorite": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fav["favorite"], true);

    let (status, all) = send(&app, "GET", "/api/documents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(all[0]["content"], "Use ripgrep or fd for search");
    assert_eq!(all[0]["favorite"], true);

    let (status, deleted) = send(&app, "DELETE", &format!("/api/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["status"], "deleted");

    let (status, err) = send(&app, "GET", &format!("/api/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(err["error"].as_str().unwrap().contains(&id));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_returns_scores() {
    let app = router(volatile_service());

    for (content, favorite) in [
        ("rust error handling with thiserror", true),
        ("baking sourdough at home", false),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/documents",
            Some(json!({"content": content, "favorite": favorite})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, hits) = send(
        &app,
        "GET",
        "/api/search?q=rust%20error%20handling&limit=1&threshold=0.1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["content"], "rust error handling with thiserror");
    let score = hits[0]["score"].as_f64().unwrap();
    let boosted = hits[0]["boosted_score"].as_f64().unwrap();
    assert!((boosted - score * 1.2).abs() < 1e-5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_validation() {
    let app = router(volatile_service());

    for uri in [
        "/api/search",
        "/api/search?q=",
        "/api/search?q=x&limit=0",
        "/api/search?q=x&limit=ten",
        "/api/search?q=x&threshold=2",
        "/api/search?q=x&threshold=-0.5",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stats_and_index() {
    let app = router(volatile_service());

    send(&app, "POST", "/api/documents", Some(json!({"content": "one"}))).await;
    send(&app, "GET", "/api/search?q=one", None).await;

    let (status, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_documents"], 1);
    assert_eq!(stats["add_document_count"], 1);
    assert_eq!(stats["search_count"], 1);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("/api/documents"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_document_routes() {
    let app = router(volatile_service());

    let (status, _) = send(&app, "DELETE", "/api/documents/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/documents/missing/favorite",
        Some(json!({"favorite": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
