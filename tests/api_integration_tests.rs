//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each endpoint against an
//! in-process tree source.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use common::{tree, ScriptedSource};
use hierarchy_cache::api::create_router;
use hierarchy_cache::cache::CacheCoordinator;
use hierarchy_cache::AppState;

// == Helper Functions ==

fn create_test_app() -> (Router, Arc<ScriptedSource>) {
    let source = Arc::new(ScriptedSource::serving(tree("root-1", &["a", "b"])));
    let state = AppState::wire(
        Arc::new(CacheCoordinator::memory_only(300_000)),
        source.clone(),
        None,
    );
    (create_router(state), source)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Tree Endpoint Tests ==

#[tokio::test]
async fn test_load_endpoint_success() {
    let (app, _source) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"].as_str().unwrap(), "root-1");
    assert_eq!(json["node_count"].as_u64().unwrap(), 3);
    assert_eq!(json["root"]["id"].as_str().unwrap(), "root-1");
    assert!(json["checksum"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn test_load_endpoint_serves_cache_when_source_down() {
    let (app, source) = create_test_app();

    // Warm the cache
    let warm = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(warm.status(), StatusCode::OK);

    // Take the source down; the cached tree must still be served
    source.fail(true);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_load_endpoint_source_failure_without_cache() {
    let (app, source) = create_test_app();
    source.fail(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == Refresh Endpoint Tests ==

#[tokio::test]
async fn test_refresh_endpoint_picks_up_structure_change() {
    let (app, source) = create_test_app();

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let first_json = body_to_json(first.into_body()).await;

    source.swap(tree("root-1", &["a", "b", "c"]));

    let refreshed = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tree/root-1/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(refreshed.status(), StatusCode::OK);

    let json = body_to_json(refreshed.into_body()).await;
    assert_eq!(json["node_count"].as_u64().unwrap(), 4);
    assert_ne!(json["checksum"], first_json["checksum"]);
}

// == Update Node Endpoint Tests ==

#[tokio::test]
async fn test_update_node_endpoint_success() {
    let (app, _source) = create_test_app();

    // Seed the cache
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/tree/root-1/nodes/a")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"node":{"id":"a","label":"A renamed","nodeType":"category"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("a"));

    // The cached tree now serves the replaced node
    let reread = app
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_to_json(reread.into_body()).await;
    assert_eq!(json["root"]["children"][0]["label"].as_str().unwrap(), "A renamed");
}

#[tokio::test]
async fn test_update_node_endpoint_unknown_node() {
    let (app, _source) = create_test_app();

    app.clone()
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/tree/root-1/nodes/ghost")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"node":{"id":"x","label":"X","nodeType":"law"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_node_endpoint_invalid_body() {
    let (app, _source) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/tree/root-1/nodes/a")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"node":{"id":"","label":"X","nodeType":"law"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Invalidate Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_endpoint_forces_refetch() {
    let (app, source) = create_test_app();

    app.clone()
        .oneshot(
            Request::builder()
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(source.fetches(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/tree/root-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Next load misses the cache and hits the source again
    app.oneshot(
        Request::builder()
            .uri("/tree/root-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_invalidate_all_endpoint() {
    let (app, _source) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/tree")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("cleared"));
}

// == Stats & Health Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_reflects_reads() {
    let (app, _source) = create_test_app();

    // Miss then hit
    for _ in 0..2 {
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/tree/root-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["hits"].as_u64().unwrap() >= 1);
    assert!(json["misses"].as_u64().unwrap() >= 1);
    assert_eq!(json["memory_entries"].as_u64().unwrap(), 1);
    assert_eq!(json["bulk_available"].as_bool().unwrap(), false);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _source) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
}
