use super::*;
use crate::manager::test_helpers::{ScriptedFetcher, TEST_TIMEOUT};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use tower::ServiceExt;


/// Helper to create a test TaskManager instance wrapped in Arc
fn create_test_manager(fetcher: ScriptedFetcher) -> (Arc<TaskManager>, tempfile::TempDir) {
    let (manager, temp_dir) =
        crate::manager::test_helpers::create_test_manager(Arc::new(fetcher));
    (Arc::new(manager), temp_dir)
}

/// Router over `manager` using its own configuration
fn router_for(manager: &Arc<TaskManager>) -> Router {
    create_router(manager.clone(), manager.get_config())
}

/// Send one request and decode the JSON response body
async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("response body should be JSON")
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_cors_enabled() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&manager).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());
    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(manager.clone(), Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://allowed.example"
    );

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://other.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());
    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(manager.clone(), Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be absent when CORS is disabled"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());
    let response = router_for(&manager)
        .oneshot(get("/tasks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_server_stops_on_cancellation() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let server = tokio::spawn(serve(listener, manager.clone(), manager.get_config()));

    let body: Value = reqwest::get(format!("http://{address}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    manager.shutdown().await.unwrap();

    let result = tokio::time::timeout(TEST_TIMEOUT, server)
        .await
        .expect("server did not stop after cancellation")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_start_api_server_reports_bind_failure() {
    let (manager, _temp_dir) = create_test_manager(ScriptedFetcher::new());
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = occupied.local_addr().unwrap();

    let err = start_api_server(manager, Arc::new(config))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::Io(_)), "{err:?}");
}
