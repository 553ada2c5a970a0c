//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle of the HTTP host binding.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use common::{storage, FakeHost, FakeNetwork};
use offline_worker::precache::{ManifestEntry, PrecacheManifest};
use offline_worker::routing::{MatcherSpec, RouteSpec};
use offline_worker::strategies::StrategyKind;
use offline_worker::{create_router, AppState, EngineConfig, Worker};

const APP_JS: &str = "https://app.test/web/app.js";

// == Helper Functions ==

fn config() -> EngineConfig {
    EngineConfig {
        version: "3869435683".to_string(),
        manifest: PrecacheManifest::new(vec![ManifestEntry::new(APP_JS, Some("r1"))]).unwrap(),
        routes: vec![RouteSpec::new(
            MatcherSpec::regex(r"/images/"),
            StrategyKind::CacheFirst,
            "ui-images",
        )],
        keep_caches: vec!["ui-images".to_string()],
        ..EngineConfig::default()
    }
}

fn create_test_app(network: &Arc<FakeNetwork>) -> Router {
    let (storage, _) = storage();
    let host = Arc::new(FakeHost::with_older_client());
    let worker = Worker::new(config(), storage, network.clone(), host).unwrap();
    create_router(AppState::new(Arc::new(worker)))
}

/// Drives install and activation through the lifecycle endpoints.
async fn activate(app: &Router) {
    let response = app.clone().oneshot(post("/lifecycle/install", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.clone().oneshot(post("/lifecycle/activate", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn fetch_uri(url: &str) -> String {
    format!("/fetch?url={}", urlencode(url))
}

fn urlencode(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

// == Fetch Endpoint Tests ==

#[tokio::test]
async fn test_fetch_serves_and_caches_route() {
    let network = Arc::new(FakeNetwork::default());
    network.serve("https://app.test/images/logo.png", "png");
    network.serve(APP_JS, "js");
    let app = create_test_app(&network);
    activate(&app).await;

    let response = app
        .clone()
        .oneshot(get(&fetch_uri("https://app.test/images/logo.png")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "png");

    // The cache write runs in the background; poll the stats for it.
    let mut cached = false;
    for _ in 0..50 {
        let caches = body_to_json(app.clone().oneshot(get("/caches")).await.unwrap().into_body()).await;
        if caches["caches"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["name"] == "ui-images" && c["total_entries"] == 1)
        {
            cached = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(cached);
}

#[tokio::test]
async fn test_fetch_offline_returns_503() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app
        .oneshot(get(&fetch_uri("https://app.test/images/logo.png")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("logo.png"));
}

#[tokio::test]
async fn test_fetch_before_activation_uses_network() {
    let network = Arc::new(FakeNetwork::default());
    network.serve(APP_JS, "network js");
    let app = create_test_app(&network);

    let response = app.clone().oneshot(get(&fetch_uri(APP_JS))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "network js");

    let caches = body_to_json(app.oneshot(get("/caches")).await.unwrap().into_body()).await;
    assert!(caches["caches"].as_array().unwrap().is_empty());
}

// == Message Endpoint Tests ==

#[tokio::test]
async fn test_get_version_message() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app
        .oneshot(post("/message", r#"{"type":"GET_VERSION"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["version"], "3869435683");
}

#[tokio::test]
async fn test_skip_waiting_message_is_accepted() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app
        .oneshot(post("/message", r#"{"type":"SKIP_WAITING"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// == Lifecycle Endpoint Tests ==

#[tokio::test]
async fn test_install_then_activate() {
    let network = Arc::new(FakeNetwork::default());
    network.serve(APP_JS, "js");
    let app = create_test_app(&network);

    let response = app.clone().oneshot(post("/lifecycle/install", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"], "waiting");
    assert_eq!(json["fetched"][0], APP_JS);

    let response = app.clone().oneshot(post("/lifecycle/activate", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"], "activated");
    assert_eq!(json["clients"][0], "https://app.test/editor");

    let response = app.oneshot(get(&fetch_uri(APP_JS))).await.unwrap();
    assert_eq!(body_to_string(response.into_body()).await, "js");
}

#[tokio::test]
async fn test_failed_install_returns_502() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app.clone().oneshot(post("/lifecycle/install", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let health = body_to_json(app.oneshot(get("/health")).await.unwrap().into_body()).await;
    assert_eq!(health["state"], "installing");
}

#[tokio::test]
async fn test_activate_before_install_conflicts() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app.oneshot(post("/lifecycle/activate", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], "3869435683");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let network = Arc::new(FakeNetwork::default());
    let app = create_test_app(&network);

    let response = app.oneshot(get("/set")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
