//! API Routes
//!
//! Configures the Axum router with all worker endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    activate_handler, caches_handler, fetch_handler, health_handler, install_handler,
    message_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin, since pages post messages from their own origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/fetch", get(fetch_handler))
        .route("/message", post(message_handler))
        .route("/lifecycle/install", post(install_handler))
        .route("/lifecycle/activate", post(activate_handler))
        .route("/caches", get(caches_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::cache::{CacheStorage, ManualClock};
    use crate::config::EngineConfig;
    use crate::lifecycle::StandaloneHost;
    use crate::strategies::test_support::ScriptedNetwork;
    use crate::worker::Worker;

    fn create_test_app() -> Router {
        let storage = CacheStorage::new(Arc::new(ManualClock::new(0)));
        let (host, _requests) = StandaloneHost::new();
        let worker = Worker::new(
            EngineConfig::default(),
            storage,
            Arc::new(ScriptedNetwork::default()),
            Arc::new(host),
        )
        .unwrap();
        create_router(AppState::new(Arc::new(worker)))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_caches_endpoint() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/caches").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_message_endpoint_accepts_unknown() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"SOMETHING_NEW"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_fetch_requires_url() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/fetch").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
