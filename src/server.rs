//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every endpoint to its handler and returns
//! a ready-to-serve [`axum::Router`].  Blob keys may contain slashes, so
//! the storage routes use a wildcard capture.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};

use crate::errors::generate_request_id;
use crate::handlers;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Build the axum [`Router`] with all routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness probe.
        .route("/health", get(health_check))
        // Prometheus metrics endpoint.
        .route("/metrics", get(metrics_handler))
        // Sync record endpoints (group scoped via X-Group-ID).
        .route(
            "/api/sync",
            get(handlers::sync::get_sync).post(handlers::sync::update_sync),
        )
        // Blob endpoints (wildcard key captures slashes).
        .route(
            "/api/storage/*key",
            get(handlers::object::get_object)
                .put(handlers::object::put_object)
                .delete(handlers::object::delete_object),
        )
        // Application state shared across all handlers.
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        // CORS is innermost so preflights are answered right after routing.
        .layer(cors_layer())
        // common_headers_middleware stamps every response, preflights included.
        .layer(middleware::from_fn(common_headers_middleware))
        // metrics_middleware is outer (captures full request lifecycle).
        .layer(middleware::from_fn(metrics_middleware))
        // Disable the default 2MB body size limit (blobs can be large).
        .layer(DefaultBodyLimit::disable())
}

/// Permissive CORS: any origin, mirrored methods and headers, no
/// credentials.  Mirroring grants exactly what a preflight asks for.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

// -- Common headers middleware -----------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Server`: `SyncStore`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("x-request-id", value);
        }
    }

    headers.insert("server", HeaderValue::from_static("SyncStore"));

    response
}

// -- Health check ------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "healthy"}` with 200 OK.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::local::LocalBlobStore;
    use crate::storage::memory::MemoryKvStore;
    use axum::body::Body;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        let state = Arc::new(AppState {
            config: Config::default(),
            kv: Arc::new(MemoryKvStore::new()),
            blobs: Arc::new(LocalBlobStore::ephemeral().expect("failed to create blob store")),
        });
        app(state)
    }

    async fn body_bytes(response: Response) -> bytes::Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body")
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).expect("response body is not JSON")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_sync_roundtrip() {
        let app = test_app();

        let record = json!({
            "data": {"key": "value"},
            "timestamp": "2026-08-30T12:00:00Z",
            "device_id": "test-device",
        });
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/sync")
                    .header("x-group-id", "test-group")
                    .header("content-type", "application/json")
                    .body(Body::from(record.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success"}));

        let response = app
            .oneshot(
                Request::get("/api/sync")
                    .header("x-group-id", "test-group")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["key"], "value");
        assert_eq!(body["device_id"], "test-device");
        // The timestamp survives as an ISO-8601 string.
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_get_sync_absent_group_returns_empty_object() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::get("/api/sync")
                    .header("x-group-id", "never-synced")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_get_sync_missing_group_header() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/api/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        let loc = body["detail"][0]["loc"].as_array().unwrap();
        assert!(loc.contains(&json!("x-group-id")));
    }

    #[tokio::test]
    async fn test_post_sync_reports_each_missing_field() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::post("/api/sync")
                    .header("x-group-id", "test-group")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"data": {"key": "value"}}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        let detail = body["detail"].as_array().unwrap();
        let locs: Vec<String> = detail
            .iter()
            .filter_map(|e| e["loc"].as_array()?.last()?.as_str().map(String::from))
            .collect();
        assert!(locs.contains(&"timestamp".to_string()));
        assert!(locs.contains(&"device_id".to_string()));
    }

    #[tokio::test]
    async fn test_post_sync_unparsable_body() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::post("/api/sync")
                    .header("x-group-id", "test-group")
                    .body(Body::from("invalid json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_storage_full_roundtrip() {
        let app = test_app();
        let content = "test content";

        let response = app
            .clone()
            .oneshot(
                Request::put("/api/storage/test/file.txt")
                    .body(Body::from(content))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success"}));

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/storage/test/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/octet-stream"
        );
        assert_eq!(body_bytes(response).await, content.as_bytes());

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/storage/test/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success"}));

        let response = app
            .oneshot(
                Request::get("/api/storage/test/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_get_missing_object() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::get("/api/storage/no/such/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Object not found");
    }

    #[tokio::test]
    async fn test_storage_put_empty_body() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(
                Request::put("/api/storage/test/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "Missing body");

        // The rejected write must not have created the key.
        let response = app
            .oneshot(
                Request::get("/api/storage/test/file.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_delete_nonexistent_succeeds() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::delete("/api/storage/never/written.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success"}));
    }

    #[tokio::test]
    async fn test_binary_blob_roundtrip() {
        let app = test_app();
        let payload: Vec<u8> = (0..=255u8).collect();

        let response = app
            .clone()
            .oneshot(
                Request::put("/api/storage/test/binary.dat")
                    .body(Body::from(payload.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::get("/api/storage/test/binary.dat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, payload.as_slice());
    }

    #[tokio::test]
    async fn test_cors_headers_on_simple_request() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_cors_preflight_grants_requested_method_and_header() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/sync")
                    .header("origin", "https://example.com")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "X-Group-ID")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let methods = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap()
            .to_ascii_uppercase();
        assert!(methods.contains("POST"));

        let headers = response.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(headers.contains("x-group-id"));

        // Credentialed requests stay disallowed.
        assert!(!response
            .headers()
            .contains_key("access-control-allow-credentials"));
    }

    #[tokio::test]
    async fn test_common_response_headers() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["server"], "SyncStore");
        assert_eq!(response.headers()["x-request-id"].to_str().unwrap().len(), 16);
    }
}
