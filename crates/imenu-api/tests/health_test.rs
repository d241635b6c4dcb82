mod helpers;

use std::sync::Arc;

use helpers::{setup_local_app, setup_remote_app, MockStorage};
use serde_json::Value;

#[tokio::test]
async fn test_health_reports_remote_configuration() {
    let app = setup_remote_app(Arc::new(MockStorage::new()), &[]).await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "online");
    assert_eq!(body["backend"], "cloudinary");
    assert_eq!(body["cloudinaryConfigured"], true);
    assert_eq!(body["storageConfigured"], true);
    assert_eq!(body["storage"], "configured");
    assert_eq!(body["environment"], "development");
    assert!(body["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn test_health_probes_local_disk() {
    let app = setup_local_app(&[]).await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["backend"], "local");
    assert_eq!(body["cloudinaryConfigured"], false);
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = setup_local_app(&[]).await;

    let response = app.client().get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("x-content-type-options"), "nosniff");

    let response = app
        .client()
        .get("/health")
        .add_header("X-Request-ID", "trace-123")
        .await;
    assert_eq!(response.header("x-request-id"), "trace-123");
}

#[tokio::test]
async fn test_liveness() {
    let app = setup_local_app(&[]).await;

    let response = app.client().get("/live").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_openapi_document_lists_upload_routes() {
    let app = setup_local_app(&[]).await;

    let response = app.client().get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/api/upload"].is_object());
    assert!(body["paths"]["/api/download"].is_object());
}
