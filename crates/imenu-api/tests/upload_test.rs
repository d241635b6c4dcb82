//! Upload route integration tests.
//!
//! Run with: `cargo test -p imenu-api --test upload_test`

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use base64::Engine;
use helpers::{local_path, setup_local_app, setup_remote_app, MockStorage};
use serde_json::{json, Value};

const PDF_10: &[u8] = b"%PDF-1.4\n%";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_menu_pdf_returns_attachment_url() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let form = MultipartForm::new()
        .add_text("fileType", "application/pdf")
        .add_text("isCardapio", "true")
        .add_part("file", Part::bytes(PDF_10.to_vec()).file_name("cardapio.pdf"));
    let response = app.client().post("/api/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["fileType"], "pdf");

    let file_url = body["fileUrl"].as_str().unwrap();
    assert!(file_url.contains("/raw/upload/fl_attachment/imenu/cardapios/"), "{}", file_url);
    assert!(file_url.ends_with(".pdf"));
    assert!(body.get("expiresAt").is_none());

    assert_eq!(storage.store_calls(), 1);
    assert_eq!(storage.stored()[0].1, 10);
}

#[tokio::test]
async fn test_json_base64_menu_upload() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let response = app
        .client()
        .post("/api/cardapio")
        .json(&json!({
            "file": format!("data:application/pdf;base64,{}", b64(PDF_10)),
            "title": "Cardápio de verão",
            "content": "Pratos leves",
            "linksocial": "https://instagram.com/imenu",
            "privacidade": "publico"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["fileType"], "pdf");
    assert!(body["publicId"].as_str().unwrap().starts_with("imenu/cardapios/"));

    // Menu form fields come back for older clients
    assert_eq!(body["data"]["title"], "Cardápio de verão");
    assert_eq!(body["data"]["linksocial"], "https://instagram.com/imenu");
    assert_eq!(body["data"]["privacidade"], "publico");
    assert_eq!(body["data"]["imageUrl"], body["fileUrl"]);
    assert_eq!(body["data"]["downloadLink"], body["downloadUrl"]);

    let file_id = body["fileId"].as_str().unwrap();
    let record = app
        .state
        .files
        .get(&file_id.parse().unwrap())
        .await
        .expect("upload should be registered");
    assert_eq!(record.content.as_deref(), Some("Pratos leves"));
}

#[tokio::test]
async fn test_image_defaults_to_public_inline_url() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let form = MultipartForm::new().add_part(
        "imagem",
        Part::bytes(PNG.to_vec())
            .file_name("logo.png")
            .mime_type("image/png"),
    );
    let response = app.client().post("/api/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["fileType"], "image");
    let file_url = body["fileUrl"].as_str().unwrap();
    assert!(file_url.contains("/image/upload/imenu/images/logo_"), "{}", file_url);
    assert!(!file_url.contains("fl_attachment"));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_private_upload_returns_expiring_url() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[("SIGNED_URL_TTL_SECS", "600")]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({ "file": b64(PNG), "fileType": "image/png", "wantsPrivateUrl": true }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["fileUrl"].as_str().unwrap().contains("/authenticated/"));

    let expires_at: chrono::DateTime<chrono::Utc> =
        body["expiresAt"].as_str().unwrap().parse().unwrap();
    let remaining = expires_at - chrono::Utc::now();
    assert!(remaining > chrono::Duration::seconds(500));
    assert!(remaining <= chrono::Duration::seconds(600));
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let form = MultipartForm::new().add_text("title", "no file here");
    let response = app.client().post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file uploaded");

    let response = app.client().post("/api/upload").await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());

    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_empty_payload_never_reaches_storage() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({ "file": "", "fileType": "application/pdf" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "EMPTY_PAYLOAD");

    let form = MultipartForm::new().add_part("file", Part::bytes(Vec::new()).file_name("x.png"));
    let response = app.client().post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(storage.store_calls(), 0);
    assert_eq!(app.state.files.len().await, 0);
}

#[tokio::test]
async fn test_unsupported_type_is_rejected() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"PK\x03\x04".to_vec())
            .file_name("archive.zip")
            .mime_type("application/zip"),
    );
    let response = app.client().post("/api/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_TYPE");
    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_document_flag_keeps_type_allow_list() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({
            "file": {
                "data": b64(b"MZ\x90\x00evil"),
                "type": "application/x-msdownload",
                "name": "virus.exe"
            },
            "isDocument": true
        }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_TYPE");

    let form = MultipartForm::new()
        .add_text("isDocument", "true")
        .add_part(
            "file",
            Part::bytes(b"PK\x03\x04".to_vec())
                .file_name("archive.zip")
                .mime_type("application/zip"),
        );
    let response = app.client().post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_profile_picture_must_be_an_image() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[]).await;

    let response = app
        .client()
        .post("/upload-profile-pic")
        .json(&json!({ "file": b64(PDF_10), "fileType": "application/pdf" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .post("/upload-profile-pic")
        .json(&json!({ "file": b64(PNG), "fileType": "image/png" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["publicId"]
        .as_str()
        .unwrap()
        .starts_with("imenu/profile-pics/"));
    assert_eq!(storage.store_calls(), 1);
}

#[tokio::test]
async fn test_oversized_upload_is_413() {
    let storage = Arc::new(MockStorage::new());
    let app = setup_remote_app(storage.clone(), &[("MAX_UPLOAD_SIZE_MB", "1")]).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![7u8; 1_100_000])
            .file_name("big.png")
            .mime_type("image/png"),
    );
    let response = app.client().post("/api/upload").multipart(form).await;

    assert_eq!(response.status_code(), 413);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_storage_failure_message_passes_through() {
    let storage = Arc::new(MockStorage::failing("Invalid Signature"));
    let app = setup_remote_app(storage.clone(), &[]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({ "file": b64(PNG) }))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid Signature");
    assert_eq!(app.state.files.len().await, 0);
}

#[tokio::test]
async fn test_slow_storage_times_out() {
    let storage = Arc::new(MockStorage::slow(Duration::from_secs(3)));
    let app = setup_remote_app(storage.clone(), &[("REMOTE_STORE_TIMEOUT_SECS", "1")]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({ "file": b64(PNG) }))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "STORAGE_TIMEOUT");
    assert_eq!(app.state.files.len().await, 0);
}

#[tokio::test]
async fn test_local_upload_is_served_back() {
    let app = setup_local_app(&[]).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(PNG.to_vec())
            .file_name("prato.png")
            .mime_type("image/png"),
    );
    let response = app.client().post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();

    let file_url = body["fileUrl"].as_str().unwrap();
    assert!(file_url.starts_with("http://localhost:3009/uploads/imenu/images/prato_"));

    let served = app.client().get(local_path(file_url)).await;
    assert_eq!(served.status_code(), 200);
    assert_eq!(served.as_bytes().as_ref(), PNG);
    assert_eq!(served.header("content-type"), "image/png");
    assert_eq!(served.header("x-content-type-options"), "nosniff");
}

#[tokio::test]
async fn test_local_private_link_is_verified() {
    let app = setup_local_app(&[]).await;

    let response = app
        .client()
        .post("/api/upload")
        .json(&json!({
            "file": { "data": b64(PDF_10), "type": "application/pdf", "name": "menu.pdf" },
            "private": "true"
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let file_url = body["fileUrl"].as_str().unwrap();
    assert!(file_url.contains("/files/imenu/documents/menu_"), "{}", file_url);
    assert!(body["expiresAt"].is_string());

    let served = app.client().get(local_path(file_url)).await;
    assert_eq!(served.status_code(), 200);
    assert_eq!(served.as_bytes().as_ref(), PDF_10);
    assert!(served
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    // Tampered signature
    let tampered = local_path(file_url).replacen("signature=", "signature=AA", 1);
    let response = app.client().get(&tampered).await;
    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    // No signature at all
    let unsigned = local_path(file_url).split('?').next().unwrap().to_string();
    assert_eq!(app.client().get(&unsigned).await.status_code(), 403);

    // Private files are not reachable through the public route
    let public = unsigned.replacen("/files/", "/uploads/", 1);
    assert_eq!(app.client().get(&public).await.status_code(), 404);
}
