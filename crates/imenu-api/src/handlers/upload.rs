//! Upload routes: general files, restaurant menus and profile pictures.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use imenu_core::UploadPurpose;
use imenu_infra::ErrorResponse;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::services::upload::{UploadOutcome, UploadService};
use crate::state::AppState;
use crate::utils::upload::UploadPayload;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    pub message: String,
    /// Public URL, or a signed URL when a private upload was requested.
    pub file_url: String,
    /// `"pdf"` for documents, `"image"` otherwise.
    pub file_type: String,
    pub public_id: String,
    pub file_id: Uuid,
    /// Stable link served by this service; works for as long as the process lives.
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Menu form fields echoed back to older clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MenuData>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuData {
    pub download_link: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "linksocial", skip_serializing_if = "Option::is_none")]
    pub link_social: Option<String>,
    #[serde(rename = "privacidade", skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
}

impl UploadResponse {
    fn from_outcome(outcome: UploadOutcome, purpose: UploadPurpose) -> Self {
        let data = (purpose == UploadPurpose::Menu || !outcome.legacy.is_empty()).then(|| {
            MenuData {
                download_link: outcome.download_url.clone(),
                image_url: outcome.url.url.clone(),
                title: outcome.legacy.title.clone(),
                content: outcome.legacy.content.clone(),
                link_social: outcome.legacy.link_social.clone(),
                privacy: outcome.legacy.privacy.clone(),
            }
        });

        Self {
            success: true,
            message: "Upload successful".to_string(),
            file_type: outcome.policy.file_type_label(),
            expires_at: outcome.expires_at(),
            file_url: outcome.url.url,
            public_id: outcome.object.public_id,
            file_id: outcome.file_id,
            download_url: outcome.download_url,
            data,
        }
    }
}

async fn handle_upload(
    state: &Arc<AppState>,
    payload: UploadPayload,
    purpose: UploadPurpose,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = UploadService::new(state).upload(payload, purpose).await?;
    Ok(Json(UploadResponse::from_outcome(outcome, purpose)))
}

/// Upload an image or PDF
///
/// Accepts `multipart/form-data` with a `file` field, or JSON with a base64
/// `file`. Set `isCardapio` to store the file as a menu.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Missing or invalid file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    payload: UploadPayload,
) -> Result<impl IntoResponse, HttpAppError> {
    let purpose = if payload.options.is_cardapio {
        UploadPurpose::Menu
    } else {
        UploadPurpose::General
    };
    handle_upload(&state, payload, purpose).await
}

/// Upload a restaurant menu (cardápio)
#[utoipa::path(
    post,
    path = "/api/cardapio",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Menu uploaded", body = UploadResponse),
        (status = 400, description = "Missing or invalid file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "upload_menu"))]
pub async fn upload_menu(
    State(state): State<Arc<AppState>>,
    payload: UploadPayload,
) -> Result<impl IntoResponse, HttpAppError> {
    handle_upload(&state, payload, UploadPurpose::Menu).await
}

/// Upload a profile picture. Images only.
#[utoipa::path(
    post,
    path = "/upload-profile-pic",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile picture uploaded", body = UploadResponse),
        (status = 400, description = "Missing file or not an image", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "upload_profile_picture"))]
pub async fn upload_profile_picture(
    State(state): State<Arc<AppState>>,
    payload: UploadPayload,
) -> Result<impl IntoResponse, HttpAppError> {
    handle_upload(&state, payload, UploadPurpose::ProfilePicture).await
}
