//! Serving files kept by the local storage backend.
//!
//! Public files answer at `/uploads/{key}`. Private files answer at
//! `/files/{key}` and only with a valid, unexpired signature. Both routes
//! return 404 when the service runs against a remote backend.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use futures::StreamExt;
use imenu_core::upload::mime::{extension_from_filename, mime_for_extension};
use imenu_core::{AppError, ContentDisposition, DeliveryType};
use imenu_infra::ErrorResponse;
use imenu_storage::LocalStorage;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::parse_flag;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicFileQuery {
    /// `1` to download as an attachment.
    pub download: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedFileQuery {
    /// Unix timestamp after which the link stops working.
    pub expires: Option<i64>,
    pub signature: Option<String>,
    pub download: Option<String>,
}

pub(crate) fn local_backend(state: &AppState) -> Result<&LocalStorage, HttpAppError> {
    state
        .storage
        .as_local()
        .ok_or_else(|| AppError::NotFound("File not found".to_string()).into())
}

/// Content type guessed from the key's extension.
pub(crate) fn content_type_for(key: &str) -> &'static str {
    extension_from_filename(key)
        .and_then(|ext| mime_for_extension(&ext))
        .unwrap_or("application/octet-stream")
}

fn attachment_for(key: &str, download: Option<&str>) -> Option<ContentDisposition> {
    download.filter(|v| parse_flag(v)).map(|_| ContentDisposition::Attachment {
        filename: key.rsplit('/').next().unwrap_or(key).to_string(),
    })
}

/// Stream a locally stored object into a response.
pub(crate) async fn stream_local(
    local: &LocalStorage,
    delivery: DeliveryType,
    key: &str,
    content_type: &str,
    disposition: Option<ContentDisposition>,
) -> Result<Response, HttpAppError> {
    let stream = local.download_stream(delivery, key).await.map_err(|e| {
        tracing::debug!(error = %e, key = %key, "Failed to open stored file");
        HttpAppError::from(e)
    })?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let cache_control = match delivery {
        DeliveryType::Upload => "public, max-age=86400",
        DeliveryType::Authenticated => "private, no-store",
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, cache_control);
    if let Some(disposition) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition.header_value());
    }

    builder.body(Body::from_stream(body_stream)).map_err(|e| {
        tracing::error!(error = %e, "Failed to build response");
        HttpAppError::from(AppError::Internal(e.to_string()))
    })
}

/// Serve a public file from local storage
#[utoipa::path(
    get,
    path = "/uploads/{key}",
    tag = "files",
    params(
        ("key" = String, Path, description = "Storage key, e.g. imenu/images/photo.jpg"),
        PublicFileQuery
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "serve_public_file"))]
pub async fn serve_public_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<PublicFileQuery>,
) -> Result<Response, HttpAppError> {
    let local = local_backend(&state)?;
    let disposition = attachment_for(&key, query.download.as_deref());
    stream_local(
        local,
        DeliveryType::Upload,
        &key,
        content_type_for(&key),
        disposition,
    )
    .await
}

/// Serve a file through a signed, expiring link
#[utoipa::path(
    get,
    path = "/files/{key}",
    tag = "files",
    params(
        ("key" = String, Path, description = "Storage key"),
        SignedFileQuery
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 403, description = "Missing, invalid or expired signature", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "serve_signed_file"))]
pub async fn serve_signed_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, HttpAppError> {
    let local = local_backend(&state)?;

    let (expires, signature) = match (query.expires, query.signature.as_deref()) {
        (Some(expires), Some(signature)) if !signature.is_empty() => (expires, signature),
        _ => {
            return Err(AppError::Forbidden("Missing link signature".to_string()).into());
        }
    };
    local.verify_link(&key, expires, signature, Utc::now())?;

    // Signed links may point at either area; private is checked first.
    let delivery = local
        .locate(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let disposition = attachment_for(&key, query.download.as_deref());
    stream_local(local, delivery, &key, content_type_for(&key), disposition).await
}
