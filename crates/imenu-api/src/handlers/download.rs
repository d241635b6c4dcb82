//! Download routes that force an attachment disposition.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use imenu_core::upload::mime::extension_from_filename;
use imenu_core::{AccessPolicy, AppError, ContentDisposition, DeliveryType, MediaKind, StoredObject};
use imenu_infra::ErrorResponse;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::handlers::files::stream_local;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Identifier returned as `publicId` by the upload routes.
    pub public_id: Option<String>,
    /// `raw` for documents, `image` for images. Guessed from the id when absent.
    pub resource_type: Option<String>,
    /// `authenticated` for private uploads.
    #[serde(rename = "type")]
    pub delivery_type: Option<String>,
}

/// Access used when re-serving an object: private objects get a fresh signed URL.
fn access_for(state: &AppState, delivery: DeliveryType) -> AccessPolicy {
    match delivery {
        DeliveryType::Upload => AccessPolicy::Public,
        DeliveryType::Authenticated => AccessPolicy::SignedExpiring {
            ttl_secs: state.config.signed_url_ttl_secs(),
        },
    }
}

fn redirect(url: &str) -> Result<Response, HttpAppError> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, url)
        .body(Body::empty())
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)).into())
}

/// Descriptor for an object this process did not upload itself.
async fn describe_unregistered(
    state: &AppState,
    public_id: &str,
    query: &DownloadQuery,
) -> Result<StoredObject, HttpAppError> {
    let extension = extension_from_filename(public_id);
    let kind = match query.resource_type.as_deref() {
        Some("raw") => MediaKind::Document,
        Some("image") => MediaKind::Image,
        Some(other) => {
            return Err(
                AppError::BadRequest(format!("Unknown resource_type '{}'", other)).into(),
            );
        }
        None if extension.as_deref() == Some("pdf") => MediaKind::Document,
        None => MediaKind::Image,
    };

    let delivery = match state.storage.as_local() {
        Some(local) => local
            .locate(public_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?,
        None if query.delivery_type.as_deref() == Some("authenticated") => {
            DeliveryType::Authenticated
        }
        None => DeliveryType::Upload,
    };

    Ok(StoredObject {
        public_id: public_id.to_string(),
        secure_url: String::new(),
        kind,
        format: match kind {
            MediaKind::Document => extension,
            MediaKind::Image => None,
        },
        bytes: 0,
        delivery,
    })
}

/// Redirect to an attachment URL for a stored object
#[utoipa::path(
    get,
    path = "/api/download",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 302, description = "Redirect to the attachment URL"),
        (status = 400, description = "public_id missing", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_by_public_id"))]
pub async fn download_by_public_id(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    let public_id = query
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("public_id is required".to_string()))?;

    let object = match state.files.find_by_public_id(public_id).await {
        Some(record) => record.object,
        None => describe_unregistered(&state, public_id, &query).await?,
    };

    let access = access_for(&state, object.delivery);
    let url = state
        .storage
        .attachment_url(&object, &access, Utc::now())?;

    tracing::debug!(public_id = %public_id, "Redirecting to attachment URL");
    redirect(&url.url)
}

/// Download a previously uploaded file by its generated id
#[utoipa::path(
    get,
    path = "/download/{file_id}",
    tag = "downloads",
    params(("file_id" = Uuid, Path, description = "fileId returned by an upload")),
    responses(
        (status = 200, description = "File contents (local storage)"),
        (status = 302, description = "Redirect to the attachment URL (remote storage)"),
        (status = 404, description = "Unknown file id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_by_id"))]
pub async fn download_by_id(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response, HttpAppError> {
    let record = match Uuid::parse_str(&file_id) {
        Ok(id) => state.files.get(&id).await,
        Err(_) => None,
    }
    .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if let Some(local) = state.storage.as_local() {
        let disposition = ContentDisposition::Attachment {
            filename: record.original_name.clone(),
        };
        return stream_local(
            local,
            record.object.delivery,
            &record.object.public_id,
            &record.content_type,
            Some(disposition),
        )
        .await;
    }

    let access = access_for(&state, record.object.delivery);
    let url = state
        .storage
        .attachment_url(&record.object, &access, Utc::now())?;
    redirect(&url.url)
}
