//! Upload pipeline: normalize → store → resolve URL → register.
//!
//! Each step either completes or the whole upload fails. Nothing is recorded
//! in the registry until the backend has accepted the bytes and a URL could
//! be built for them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use imenu_core::{AppError, FileRecord, StoredObject, UploadPolicy, UploadPurpose};
use imenu_storage::ResolvedUrl;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::upload::{LegacyFields, UploadPayload};

/// Everything a handler needs to build the response envelope.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_id: Uuid,
    pub policy: UploadPolicy,
    pub object: StoredObject,
    pub url: ResolvedUrl,
    /// `{public_base_url}/download/{file_id}`
    pub download_url: String,
    pub legacy: LegacyFields,
}

impl UploadOutcome {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.url.expires_at
    }
}

pub struct UploadService {
    state: Arc<AppState>,
}

impl UploadService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn upload(
        &self,
        payload: UploadPayload,
        purpose: UploadPurpose,
    ) -> Result<UploadOutcome, AppError> {
        // 1. Decide the policy; rejected requests never reach the backend
        let request = payload.to_request(purpose);
        let policy = self.state.normalizer.normalize(&request)?;

        tracing::info!(
            kind = ?policy.kind,
            folder = %policy.folder,
            content_type = %policy.content_type,
            size_bytes = payload.file.bytes.len(),
            private = policy.access.ttl().is_some(),
            "Processing upload"
        );

        // 2. Hand the bytes to the backend
        let object = self.store(&policy, payload.file.bytes.clone()).await?;

        // 3. Build the URL the client gets back
        let url = self
            .state
            .storage
            .build_url(&object, &policy.access, Utc::now())?;

        // 4. Remember the file for /download/{fileId}
        let record = FileRecord {
            id: Uuid::new_v4(),
            original_name: payload
                .original_name()
                .map(str::to_string)
                .unwrap_or_else(|| policy.download_name()),
            content_type: policy.content_type.clone(),
            object: object.clone(),
            title: payload.options.legacy.title.clone(),
            content: payload.options.legacy.content.clone(),
            link_social: payload.options.legacy.link_social.clone(),
            privacy: payload.options.legacy.privacy.clone(),
            uploaded_at: Utc::now(),
        };
        let file_id = record.id;
        self.state.files.insert(record).await;

        tracing::info!(
            file_id = %file_id,
            public_id = %object.public_id,
            size_bytes = object.bytes,
            "Upload completed"
        );

        Ok(UploadOutcome {
            file_id,
            download_url: format!("{}/download/{}", self.state.config.public_base_url(), file_id),
            policy,
            object,
            url,
            legacy: payload.options.legacy,
        })
    }

    /// Store with an upper bound on how long the backend may take.
    async fn store(
        &self,
        policy: &UploadPolicy,
        bytes: bytes::Bytes,
    ) -> Result<StoredObject, AppError> {
        let timeout = Duration::from_secs(self.state.config.remote_store_timeout_secs());
        let start = std::time::Instant::now();

        match tokio::time::timeout(timeout, self.state.storage.store(policy, bytes)).await {
            Ok(Ok(object)) => Ok(object),
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    backend = %self.state.storage.backend_type(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Failed to upload to storage"
                );
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(
                    backend = %self.state.storage.backend_type(),
                    timeout_secs = timeout.as_secs(),
                    "Storage upload timed out"
                );
                Err(AppError::StorageTimeout(format!(
                    "upload did not complete within {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}
