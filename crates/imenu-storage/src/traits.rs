//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::local::LocalStorage;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imenu_core::{AccessPolicy, AppError, StoredObject, UploadPolicy};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage request timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Link signature is invalid")]
    InvalidSignature,

    #[error("Link has expired")]
    Expired,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::BadRequest(msg),
            StorageError::InvalidSignature | StorageError::Expired => {
                AppError::Forbidden(err.to_string())
            }
            StorageError::Timeout(msg) => AppError::StorageTimeout(msg),
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            StorageError::UploadFailed(msg)
            | StorageError::DownloadFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::IoError(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// A URL handed to clients, with its expiry when it is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedUrl {
    pub fn public(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
        }
    }

    pub fn signed(url: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            expires_at: Some(expires_at),
        }
    }
}

/// Storage abstraction trait
///
/// Backends receive a fully normalized [`UploadPolicy`] and never re-derive
/// the category, folder or access policy themselves. URL construction is a
/// pure function of the descriptor, the access policy and the instant, so the
/// same inputs always give the same URL and signed URLs are never cached.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload the payload and return the stored-object descriptor.
    async fn store(&self, policy: &UploadPolicy, data: Bytes) -> StorageResult<StoredObject>;

    /// URL a client uses to view (images) or fetch (documents) the object.
    fn build_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl>;

    /// URL that always downloads the object as an attachment.
    fn attachment_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Whether the backend has everything it needs to accept uploads.
    fn is_configured(&self) -> bool;

    /// The local filesystem backend, when this is one. Used by the routes that
    /// serve bytes directly instead of redirecting.
    fn as_local(&self) -> Option<&LocalStorage> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_forbidden() {
        let err = AppError::from(StorageError::Expired);
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = AppError::from(StorageError::InvalidSignature);
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn host_message_is_kept() {
        let err = AppError::from(StorageError::UploadFailed("Invalid Signature".to_string()));
        match err {
            AppError::Storage(msg) => assert_eq!(msg, "Invalid Signature"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn timeouts_stay_distinct() {
        let err = AppError::from(StorageError::Timeout("30s".to_string()));
        assert!(matches!(err, AppError::StorageTimeout(_)));
    }
}
