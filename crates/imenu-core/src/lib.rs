//! imenu Core Library
//!
//! This crate provides the domain types shared by every imenu component:
//! configuration, the unified error type, the upload normalizer and the
//! stored-object models returned by storage backends.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod upload;

// Re-export commonly used types
pub use config::{AccessDefault, Config, ConfigError, FolderConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{FileRecord, MediaKind, StoredObject};
pub use storage_types::{DeliveryType, StorageBackend};
pub use upload::{
    AccessPolicy, ContentDisposition, FilenameStrategy, UploadNormalizer, UploadPolicy,
    UploadPurpose, UploadRequest, ValidationError,
};
