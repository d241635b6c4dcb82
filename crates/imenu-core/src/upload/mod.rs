//! Upload normalization
//!
//! Turns a raw [`UploadRequest`] into a fully determined [`UploadPolicy`]
//! before any storage backend is contacted. Everything a backend needs to know
//! (resource category, folder, filename, access and disposition) is decided
//! here exactly once and carried downstream as typed values.

pub mod filename;
pub mod mime;

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{AccessDefault, Config, FolderConfig};
use crate::constants::{DEFAULT_MIME_TYPE, DEFAULT_SIGNED_URL_TTL_SECS};
use crate::models::MediaKind;
use crate::storage_types::DeliveryType;

/// Reasons an upload is rejected before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty")]
    EmptyPayload,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File size {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Which endpoint family an upload came through. Chooses the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadPurpose {
    #[default]
    General,
    /// Restaurant menu ("cardápio") uploads.
    Menu,
    ProfilePicture,
}

/// A single inbound upload, independent of how it was transported.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Bytes,
    pub declared_mime_type: Option<String>,
    pub is_document: bool,
    pub wants_private_url: bool,
    pub file_name: Option<String>,
    pub purpose: UploadPurpose,
}

impl UploadRequest {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_mime_type: None,
            is_document: false,
            wants_private_url: false,
            file_name: None,
            purpose: UploadPurpose::General,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime_type = Some(mime.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn document(mut self, is_document: bool) -> Self {
        self.is_document = is_document;
        self
    }

    pub fn private(mut self, wants_private_url: bool) -> Self {
        self.wants_private_url = wants_private_url;
        self
    }

    pub fn with_purpose(mut self, purpose: UploadPurpose) -> Self {
        self.purpose = purpose;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameStrategy {
    /// Keep the caller-supplied name (sanitized stem).
    Preserve(String),
    /// Server-chosen name, used when the caller supplied none.
    Override(String),
}

impl FilenameStrategy {
    pub fn name(&self) -> &str {
        match self {
            FilenameStrategy::Preserve(name) | FilenameStrategy::Override(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    SignedExpiring { ttl_secs: u64 },
}

impl AccessPolicy {
    pub fn delivery_type(&self) -> DeliveryType {
        match self {
            AccessPolicy::Public => DeliveryType::Upload,
            AccessPolicy::SignedExpiring { .. } => DeliveryType::Authenticated,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            AccessPolicy::Public => None,
            AccessPolicy::SignedExpiring { ttl_secs } => Some(Duration::from_secs(*ttl_secs)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDisposition {
    Inline,
    Attachment { filename: String },
}

impl ContentDisposition {
    pub fn header_value(&self) -> String {
        match self {
            ContentDisposition::Inline => "inline".to_string(),
            ContentDisposition::Attachment { filename } => {
                // Quoted-string form only carries printable ASCII.
                let safe: String = filename
                    .chars()
                    .map(|c| {
                        if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect();
                format!("attachment; filename=\"{}\"", safe)
            }
        }
    }
}

/// Storage parameters derived from an [`UploadRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub kind: MediaKind,
    pub folder: String,
    pub filename: FilenameStrategy,
    pub access: AccessPolicy,
    pub disposition: ContentDisposition,
    /// Normalized mime type.
    pub content_type: String,
    /// Extension without the dot.
    pub extension: String,
    /// Name the object is stored under inside `folder` (no extension).
    pub stem: String,
}

impl UploadPolicy {
    /// Name a client sees when downloading the file.
    pub fn download_name(&self) -> String {
        format!("{}.{}", self.filename.name(), self.extension)
    }

    /// Identifier on the remote media host. Raw resources keep their extension.
    pub fn public_id(&self) -> String {
        match self.kind {
            MediaKind::Document => format!("{}/{}.{}", self.folder, self.stem, self.extension),
            MediaKind::Image => format!("{}/{}", self.folder, self.stem),
        }
    }

    /// Key under which filesystem backends store the object.
    pub fn object_key(&self) -> String {
        format!("{}/{}.{}", self.folder, self.stem, self.extension)
    }

    /// Short type label returned to clients (`"pdf"` for documents, `"image"` otherwise).
    pub fn file_type_label(&self) -> String {
        match self.kind {
            MediaKind::Document => self.extension.clone(),
            MediaKind::Image => "image".to_string(),
        }
    }
}

/// Decides the [`UploadPolicy`] for each request.
#[derive(Debug, Clone)]
pub struct UploadNormalizer {
    folders: FolderConfig,
    default_mime_type: String,
    max_upload_bytes: usize,
    signed_url_ttl_secs: u64,
    default_access: AccessDefault,
}

impl Default for UploadNormalizer {
    fn default() -> Self {
        Self {
            folders: FolderConfig::default(),
            default_mime_type: DEFAULT_MIME_TYPE.to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
            default_access: AccessDefault::Public,
        }
    }
}

impl UploadNormalizer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            folders: config.folders().clone(),
            default_mime_type: config.default_mime_type().to_string(),
            max_upload_bytes: config.max_upload_bytes(),
            signed_url_ttl_secs: config.signed_url_ttl_secs(),
            default_access: config.default_access(),
        }
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn with_default_access(mut self, access: AccessDefault) -> Self {
        self.default_access = access;
        self
    }

    pub fn with_signed_url_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.signed_url_ttl_secs = ttl_secs;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn normalize(&self, request: &UploadRequest) -> Result<UploadPolicy, ValidationError> {
        let size = request.bytes.len();
        if size == 0 {
            return Err(ValidationError::EmptyPayload);
        }
        if size > self.max_upload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }

        // Generic types fall back to the file name, then to the configured default.
        let content_type = request
            .declared_mime_type
            .as_deref()
            .and_then(mime::normalize_mime_type)
            .filter(|m| !mime::is_generic_mime(m))
            .or_else(|| {
                request
                    .file_name
                    .as_deref()
                    .and_then(mime::extension_from_filename)
                    .and_then(|ext| mime::mime_for_extension(&ext))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default_mime_type.clone());

        // The document flag only changes the category of an accepted type.
        let is_document_type = mime::is_document_mime(&content_type);
        let is_image_type = mime::is_image_mime(&content_type);
        if !is_document_type && !is_image_type {
            return Err(ValidationError::UnsupportedType(content_type));
        }
        let kind = if request.is_document || is_document_type {
            MediaKind::Document
        } else {
            MediaKind::Image
        };

        if request.purpose == UploadPurpose::ProfilePicture && kind == MediaKind::Document {
            return Err(ValidationError::UnsupportedType(format!(
                "{} (profile pictures must be images)",
                content_type
            )));
        }

        // Only image types without a table entry may borrow the file name's extension.
        let extension = mime::extension_for(&content_type)
            .map(str::to_string)
            .or_else(|| {
                request
                    .file_name
                    .as_deref()
                    .filter(|_| is_image_type)
                    .and_then(mime::extension_from_filename)
            })
            .ok_or_else(|| ValidationError::UnsupportedType(content_type.clone()))?;

        let caller_stem = match request.file_name.as_deref() {
            Some(name) => filename::sanitize_stem(name)?,
            None => None,
        };
        let (filename, stem) = match caller_stem {
            Some(stem) => {
                let unique = format!("{}_{}", stem, filename::unique_suffix());
                (FilenameStrategy::Preserve(stem), unique)
            }
            None => {
                let generated = filename::generate_name();
                (FilenameStrategy::Override(generated.clone()), generated)
            }
        };

        let access = if request.wants_private_url || self.default_access == AccessDefault::Signed
        {
            AccessPolicy::SignedExpiring {
                ttl_secs: self.signed_url_ttl_secs,
            }
        } else {
            AccessPolicy::Public
        };

        let disposition = match kind {
            MediaKind::Document => ContentDisposition::Attachment {
                filename: format!("{}.{}", filename.name(), extension),
            },
            MediaKind::Image => ContentDisposition::Inline,
        };

        Ok(UploadPolicy {
            kind,
            folder: self.folders.folder_for(request.purpose, kind).to_string(),
            filename,
            access,
            disposition,
            content_type,
            extension,
            stem,
        })
    }
}
