//! Domain models shared between the storage backends and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage_types::DeliveryType;

/// Resource category of an upload, decided once at ingestion.
///
/// Images are stored for inline viewing; documents are stored as raw
/// resources and delivered as attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
}

impl MediaKind {
    /// Resource type understood by the remote media host.
    pub fn resource_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Document => "raw",
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, MediaKind::Document)
    }
}

/// Descriptor of an object held by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Backend identifier (Cloudinary public id, or local storage key).
    pub public_id: String,
    /// URL returned by the backend at upload time.
    pub secure_url: String,
    pub kind: MediaKind,
    /// File extension without the dot, when known.
    pub format: Option<String>,
    pub bytes: u64,
    pub delivery: DeliveryType,
}

/// Metadata kept for every successful upload so it can be downloaded by id.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub object: StoredObject,
    pub title: Option<String>,
    pub content: Option<String>,
    pub link_social: Option<String>,
    pub privacy: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_map_to_raw_resources() {
        assert_eq!(MediaKind::Document.resource_type(), "raw");
        assert_eq!(MediaKind::Image.resource_type(), "image");
        assert!(MediaKind::Document.is_document());
    }

    #[test]
    fn media_kind_serializes_lowercase() {
        let json = serde_json::to_value(MediaKind::Document).unwrap();
        assert_eq!(json, serde_json::json!("document"));
    }
}
