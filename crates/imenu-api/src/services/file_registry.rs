//! Process-scoped record of uploaded files.
//!
//! Backs `GET /download/{fileId}`. Entries live in memory only and are lost
//! on restart; the remote host (or the upload directory) stays the source of
//! truth for the bytes themselves.

use std::collections::HashMap;
use std::sync::Arc;

use imenu_core::FileRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct FileRegistry {
    inner: Arc<RwLock<HashMap<Uuid, FileRecord>>>,
}

impl FileRegistry {
    pub async fn insert(&self, record: FileRecord) {
        self.inner.write().await.insert(record.id, record);
    }

    pub async fn get(&self, id: &Uuid) -> Option<FileRecord> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> Option<FileRecord> {
        self.inner
            .read()
            .await
            .values()
            .find(|record| record.object.public_id == public_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use imenu_core::{DeliveryType, MediaKind, StoredObject};

    fn record(public_id: &str) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            original_name: "menu.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            object: StoredObject {
                public_id: public_id.to_string(),
                secure_url: format!("https://res.example.com/{}", public_id),
                kind: MediaKind::Document,
                format: Some("pdf".to_string()),
                bytes: 10,
                delivery: DeliveryType::Upload,
            },
            title: None,
            content: None,
            link_social: None,
            privacy: None,
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lookup_by_id_and_public_id() {
        let registry = FileRegistry::default();
        assert!(registry.is_empty().await);

        let first = record("imenu/cardapios/a.pdf");
        let second = record("imenu/cardapios/b.pdf");
        let first_id = first.id;
        registry.insert(first).await;
        registry.insert(second).await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(
            registry.get(&first_id).await.unwrap().object.public_id,
            "imenu/cardapios/a.pdf"
        );
        assert!(registry.get(&Uuid::new_v4()).await.is_none());

        let found = registry
            .find_by_public_id("imenu/cardapios/b.pdf")
            .await
            .unwrap();
        assert_ne!(found.id, first_id);
        assert!(registry.find_by_public_id("missing").await.is_none());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let registry = FileRegistry::default();
        let clone = registry.clone();
        clone.insert(record("x.pdf")).await;
        assert_eq!(registry.len().await, 1);
    }
}
