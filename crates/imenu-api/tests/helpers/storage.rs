//! In-memory `Storage` that mimics the remote media host's URL layout.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use imenu_core::{AccessPolicy, MediaKind, StoredObject, UploadPolicy};
use imenu_storage::{ResolvedUrl, Storage, StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const DELIVERY_BASE: &str = "https://res.example.com/demo";

#[derive(Default)]
pub struct MockStorage {
    store_calls: AtomicUsize,
    fail_with: Option<String>,
    delay: Option<std::time::Duration>,
    stored: Mutex<Vec<(String, usize)>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload fails with the given host message.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Every upload takes this long.
    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<(String, usize)> {
        self.stored.lock().unwrap().clone()
    }

    fn url(object: &StoredObject, attachment: bool) -> String {
        let flag = if attachment { "fl_attachment/" } else { "" };
        let suffix = match (object.kind, object.format.as_deref()) {
            (MediaKind::Image, Some(format)) => format!(".{}", format),
            _ => String::new(),
        };
        format!(
            "{}/{}/{}/{}{}{}",
            DELIVERY_BASE,
            object.kind.resource_type(),
            object.delivery.as_str(),
            flag,
            object.public_id,
            suffix
        )
    }

    fn resolve(
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
        attachment: bool,
    ) -> ResolvedUrl {
        match access {
            AccessPolicy::SignedExpiring { ttl_secs } => {
                let expires_at = now + Duration::seconds(*ttl_secs as i64);
                ResolvedUrl::signed(
                    format!(
                        "{}?expires_at={}",
                        Self::url(object, attachment),
                        expires_at.timestamp()
                    ),
                    expires_at,
                )
            }
            AccessPolicy::Public => ResolvedUrl::public(Self::url(object, attachment)),
        }
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn store(&self, policy: &UploadPolicy, data: Bytes) -> StorageResult<StoredObject> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(StorageError::UploadFailed(message.clone()));
        }

        let public_id = policy.public_id();
        self.stored
            .lock()
            .unwrap()
            .push((public_id.clone(), data.len()));

        let mut object = StoredObject {
            public_id,
            secure_url: String::new(),
            kind: policy.kind,
            format: Some(policy.extension.clone()),
            bytes: data.len() as u64,
            delivery: policy.access.delivery_type(),
        };
        object.secure_url = Self::url(&object, false);
        Ok(object)
    }

    fn build_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl> {
        Ok(Self::resolve(object, access, now, object.kind.is_document()))
    }

    fn attachment_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl> {
        Ok(Self::resolve(object, access, now, true))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Cloudinary
    }

    fn is_configured(&self) -> bool {
        true
    }
}

