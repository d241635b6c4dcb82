use crate::keys::{encode_key, validate_key};
use crate::signing::LinkSigner;
use crate::traits::{ResolvedUrl, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::Stream;
use futures::StreamExt;
use imenu_core::{AccessPolicy, DeliveryType, StoredObject, UploadPolicy};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Chunked file body handed to the HTTP layer.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

const PUBLIC_DIR: &str = "public";
const PRIVATE_DIR: &str = "private";

/// Local filesystem storage implementation
///
/// Public objects live under `{base_path}/public` and are served at
/// `{base_url}/uploads/{key}`. Private objects live under `{base_path}/private`
/// and are only reachable through `{base_url}/files/{key}?expires=&signature=`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: LinkSigner,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "uploads")
    /// * `base_url` - Public base URL of this service (e.g., "http://localhost:3009")
    /// * `signer` - Signs and verifies private file links
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signer: LinkSigner,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        for area in [PUBLIC_DIR, PRIVATE_DIR] {
            let dir = base_path.join(area);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    fn area(delivery: DeliveryType) -> &'static str {
        match delivery {
            DeliveryType::Upload => PUBLIC_DIR,
            DeliveryType::Authenticated => PRIVATE_DIR,
        }
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, delivery: DeliveryType, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let root = self.base_path.join(Self::area(delivery));
        let path = root.join(storage_key);

        if let (Ok(root_canonical), Ok(canonical)) = (root.canonicalize(), path.canonicalize()) {
            if canonical.strip_prefix(&root_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// URL of a public object.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.base_url, encode_key(key))
    }

    /// Expiring URL of a private object.
    pub fn signed_url(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        format!(
            "{}/files/{}?expires={}&signature={}",
            self.base_url,
            encode_key(key),
            expires,
            self.signer.sign(key, expires)
        )
    }

    /// Verify a private link. Signature is checked before expiry.
    pub fn verify_link(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        validate_key(key)?;
        self.signer.verify(key, expires, signature, now)
    }

    /// Which area holds the key, if any.
    pub async fn locate(&self, storage_key: &str) -> StorageResult<Option<DeliveryType>> {
        for delivery in [DeliveryType::Authenticated, DeliveryType::Upload] {
            if self.exists(delivery, storage_key).await? {
                return Ok(Some(delivery));
            }
        }
        Ok(None)
    }

    pub async fn exists(&self, delivery: DeliveryType, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(delivery, storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Download a file as a stream
    pub async fn download_stream(
        &self,
        delivery: DeliveryType,
        storage_key: &str,
    ) -> StorageResult<ByteStream> {
        let path = self.key_to_path(delivery, storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let stream = tokio_util::io::ReaderStream::new(file).map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        let key = storage_key.to_string();
        let path_display = path.display().to_string();
        let logged_stream = stream.map(move |item| {
            if item.is_err() {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
            }
            item
        });

        Ok(Box::pin(logged_stream))
    }

    fn resolve(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
        attachment: bool,
    ) -> StorageResult<ResolvedUrl> {
        validate_key(&object.public_id)?;
        let suffix = |url: String, sep: char| {
            if attachment {
                format!("{}{}download=1", url, sep)
            } else {
                url
            }
        };

        let ttl_secs = match (access, object.delivery) {
            (AccessPolicy::SignedExpiring { ttl_secs }, _) => Some(*ttl_secs),
            // Private objects never get an unsigned URL.
            (AccessPolicy::Public, DeliveryType::Authenticated) => {
                Some(imenu_core::constants::DEFAULT_SIGNED_URL_TTL_SECS)
            }
            (AccessPolicy::Public, DeliveryType::Upload) => None,
        };

        match ttl_secs {
            Some(ttl_secs) => {
                let expires_at = now + Duration::seconds(ttl_secs as i64);
                let url = self.signed_url(&object.public_id, expires_at);
                Ok(ResolvedUrl::signed(suffix(url, '&'), expires_at))
            }
            None => {
                let url = self.public_url(&object.public_id);
                Ok(ResolvedUrl::public(suffix(url, '?')))
            }
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn store(&self, policy: &UploadPolicy, data: Bytes) -> StorageResult<StoredObject> {
        let key = policy.object_key();
        let delivery = policy.access.delivery_type();
        let path = self.key_to_path(delivery, &key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let secure_url = match delivery {
            DeliveryType::Upload => self.public_url(&key),
            DeliveryType::Authenticated => format!("{}/files/{}", self.base_url, encode_key(&key)),
        };

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            delivery = delivery.as_str(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            public_id: key,
            secure_url,
            kind: policy.kind,
            format: Some(policy.extension.clone()),
            bytes: size as u64,
            delivery,
        })
    }

    fn build_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl> {
        self.resolve(object, access, now, object.kind.is_document())
    }

    fn attachment_url(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedUrl> {
        self.resolve(object, access, now, true)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn as_local(&self) -> Option<&LocalStorage> {
        Some(self)
    }
}
