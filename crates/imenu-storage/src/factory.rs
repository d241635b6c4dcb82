use crate::{
    CloudinaryStorage, LinkSigner, LocalStorage, Storage, StorageBackend, StorageError,
    StorageResult,
};
use imenu_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        StorageBackend::Cloudinary => {
            let credentials = config.cloudinary().cloned().ok_or_else(|| {
                StorageError::ConfigError(
                    "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set"
                        .to_string(),
                )
            })?;

            let storage = CloudinaryStorage::new(
                credentials,
                config.cloudinary_api_base_url(),
                config.cloudinary_delivery_base_url(),
                Duration::from_secs(config.remote_store_timeout_secs()),
            )?;
            Ok(Arc::new(storage))
        }

        StorageBackend::Local => {
            let signer = match config.file_signing_secret() {
                Some(secret) => LinkSigner::new(secret.as_bytes()),
                None => {
                    tracing::warn!(
                        "FILE_SIGNING_SECRET not set; private file links will not survive a restart"
                    );
                    LinkSigner::ephemeral()
                }
            };

            let storage = LocalStorage::new(
                config.local_storage_path(),
                config.public_base_url().to_string(),
                signer,
            )
            .await?;
            Ok(Arc::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn builds_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<String, String> = [
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", dir.path().to_str().unwrap()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = Config::from_vars(&vars).unwrap();

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert!(storage.as_local().is_some());
        assert!(dir.path().join("private").is_dir());
    }

    #[tokio::test]
    async fn builds_cloudinary_backend() {
        let vars: HashMap<String, String> = [("CLOUDINARY_URL", "cloudinary://k:s@demo")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_vars(&vars).unwrap();

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Cloudinary);
        assert!(storage.is_configured());
    }
}
