//! Cloudinary media host backend.
//!
//! Uploads go through the signed upload API
//! (`POST {api_base}/v1_1/{cloud}/{resource_type}/upload`). Public objects are
//! delivered from `{delivery_base}/{cloud}/{resource_type}/upload/...`; private
//! objects use the `authenticated` delivery type and are only reachable through
//! signed, expiring download URLs.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imenu_core::config::CloudinaryCredentials;
use imenu_core::{AccessPolicy, DeliveryType, MediaKind, StoredObject, UploadPolicy};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::keys::{encode_key, validate_key};
use crate::signing::api_signature;
use crate::traits::{ResolvedUrl, Storage, StorageError, StorageResult};
use crate::StorageBackend;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary storage implementation
#[derive(Clone)]
pub struct CloudinaryStorage {
    client: reqwest::Client,
    credentials: CloudinaryCredentials,
    api_base_url: String,
    delivery_base_url: String,
    timeout: Duration,
}

impl CloudinaryStorage {
    pub fn new(
        credentials: CloudinaryCredentials,
        api_base_url: &str,
        delivery_base_url: &str,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            delivery_base_url: delivery_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn upload_endpoint(&self, kind: MediaKind) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.api_base_url,
            self.credentials.cloud_name,
            kind.resource_type()
        )
    }

    /// Public delivery URL, optionally with the `fl_attachment` flag.
    fn delivery_url(&self, object: &StoredObject, attachment: bool) -> String {
        let flag = if attachment { "fl_attachment/" } else { "" };
        let path = match (object.kind, object.format.as_deref()) {
            // Raw public ids already carry their extension.
            (MediaKind::Document, _) | (MediaKind::Image, None) => object.public_id.clone(),
            (MediaKind::Image, Some(format)) => format!("{}.{}", object.public_id, format),
        };
        format!(
            "{}/{}/{}/upload/{}{}",
            self.delivery_base_url,
            self.credentials.cloud_name,
            object.kind.resource_type(),
            flag,
            encode_key(&path)
        )
    }

    /// Signed, expiring download URL served by the API host.
    fn private_download_url(
        &self,
        object: &StoredObject,
        ttl_secs: u64,
        now: DateTime<Utc>,
        attachment: bool,
    ) -> ResolvedUrl {
        let expires_at = now + chrono::Duration::seconds(ttl_secs as i64);

        let mut params = BTreeMap::new();
        params.insert("public_id", object.public_id.clone());
        params.insert("type", object.delivery.as_str().to_string());
        params.insert("timestamp", now.timestamp().to_string());
        params.insert("expires_at", expires_at.timestamp().to_string());
        if attachment {
            params.insert("attachment", "true".to_string());
        }
        if object.kind == MediaKind::Image {
            if let Some(format) = &object.format {
                params.insert("format", format.clone());
            }
        }
        let signature = api_signature(&params, &self.credentials.api_secret);

        let mut query: Vec<(&str, String)> = params.into_iter().collect();
        query.push(("api_key", self.credentials.api_key.clone()));
        query.push(("signature", signature));
        let query = query
            .into_iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    k,
                    percent_encoding::utf8_percent_encode(&v, percent_encoding::NON_ALPHANUMERIC)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        ResolvedUrl::signed(
            format!(
                "{}/v1_1/{}/{}/download?{}",
                self.api_base_url,
                self.credentials.cloud_name,
                object.kind.resource_type(),
                query
            ),
            expires_at,
        )
    }

    fn resolve(
        &self,
        object: &StoredObject,
        access: &AccessPolicy,
        now: DateTime<Utc>,
        attachment: bool,
    ) -> StorageResult<ResolvedUrl> {
        validate_key(&object.public_id)?;
        match (access, object.delivery) {
            (AccessPolicy::SignedExpiring { ttl_secs }, _) => {
                Ok(self.private_download_url(object, *ttl_secs, now, attachment))
            }
            (AccessPolicy::Public, DeliveryType::Authenticated) => Ok(self.private_download_url(
                object,
                imenu_core::constants::DEFAULT_SIGNED_URL_TTL_SECS,
                now,
                attachment,
            )),
            (AccessPolicy::Public, DeliveryType::Upload) => {
                if !attachment && !object.secure_url.is_empty() {
                    Ok(ResolvedUrl::public(object.secure_url.clone()))
                } else {
                    Ok(ResolvedUrl::public(self.delivery_url(object, attachment)))
                }
            }
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> StorageError {
        if e.is_timeout() {
            StorageError::Timeout(format!(
                "Cloudinary did not respond within {}s",
                self.timeout.as_secs()
            ))
        } else {
            StorageError::UploadFailed(format!("Cloudinary request failed: {}", e))
        }
    }
}

#[async_trait]
impl Storage for CloudinaryStorage {
    async fn store(&self, policy: &UploadPolicy, data: Bytes) -> StorageResult<StoredObject> {
        let public_id = policy.public_id();
        validate_key(&public_id)?;
        let delivery = policy.access.delivery_type();
        let size = data.len();
        let timestamp = Utc::now().timestamp().to_string();

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.clone());
        params.insert("timestamp", timestamp);
        params.insert("type", delivery.as_str().to_string());
        let signature = api_signature(&params, &self.credentials.api_secret);

        let file = Part::stream_with_length(data, size as u64)
            .file_name(policy.download_name())
            .mime_str(&policy.content_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.upload_endpoint(policy.kind))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| format!("Cloudinary responded with status {}", status));
            tracing::error!(
                status = status.as_u16(),
                public_id = %public_id,
                error = %message,
                "Cloudinary upload rejected"
            );
            return Err(StorageError::UploadFailed(message));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                StorageError::BackendError(format!("Unexpected Cloudinary response: {}", e))
            }
        })?;

        tracing::info!(
            public_id = %uploaded.public_id,
            resource_type = policy.kind.resource_type(),
            delivery = delivery.as_str(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloudinary upload successful"
        );

        Ok(StoredObject {
            public_id: uploaded.public_id,
            secure_url: uploaded.secure_url,
            kind: policy.kind,
            format: uploaded.format.or_else(|| Some(policy.extension.clone())),
            bytes: if uploaded.bytes > 0 {
                uploaded.bytes
            } else {
                size as u64
            },
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
        StorageBackend::Cloudinary
    }

    fn is_configured(&self) -> bool {
        !self.credentials.cloud_name.is_empty()
            && !self.credentials.api_key.is_empty()
            && !self.credentials.api_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> CloudinaryStorage {
        CloudinaryStorage::new(
            CloudinaryCredentials {
                cloud_name: "demo".to_string(),
                api_key: "1234".to_string(),
                api_secret: "secret".to_string(),
            },
            "https://api.cloudinary.com",
            "https://res.cloudinary.com",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn object(kind: MediaKind, delivery: DeliveryType) -> StoredObject {
        let (public_id, format) = match kind {
            MediaKind::Document => ("imenu/cardapios/menu_ab12.pdf", "pdf"),
            MediaKind::Image => ("imenu/images/photo", "jpg"),
        };
        StoredObject {
            public_id: public_id.to_string(),
            secure_url: format!("https://res.cloudinary.com/demo/{}.{}", public_id, format),
            kind,
            format: Some(format.to_string()),
            bytes: 10,
            delivery,
        }
    }

    #[test]
    fn public_images_use_secure_url() {
        let obj = object(MediaKind::Image, DeliveryType::Upload);
        let url = storage()
            .build_url(&obj, &AccessPolicy::Public, Utc::now())
            .unwrap();
        assert_eq!(url.url, obj.secure_url);
        assert!(url.expires_at.is_none());
    }

    #[test]
    fn public_documents_are_attachments() {
        let obj = object(MediaKind::Document, DeliveryType::Upload);
        let url = storage()
            .build_url(&obj, &AccessPolicy::Public, Utc::now())
            .unwrap();
        assert_eq!(
            url.url,
            "https://res.cloudinary.com/demo/raw/upload/fl_attachment/imenu/cardapios/menu_ab12.pdf"
        );
    }

    #[test]
    fn image_attachment_keeps_format() {
        let obj = object(MediaKind::Image, DeliveryType::Upload);
        let url = storage()
            .attachment_url(&obj, &AccessPolicy::Public, Utc::now())
            .unwrap();
        assert!(url
            .url
            .ends_with("/image/upload/fl_attachment/imenu/images/photo.jpg"));
    }

    #[test]
    fn signed_urls_expire_after_ttl_and_are_stable() {
        let obj = object(MediaKind::Image, DeliveryType::Authenticated);
        let access = AccessPolicy::SignedExpiring { ttl_secs: 600 };
        let now = Utc::now();
        let a = storage().build_url(&obj, &access, now).unwrap();
        let b = storage().build_url(&obj, &access, now).unwrap();
        assert_eq!(a, b);

        let expires_at = a.expires_at.unwrap();
        assert_eq!((expires_at - now).num_seconds(), 600);
        assert!(a.url.starts_with("https://api.cloudinary.com/v1_1/demo/image/download?"));
        assert!(a.url.contains(&format!("expires_at={}", expires_at.timestamp())));
        assert!(a.url.contains("type=authenticated"));
        assert!(a.url.contains("signature="));
        assert!(!a.url.contains("secret"));
    }

    #[test]
    fn later_instant_gives_different_signature() {
        let obj = object(MediaKind::Document, DeliveryType::Authenticated);
        let access = AccessPolicy::SignedExpiring { ttl_secs: 60 };
        let now = Utc::now();
        let a = storage().build_url(&obj, &access, now).unwrap();
        let b = storage()
            .build_url(&obj, &access, now + chrono::Duration::seconds(5))
            .unwrap();
        assert_ne!(a.url, b.url);
        assert!(a.url.contains("attachment=true"));
    }

    #[test]
    fn reports_configuration() {
        let s = storage();
        assert!(s.is_configured());
        assert_eq!(s.backend_type(), StorageBackend::Cloudinary);
        assert!(s.as_local().is_none());
    }
}
