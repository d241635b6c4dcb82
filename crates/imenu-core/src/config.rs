//! Configuration module
//!
//! The service configuration is read once at startup, validated, and then
//! passed by reference into the storage backends and the HTTP layer. Nothing
//! reads the environment after that point.

use std::collections::HashMap;
use std::env;
use std::fmt;

use crate::constants::{
    DEFAULT_DOCUMENT_FOLDER, DEFAULT_IMAGE_FOLDER, DEFAULT_MENU_FOLDER, DEFAULT_MIME_TYPE,
    DEFAULT_PROFILE_FOLDER, DEFAULT_SIGNED_URL_TTL_SECS, MAX_UPLOAD_SIZE_CEILING_MB,
};
use crate::models::MediaKind;
use crate::storage_types::StorageBackend;
use crate::upload::UploadPurpose;

const SERVER_PORT: u16 = 3009;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const REMOTE_STORE_TIMEOUT_SECS: u64 = 30;
const CLOUDINARY_API_BASE_URL: &str = "https://api.cloudinary.com";
const CLOUDINARY_DELIVERY_BASE_URL: &str = "https://res.cloudinary.com";
const LOCAL_STORAGE_PATH: &str = "uploads";

/// Startup configuration failures. The process refuses to start on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing remote store credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Access policy applied when the caller does not ask for a private URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessDefault {
    #[default]
    Public,
    Signed,
}

/// Logical folder per content category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderConfig {
    pub images: String,
    pub documents: String,
    pub menus: String,
    pub profile_pictures: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            images: DEFAULT_IMAGE_FOLDER.to_string(),
            documents: DEFAULT_DOCUMENT_FOLDER.to_string(),
            menus: DEFAULT_MENU_FOLDER.to_string(),
            profile_pictures: DEFAULT_PROFILE_FOLDER.to_string(),
        }
    }
}

impl FolderConfig {
    pub fn folder_for(&self, purpose: UploadPurpose, kind: MediaKind) -> &str {
        match (purpose, kind) {
            (UploadPurpose::Menu, _) => &self.menus,
            (UploadPurpose::ProfilePicture, _) => &self.profile_pictures,
            (UploadPurpose::General, MediaKind::Document) => &self.documents,
            (UploadPurpose::General, MediaKind::Image) => &self.images,
        }
    }
}

/// The three secrets of the remote media host.
#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl CloudinaryCredentials {
    /// Parse `cloudinary://<api_key>:<api_secret>@<cloud_name>`.
    pub fn from_url(url: &str) -> Option<Self> {
        let rest = url.trim().strip_prefix("cloudinary://")?;
        let (auth, cloud_name) = rest.rsplit_once('@')?;
        let (api_key, api_secret) = auth.split_once(':')?;
        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            return None;
        }
        Some(Self {
            cloud_name: cloud_name.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: String,
}

/// Upload service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub storage_backend: StorageBackend,
    pub cloudinary: Option<CloudinaryCredentials>,
    pub cloudinary_api_base_url: String,
    pub cloudinary_delivery_base_url: String,
    pub local_storage_path: String,
    pub public_base_url: String,
    pub file_signing_secret: Option<String>,
    pub max_upload_bytes: usize,
    pub signed_url_ttl_secs: u64,
    pub default_access: AccessDefault,
    pub remote_store_timeout_secs: u64,
    pub default_mime_type: String,
    pub folders: FolderConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = ServiceConfig::from_vars(vars)?;
        config.validate()?;
        Ok(Config(Box::new(config)))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn cloudinary(&self) -> Option<&CloudinaryCredentials> {
        self.inner().cloudinary.as_ref()
    }

    /// Whether all three remote store secrets are present.
    pub fn cloudinary_configured(&self) -> bool {
        self.inner().cloudinary.is_some()
    }

    pub fn cloudinary_api_base_url(&self) -> &str {
        &self.inner().cloudinary_api_base_url
    }

    pub fn cloudinary_delivery_base_url(&self) -> &str {
        &self.inner().cloudinary_delivery_base_url
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn file_signing_secret(&self) -> Option<&str> {
        self.inner().file_signing_secret.as_deref()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner().max_upload_bytes
    }

    /// Request body ceiling: base64 inflates payloads by 4/3, plus room for JSON fields.
    pub fn max_request_body_bytes(&self) -> usize {
        self.inner().max_upload_bytes / 3 * 4 + 64 * 1024
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.inner().signed_url_ttl_secs
    }

    pub fn default_access(&self) -> AccessDefault {
        self.inner().default_access
    }

    pub fn remote_store_timeout_secs(&self) -> u64 {
        self.inner().remote_store_timeout_secs
    }

    pub fn default_mime_type(&self) -> &str {
        &self.inner().default_mime_type
    }

    pub fn folders(&self) -> &FolderConfig {
        &self.inner().folders
    }
}

impl ServiceConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = get("ENVIRONMENT")
            .or_else(|| get("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match get("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                reason: "must be a valid number".to_string(),
            })?,
            None => SERVER_PORT,
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = match get("STORAGE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                reason: format!("unknown backend '{}', expected cloudinary or local", value),
            })?,
            None => StorageBackend::Cloudinary,
        };

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => get("CLOUDINARY_URL").and_then(|url| CloudinaryCredentials::from_url(&url)),
        };

        let default_access = match get("DEFAULT_ACCESS").map(|s| s.to_lowercase()).as_deref() {
            None | Some("public") => AccessDefault::Public,
            Some("signed") | Some("private") => AccessDefault::Signed,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "DEFAULT_ACCESS",
                    reason: format!("unknown access '{}', expected public or signed", other),
                })
            }
        };

        let max_upload_mb = get("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                key: "MAX_UPLOAD_SIZE_MB",
                reason: format!("must be between 1 and {}", MAX_UPLOAD_SIZE_CEILING_MB),
            })?;

        let public_base_url = get("PUBLIC_BASE_URL")
            .or_else(|| get("DOMAIN"))
            .unwrap_or_else(|| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let defaults = FolderConfig::default();
        let folders = FolderConfig {
            images: get("IMAGE_FOLDER").unwrap_or(defaults.images),
            documents: get("DOCUMENT_FOLDER").unwrap_or(defaults.documents),
            menus: get("MENU_FOLDER").unwrap_or(defaults.menus),
            profile_pictures: get("PROFILE_FOLDER").unwrap_or(defaults.profile_pictures),
        };

        Ok(ServiceConfig {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
                log_format: get("LOG_FORMAT")
                    .unwrap_or_else(|| "compact".to_string())
                    .to_lowercase(),
            },
            storage_backend,
            cloudinary,
            cloudinary_api_base_url: get("CLOUDINARY_API_BASE_URL")
                .unwrap_or_else(|| CLOUDINARY_API_BASE_URL.to_string()),
            cloudinary_delivery_base_url: get("CLOUDINARY_DELIVERY_BASE_URL")
                .unwrap_or_else(|| CLOUDINARY_DELIVERY_BASE_URL.to_string()),
            local_storage_path: get("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            public_base_url,
            file_signing_secret: get("FILE_SIGNING_SECRET"),
            max_upload_bytes,
            signed_url_ttl_secs: get("SIGNED_URL_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS),
            default_access,
            remote_store_timeout_secs: get("REMOTE_STORE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(REMOTE_STORE_TIMEOUT_SECS),
            default_mime_type: get("DEFAULT_MIME_TYPE")
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
                .to_lowercase(),
            folders,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = self.base.environment.to_lowercase();
        let is_production = env == "production" || env == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Invalid {
                key: "CORS_ORIGINS",
                reason: "cannot be '*' in production, specify explicit origins".to_string(),
            });
        }

        let max_bytes = MAX_UPLOAD_SIZE_CEILING_MB * 1024 * 1024;
        if self.max_upload_bytes == 0 || self.max_upload_bytes > max_bytes {
            return Err(ConfigError::Invalid {
                key: "MAX_UPLOAD_SIZE_MB",
                reason: format!("must be between 1 and {}", MAX_UPLOAD_SIZE_CEILING_MB),
            });
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SIGNED_URL_TTL_SECS",
                reason: "cannot be 0".to_string(),
            });
        }

        if self.remote_store_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REMOTE_STORE_TIMEOUT_SECS",
                reason: "cannot be 0".to_string(),
            });
        }

        if !self.default_mime_type.contains('/') {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_MIME_TYPE",
                reason: format!("'{}' is not a mime type", self.default_mime_type),
            });
        }

        if let Some(secret) = &self.file_signing_secret {
            if secret.len() < 32 {
                return Err(ConfigError::Invalid {
                    key: "FILE_SIGNING_SECRET",
                    reason: "must be at least 32 characters long".to_string(),
                });
            }
        }

        match self.storage_backend {
            StorageBackend::Cloudinary => {
                if self.cloudinary.is_none() {
                    return Err(ConfigError::MissingCredentials(vec![
                        "CLOUDINARY_CLOUD_NAME",
                        "CLOUDINARY_API_KEY",
                        "CLOUDINARY_API_SECRET",
                    ]));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "LOCAL_STORAGE_PATH",
                        reason: "must be set when using the local storage backend".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
