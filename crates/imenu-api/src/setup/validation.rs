//! Configuration validation
//!
//! `Config` already rejects invalid values while loading. The checks here
//! cover combinations that only matter once the service is about to serve
//! traffic.

use anyhow::Result;
use imenu_core::{Config, StorageBackend};

/// Validate configuration for serving
///
/// Fails on combinations that would break clients outright; warns on ones
/// that only degrade behaviour.
pub fn validate_config(config: &Config) -> Result<()> {
    let is_production = config.is_production();

    // Validate CORS configuration in production
    if is_production && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set specific allowed origins via the CORS_ORIGINS environment variable."
        ));
    }

    if config.storage_backend() == StorageBackend::Local {
        if is_production && config.public_base_url().contains("localhost") {
            return Err(anyhow::anyhow!(
                "PUBLIC_BASE_URL points at localhost in production; file URLs would be unreachable"
            ));
        }

        if config.file_signing_secret().is_none() {
            tracing::warn!(
                "FILE_SIGNING_SECRET not set - signed file links will stop working after a restart"
            );
        }
    }

    if config.signed_url_ttl_secs() > 7 * 24 * 3600 {
        tracing::warn!(
            ttl_secs = config.signed_url_ttl_secs(),
            "SIGNED_URL_TTL_SECS is longer than a week - private links stay valid for a long time"
        );
    }

    if config.remote_store_timeout_secs() > 120 {
        tracing::warn!(
            timeout_secs = config.remote_store_timeout_secs(),
            "REMOTE_STORE_TIMEOUT_SECS is high - slow uploads will hold connections open"
        );
    }

    Ok(())
}
