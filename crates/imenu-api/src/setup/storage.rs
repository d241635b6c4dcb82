//! Storage setup and initialization

use anyhow::{Context, Result};
use imenu_core::Config;
use imenu_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the configured backend. Missing credentials stop the process here.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!(backend = %config.storage_backend(), "Initializing storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(
        backend = %storage.backend_type(),
        configured = storage.is_configured(),
        "Storage initialized successfully"
    );
    Ok(storage)
}
