//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Instant;

use imenu_core::{Config, UploadNormalizer};
use imenu_infra::ProcessMonitor;
use imenu_storage::Storage;

use crate::services::file_registry::FileRegistry;

/// Handles held for the lifetime of the process.
///
/// Built once in `setup::initialize_app` and shared as `Arc<AppState>`; the
/// file registry is the only mutable part.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub normalizer: UploadNormalizer,
    pub files: FileRegistry,
    /// `None` when the process table could not be read at startup.
    pub process: Option<ProcessMonitor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let process = match ProcessMonitor::new() {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                tracing::warn!(error = %e, "Process monitor unavailable; health will omit memory");
                None
            }
        };

        Self {
            normalizer: UploadNormalizer::from_config(&config),
            config,
            storage,
            files: FileRegistry::default(),
            process,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
