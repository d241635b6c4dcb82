//! Process resource readings.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use sysinfo::{Pid, System};
use utoipa::ToSchema;

/// Memory held by this process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

/// Reads memory usage of the current process.
#[derive(Clone)]
pub struct ProcessMonitor {
    system: Arc<Mutex<System>>,
    pid: Pid,
}

impl ProcessMonitor {
    pub fn new() -> anyhow::Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| anyhow::anyhow!("Failed to resolve current pid: {}", e))?;
        Ok(Self {
            system: Arc::new(Mutex::new(System::new())),
            pid,
        })
    }

    pub fn memory_usage(&self) -> anyhow::Result<MemoryUsage> {
        let mut system = self.system.lock().map_err(|e| {
            tracing::error!(error = %e, "Failed to acquire system lock for memory reading");
            anyhow::anyhow!("Failed to read memory: mutex poisoned")
        })?;
        system.refresh_process(self.pid);
        let process = system
            .process(self.pid)
            .ok_or_else(|| anyhow::anyhow!("Current process not found"))?;
        Ok(MemoryUsage {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }

    /// Same as [`memory_usage`](Self::memory_usage) without blocking the runtime.
    pub async fn memory_usage_async(&self) -> anyhow::Result<MemoryUsage> {
        let monitor = self.clone();
        tokio::task::spawn_blocking(move || monitor.memory_usage())
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking for memory reading: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_own_memory() {
        let monitor = ProcessMonitor::new().unwrap();
        let usage = monitor.memory_usage_async().await.unwrap();
        assert!(usage.rss_bytes > 0);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(MemoryUsage {
            rss_bytes: 1,
            virtual_bytes: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "rssBytes": 1, "virtualBytes": 2 }));
    }
}
