//! Shared, replaceable configuration handle

use super::service::{RestartConfig, ServiceConfig};
use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Live service configuration.
///
/// Readers get an immutable snapshot; updates build a new configuration and
/// swap it in whole, so a restart in progress never sees a half-applied patch.
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<ServiceConfig>>>,
    path: PathBuf,
}

impl ConfigHandle {
    /// Create a handle backed by the file at `path`
    pub fn new(config: ServiceConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
            path: path.into(),
        }
    }

    /// Path the configuration is persisted to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration snapshot
    pub async fn current(&self) -> Arc<ServiceConfig> {
        self.current.read().await.clone()
    }

    /// Restart parameters derived from the current snapshot
    pub async fn restart_config(&self) -> RestartConfig {
        self.current().await.restart_config()
    }

    /// Merge `patch` into the live configuration, persist it and swap it in.
    ///
    /// Nothing changes if the merged result is invalid or cannot be written.
    pub async fn apply_patch(&self, patch: Value) -> Result<Arc<ServiceConfig>> {
        let mut guard = self.current.write().await;

        let updated = guard.merged(patch)?;
        updated.check_settings()?;
        updated.save(&self.path)?;

        let updated = Arc::new(updated);
        *guard = updated.clone();
        Ok(updated)
    }
}
