//! Durable sync-state adapter (secondary/driven adapter)
//!
//! Persists the one durable fact the engine needs across restarts: whether
//! a full initial synchronization has ever completed. Stored as a small
//! JSON file, written atomically.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ubisync_core::ports::state_store::ISyncStateStore;

use crate::fsutil;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    did_finish_initial_synchronization: bool,
}

/// JSON-file-backed implementation of [`ISyncStateStore`]
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a store persisting at `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> PersistedState {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        error = %err,
                        "Sync-state file is corrupt, assuming defaults"
                    );
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        }
    }
}

#[async_trait::async_trait]
impl ISyncStateStore for FileStateStore {
    async fn did_finish_initial_synchronization(&self) -> bool {
        self.load().await.did_finish_initial_synchronization
    }

    async fn set_did_finish_initial_synchronization(&self, done: bool) -> anyhow::Result<()> {
        let state = PersistedState {
            did_finish_initial_synchronization: done,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(&state)?;
        fsutil::atomic_write(&self.path, &bytes).await?;
        debug!(path = %self.path.display(), done, "Persisted sync state");
        Ok(())
    }
}
