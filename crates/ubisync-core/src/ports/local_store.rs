//! Local document store port (driven/secondary port)
//!
//! The local side of the worker dispatch table: plain file operations on
//! the user's documents directory, keyed by file name. Paths are derived
//! from names by the adapter; the engine never builds local paths itself.
//!
//! ## Design Notes
//!
//! - Writes are atomic (temp file + rename) and stamp the destination's
//!   modification time to the given `modified_at`, mirroring the cloud
//!   container's write discipline.
//! - `remove` reports whether a file was actually deleted so callers can
//!   distinguish a no-op from an effectful removal.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Port trait for the local documents directory
#[async_trait::async_trait]
pub trait ILocalDocumentStore: Send + Sync {
    /// Path the document with this name lives at (or would live at)
    fn url_for(&self, name: &str) -> PathBuf;

    /// Returns true if a document with this name exists
    async fn exists(&self, name: &str) -> bool;

    /// Reads the document's bytes
    async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>>;

    /// Atomically writes `data`, stamping the mtime to `modified_at`
    async fn write(
        &self,
        name: &str,
        data: &[u8],
        modified_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Deletes the document if present; returns whether it existed
    async fn remove(&self, name: &str) -> anyhow::Result<bool>;

    /// Renames a document within the directory
    async fn rename(&self, from: &str, to: &str) -> anyhow::Result<()>;
}
