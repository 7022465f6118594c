//! Cloud container port (driven/secondary port)
//!
//! File operations against the ubiquitous container. The container is
//! surfaced by the host as a local path with additional metadata, so all
//! operations take concrete paths, but every read/write/delete must run
//! under the host's file-coordination discipline so that the cloud sync
//! daemon observes atomic updates.
//!
//! ## Design Notes
//!
//! - `container_url` is resolved lazily and cached by the adapter; it is
//!   read-only after first resolution.
//! - `write` stamps the destination's modification time to `modified_at`
//!   *after* the byte write completes, so the next metadata snapshot
//!   compares equal on both sides and does not bounce an event back.
//! - `start_download` is fire-and-forget: completion is observed via the
//!   next metadata snapshot, never via a callback.
//! - The conflict-version primitives mirror the host's document version
//!   store and are only meaningful for items advertising unresolved
//!   conflicts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::item::CloudItem;

/// One concurrent version of a document, as advertised by the cloud layer
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVersion {
    /// Opaque identifier of the version within the version store
    pub id: String,
    /// Modification time of the version
    pub modified_at: DateTime<Utc>,
}

/// Port trait for coordinated operations against the ubiquitous container
#[async_trait::async_trait]
pub trait ICloudContainer: Send + Sync {
    /// Resolves the container's root URL (cached after first resolution)
    async fn container_url(&self) -> anyhow::Result<PathBuf>;

    /// File-coordinated read of the document at `url`
    async fn read(&self, url: &Path) -> anyhow::Result<Vec<u8>>;

    /// File-coordinated write, stamping the destination mtime to `modified_at`
    async fn write(&self, url: &Path, data: &[u8], modified_at: DateTime<Utc>)
        -> anyhow::Result<()>;

    /// File-coordinated copy within the container
    async fn copy(&self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// File-coordinated removal of the document at `url`
    async fn remove(&self, url: &Path) -> anyhow::Result<()>;

    /// Returns true if a document exists at `url`
    async fn exists(&self, url: &Path) -> anyhow::Result<bool>;

    /// Path of the trash entry with this file name, if one exists
    async fn trash_entry(&self, name: &str) -> anyhow::Result<Option<PathBuf>>;

    /// Moves the live document at `url` into the container's trash
    async fn move_to_trash(&self, url: &Path) -> anyhow::Result<()>;

    /// Asks the host to materialize the item's bytes (fire-and-forget)
    async fn start_download(&self, item: &CloudItem) -> anyhow::Result<()>;

    /// Lists the alternate (non-current) versions of the document at `url`
    async fn list_conflict_versions(&self, url: &Path) -> anyhow::Result<Vec<DocumentVersion>>;

    /// Replaces the current document content with `version`
    async fn replace_with_version(
        &self,
        url: &Path,
        version: &DocumentVersion,
    ) -> anyhow::Result<()>;

    /// Discards all alternate versions, marking the conflict resolved
    async fn clear_conflict_versions(&self, url: &Path) -> anyhow::Result<()>;
}
