//! I/O workers executing reconciliation actions
//!
//! Every [`OutgoingEvent`](ubisync_core::domain::events::OutgoingEvent)
//! becomes exactly one worker call. The workers compose the two store ports
//! and the version resolver; they hold no synchronization state and report
//! plain `Result`s — classification and the reload latch live in the
//! orchestrator.
//!
//! Writes in either direction stamp the destination's modification time to
//! the source item's `modified_at` after the bytes land, so the next
//! metadata snapshot compares equal on both sides.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use ubisync_conflict::{ConflictError, CopyNamer, ResolvedVersions, VersionResolver};
use ubisync_core::domain::item::{CloudItem, LocalItem};
use ubisync_core::ports::cloud_container::ICloudContainer;
use ubisync_core::ports::local_store::ILocalDocumentStore;

/// Upper bound on preserved-copy name probing
const MAX_NAME_PROBES: usize = 1_000;

/// Coordinated read/write/delete/download primitives against the two stores
pub struct SyncWorkers {
    container: Arc<dyn ICloudContainer>,
    local: Arc<dyn ILocalDocumentStore>,
    resolver: VersionResolver,
}

impl SyncWorkers {
    pub fn new(container: Arc<dyn ICloudContainer>, local: Arc<dyn ILocalDocumentStore>) -> Self {
        let resolver = VersionResolver::new(container.clone());
        Self {
            container,
            local,
            resolver,
        }
    }

    /// Materializes a cloud item as a local document (create and update)
    ///
    /// Coordinated read of the item's bytes, atomic local write, local
    /// mtime stamped to the item's `modified_at`.
    pub async fn write_to_local(&self, item: &CloudItem) -> Result<()> {
        let data = self
            .container
            .read(&item.url)
            .await
            .with_context(|| format!("coordinated read of {}", item.name))?;
        self.local
            .write(&item.name, &data, item.modified_at)
            .await
            .with_context(|| format!("local write of {}", item.name))?;
        debug!(name = %item.name, bytes = data.len(), "Copied cloud document to local store");
        Ok(())
    }

    /// Deletes the local document matching a trashed cloud item, if present
    pub async fn remove_local(&self, item: &CloudItem) -> Result<bool> {
        let removed = self
            .local
            .remove(&item.name)
            .await
            .with_context(|| format!("local removal of {}", item.name))?;
        if removed {
            debug!(name = %item.name, "Removed local document (trashed in cloud)");
        }
        Ok(removed)
    }

    /// Asks the cloud layer to materialize the item's bytes
    ///
    /// Fire-and-forget: completion is observed via the next metadata
    /// snapshot, which graduates the item to a concrete local write.
    pub async fn start_downloading(&self, item: &CloudItem) -> Result<()> {
        self.container
            .start_download(item)
            .await
            .with_context(|| format!("download request for {}", item.name))?;
        debug!(name = %item.name, "Requested download");
        Ok(())
    }

    /// Writes a local document into the container (create and update)
    pub async fn write_to_cloud(&self, item: &LocalItem) -> Result<()> {
        let root = self
            .container
            .container_url()
            .await
            .context("resolve container URL")?;
        let data = self
            .local
            .read(&item.name)
            .await
            .with_context(|| format!("local read of {}", item.name))?;
        let target = root.join(&item.name);
        self.container
            .write(&target, &data, item.modified_at)
            .await
            .with_context(|| format!("coordinated write of {}", item.name))?;
        debug!(name = %item.name, bytes = data.len(), "Copied local document to container");
        Ok(())
    }

    /// Moves a cloud document into the container's trash
    ///
    /// A stale trash entry with the same name is deleted first to keep
    /// trash names unique.
    pub async fn remove_cloud(&self, item: &LocalItem) -> Result<()> {
        let root = self
            .container
            .container_url()
            .await
            .context("resolve container URL")?;

        if let Some(stale) = self
            .container
            .trash_entry(&item.name)
            .await
            .with_context(|| format!("probe trash for {}", item.name))?
        {
            debug!(name = %item.name, "Deleting stale trash entry");
            self.container
                .remove(&stale)
                .await
                .with_context(|| format!("delete stale trash entry for {}", item.name))?;
        }

        let live = root.join(&item.name);
        self.container
            .move_to_trash(&live)
            .await
            .with_context(|| format!("trash {}", item.name))?;
        debug!(name = %item.name, "Moved cloud document to trash");
        Ok(())
    }

    /// Collapses the item's concurrent versions keep-both style
    pub async fn resolve_versions_conflict(&self, item: &CloudItem) -> Result<ResolvedVersions> {
        let resolved = self
            .resolver
            .resolve(item)
            .await
            .with_context(|| format!("version conflict on {}", item.name))?;
        Ok(resolved)
    }

    /// Renames a local document aside before first-sync overwrites
    ///
    /// The preserved copy re-appears as a fresh cloud creation in a
    /// subsequent local diff.
    pub async fn preserve_local_copy(&self, item: &LocalItem) -> Result<String> {
        for candidate in CopyNamer::candidates(&item.name).take(MAX_NAME_PROBES) {
            if self.local.exists(&candidate).await {
                continue;
            }
            self.local
                .rename(&item.name, &candidate)
                .await
                .with_context(|| format!("preserve {} as {candidate}", item.name))?;
            info!(name = %item.name, preserved_as = %candidate, "Preserved local copy");
            return Ok(candidate);
        }
        Err(ConflictError::NamingExhausted(item.name.clone()).into())
    }
}
