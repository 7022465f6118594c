//! Cloud (ubiquitous) directory monitor port (driving/primary port)
//!
//! The cloud monitor wraps the host's metadata query against the ubiquitous
//! container. Like the local monitor it reports whole snapshots: one
//! `DidFinishGathering` per start, then a `DidUpdate` for every batched
//! metadata notification (batching interval ~1 s).
//!
//! ## Design Notes
//!
//! - Every snapshot must surface `is_downloaded`, `has_unresolved_conflicts`
//!   and the two per-item error slots on each item.
//! - Trashed items are surfaced per platform capability: by scanning the
//!   container's `.Trash` subdirectory where one exists, otherwise from the
//!   removed-items slot of the update notification. The engine tolerates
//!   the latter's visibility window because its input is always the freshly
//!   merged snapshot.
//! - Loss of the cloud identity (user signed out) is a distinct event and
//!   maps to a fatal stop.

use tokio::sync::mpsc;

use crate::domain::errors::SyncError;
use crate::domain::item::CloudSet;

/// An observation reported by the cloud directory monitor
#[derive(Debug, Clone, PartialEq)]
pub enum CloudMonitorEvent {
    /// Initial metadata enumeration finished; the snapshot is complete
    DidFinishGathering(CloudSet),
    /// A batched metadata notification settled; the snapshot is complete
    DidUpdate(CloudSet),
    /// A per-item or monitor-level error
    MonitorError(SyncError),
    /// The cloud identity appeared or disappeared
    AvailabilityChanged {
        /// False when the user signed out of the cloud account
        available: bool,
    },
}

/// Port trait for the ubiquitous container metadata monitor
#[async_trait::async_trait]
pub trait ICloudDirectoryMonitor: Send + Sync {
    /// Starts the metadata query and delivers events on `events`
    ///
    /// # Errors
    /// Returns an error if the metadata query cannot be started (no cloud
    /// identity, container unresolvable).
    async fn start(&mut self, events: mpsc::Sender<CloudMonitorEvent>) -> anyhow::Result<()>;

    /// Stops the metadata query; a subsequent `start` gathers again
    async fn stop(&mut self);

    /// Suspends update delivery without tearing the query down
    async fn pause(&mut self);

    /// Resumes a paused monitor
    async fn resume(&mut self) -> anyhow::Result<()>;
}
