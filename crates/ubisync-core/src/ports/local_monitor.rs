//! Local directory monitor port (driving/primary port)
//!
//! The local monitor observes the user's documents directory and reports
//! whole-directory snapshots: one `DidFinishGathering` per start, then a
//! `DidUpdate` for every coalesced burst of filesystem changes. The engine
//! never walks directories itself; it only consumes these snapshots.
//!
//! ## Design Notes
//!
//! - Events are delivered over a `tokio::mpsc` channel handed to `start`;
//!   the orchestrator's serial lane is the only consumer.
//! - Implementations filter to the single accepted content type and must
//!   survive directory non-existence by creating the directory.
//! - `start` may fail with the underlying OS error (e.g. a POSIX errno);
//!   the orchestrator treats that as a fatal stop.

use tokio::sync::mpsc;

use crate::domain::errors::SyncError;
use crate::domain::item::LocalSet;

/// An observation reported by the local directory monitor
#[derive(Debug, Clone, PartialEq)]
pub enum LocalMonitorEvent {
    /// Initial enumeration finished; the snapshot is complete
    DidFinishGathering(LocalSet),
    /// A coalesced burst of changes settled; the snapshot is complete
    DidUpdate(LocalSet),
    /// A per-item or monitor-level error
    MonitorError(SyncError),
}

/// Port trait for the local documents directory monitor
#[async_trait::async_trait]
pub trait ILocalDirectoryMonitor: Send + Sync {
    /// Starts monitoring and delivers events on `events`
    ///
    /// Reports `DidFinishGathering` exactly once per start, then `DidUpdate`
    /// on every settled change burst.
    ///
    /// # Errors
    /// Returns the underlying OS error if the directory cannot be created
    /// or watched.
    async fn start(&mut self, events: mpsc::Sender<LocalMonitorEvent>) -> anyhow::Result<()>;

    /// Stops monitoring; a subsequent `start` gathers again
    async fn stop(&mut self);

    /// Suspends change delivery without discarding the watch
    async fn pause(&mut self);

    /// Resumes a paused monitor, catching up with a fresh `DidUpdate`
    async fn resume(&mut self) -> anyhow::Result<()>;
}
