//! Synchronization orchestrator
//!
//! The [`SyncOrchestrator`] owns both directory monitors, the
//! [`Reconciler`], the I/O workers and the bookmark-reload latch. Its
//! `run()` loop is the single serialized work lane of the engine: monitor
//! callbacks and application lifecycle notifications all arrive as channel
//! messages, and each message is fully processed — resolved through the
//! reconciler and its action batch drained in order — before the next one
//! is taken. The reconciler therefore needs no locking, and batches from
//! different observations never interleave.
//!
//! ## Flow
//!
//! ```text
//! monitors ──→ mpsc ──┐
//!                     ├──→ run() ──→ Reconciler.resolve ──→ [OutgoingEvent] ──→ workers
//! lifecycle ──→ mpsc ─┘                                            │
//!                                                     reload latch ──→ load_bookmarks()
//! ```
//!
//! Per-item worker failures are classified and logged without cancelling
//! sibling tasks; fatal errors cancel the stop token, which drains the
//! lane (remaining tasks short-circuit to no-ops) and stops both monitors.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ubisync_core::domain::errors::SyncError;
use ubisync_core::domain::events::{IncomingEvent, OutgoingEvent};
use ubisync_core::ports::app_hooks::{AppLifecycleEvent, IBackgroundActivity, IBookmarkLoader};
use ubisync_core::ports::cloud_container::ICloudContainer;
use ubisync_core::ports::cloud_monitor::{CloudMonitorEvent, ICloudDirectoryMonitor};
use ubisync_core::ports::local_monitor::{ILocalDirectoryMonitor, LocalMonitorEvent};
use ubisync_core::ports::local_store::ILocalDocumentStore;
use ubisync_core::ports::state_store::ISyncStateStore;

use crate::reconciler::Reconciler;
use crate::workers::SyncWorkers;

/// Channel capacity for monitor and lifecycle events
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything the orchestrator needs injected
pub struct SyncDependencies {
    pub local_monitor: Box<dyn ILocalDirectoryMonitor>,
    pub cloud_monitor: Box<dyn ICloudDirectoryMonitor>,
    pub cloud_container: Arc<dyn ICloudContainer>,
    pub local_store: Arc<dyn ILocalDocumentStore>,
    pub state_store: Arc<dyn ISyncStateStore>,
    pub bookmark_loader: Arc<dyn IBookmarkLoader>,
    pub background_activity: Arc<dyn IBackgroundActivity>,
}

/// Handle for posting lifecycle transitions and stopping the engine
///
/// Lifecycle notifications are delivered by the host on its main context;
/// this handle posts them onto the orchestrator's lane instead of touching
/// core state directly.
#[derive(Clone)]
pub struct SyncController {
    lifecycle_tx: mpsc::Sender<AppLifecycleEvent>,
    stop: CancellationToken,
}

impl SyncController {
    /// Posts a foreground transition onto the lane
    pub async fn enter_foreground(&self) {
        let _ = self
            .lifecycle_tx
            .send(AppLifecycleEvent::WillEnterForeground)
            .await;
    }

    /// Posts a background transition onto the lane
    pub async fn enter_background(&self) {
        let _ = self
            .lifecycle_tx
            .send(AppLifecycleEvent::DidEnterBackground)
            .await;
    }

    /// Posts expiration of the background-execution extension
    pub async fn background_time_expired(&self) {
        let _ = self
            .lifecycle_tx
            .send(AppLifecycleEvent::BackgroundTimeExpired)
            .await;
    }

    /// Stops synchronization; in-flight tasks complete as no-ops
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// True once the engine has stopped (user toggle or fatal error)
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Returns the fatal [`SyncError`] inside `err`, if any
///
/// Worker errors carry context layers; the adapter's root error is
/// searched through the whole chain.
fn fatal_sync_error(err: &anyhow::Error) -> Option<&SyncError> {
    err.downcast_ref::<SyncError>().filter(|e| e.is_fatal())
}

/// Pumps observations through the reconciler and drains action batches
pub struct SyncOrchestrator {
    local_monitor: Box<dyn ILocalDirectoryMonitor>,
    cloud_monitor: Box<dyn ICloudDirectoryMonitor>,
    workers: SyncWorkers,
    state_store: Arc<dyn ISyncStateStore>,
    bookmark_loader: Arc<dyn IBookmarkLoader>,
    background_activity: Arc<dyn IBackgroundActivity>,
    reconciler: Reconciler,

    local_tx: mpsc::Sender<LocalMonitorEvent>,
    local_rx: mpsc::Receiver<LocalMonitorEvent>,
    cloud_tx: mpsc::Sender<CloudMonitorEvent>,
    cloud_rx: mpsc::Receiver<CloudMonitorEvent>,
    lifecycle_rx: mpsc::Receiver<AppLifecycleEvent>,

    stopped: CancellationToken,
    reload_needed: bool,
    cloud_running: bool,
    local_running: bool,
    paused: bool,
    extension_active: bool,
}

impl SyncOrchestrator {
    /// Wires the orchestrator and returns the controller half
    pub fn new(deps: SyncDependencies) -> (Self, SyncController) {
        let (local_tx, local_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (cloud_tx, cloud_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let stopped = CancellationToken::new();

        let controller = SyncController {
            lifecycle_tx,
            stop: stopped.clone(),
        };

        let orchestrator = Self {
            workers: SyncWorkers::new(deps.cloud_container, deps.local_store),
            local_monitor: deps.local_monitor,
            cloud_monitor: deps.cloud_monitor,
            state_store: deps.state_store,
            bookmark_loader: deps.bookmark_loader,
            background_activity: deps.background_activity,
            reconciler: Reconciler::new(),
            local_tx,
            local_rx,
            cloud_tx,
            cloud_rx,
            lifecycle_rx,
            stopped,
            reload_needed: false,
            cloud_running: false,
            local_running: false,
            paused: false,
            extension_active: false,
        };

        (orchestrator, controller)
    }

    /// Runs the lane until the engine is stopped
    pub async fn run(mut self) {
        let initial_done = self.state_store.did_finish_initial_synchronization().await;
        self.reconciler.set_initial_sync(!initial_done);
        info!(initial_sync = !initial_done, "Synchronization orchestrator running");

        loop {
            tokio::select! {
                biased;
                _ = self.stopped.cancelled() => break,
                Some(event) = self.lifecycle_rx.recv() => self.on_lifecycle(event).await,
                Some(event) = self.cloud_rx.recv() => self.on_cloud_event(event).await,
                Some(event) = self.local_rx.recv() => self.on_local_event(event).await,
            }
        }

        self.shutdown().await;
    }

    /// Stops monitors and clears reconciler state; the lane is drained
    async fn shutdown(&mut self) {
        self.local_monitor.stop().await;
        self.cloud_monitor.stop().await;
        self.reconciler.reset();
        self.local_running = false;
        self.cloud_running = false;
        if self.extension_active {
            self.background_activity.end().await;
            self.extension_active = false;
        }
        info!("Synchronization stopped");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    async fn on_lifecycle(&mut self, event: AppLifecycleEvent) {
        match event {
            AppLifecycleEvent::WillEnterForeground => self.on_foreground().await,
            AppLifecycleEvent::DidEnterBackground => self.on_background().await,
            AppLifecycleEvent::BackgroundTimeExpired => self.on_background_expired().await,
        }
    }

    /// Starts (or resumes) monitoring when the application comes forward
    ///
    /// The cloud monitor starts first; the local monitor follows on the
    /// cloud side's first successful gathering (see
    /// [`on_cloud_event`](Self::on_cloud_event)).
    async fn on_foreground(&mut self) {
        if self.extension_active {
            self.background_activity.end().await;
            self.extension_active = false;
        }

        if self.paused {
            self.paused = false;
            if let Err(err) = self.cloud_monitor.resume().await {
                warn!(error = %err, "Cloud monitor failed to resume");
            }
            if let Err(err) = self.local_monitor.resume().await {
                warn!(error = %err, "Local monitor failed to resume");
            }
            return;
        }

        if !self.cloud_running {
            match self.cloud_monitor.start(self.cloud_tx.clone()).await {
                Ok(()) => {
                    self.cloud_running = true;
                    info!("Cloud monitor started");
                }
                Err(err) => {
                    error!(error = %err, "Cloud monitor failed to start, stopping synchronization");
                    self.stopped.cancel();
                }
            }
        }
    }

    /// Requests a background-execution extension while work may be pending
    async fn on_background(&mut self) {
        if !self.cloud_running || self.stopped.is_cancelled() {
            return;
        }
        match self
            .background_activity
            .begin("finish pending synchronization")
            .await
        {
            Ok(()) => {
                self.extension_active = true;
                debug!("Background execution extension requested");
            }
            Err(err) => warn!(error = %err, "Background extension not granted"),
        }
    }

    /// Pauses both monitors when the extension runs out
    ///
    /// The currently-running task finishes on its own; only delivery of
    /// further observations is suspended.
    async fn on_background_expired(&mut self) {
        info!("Background execution expired, pausing monitors");
        self.local_monitor.pause().await;
        self.cloud_monitor.pause().await;
        self.paused = true;
        if self.extension_active {
            self.background_activity.end().await;
            self.extension_active = false;
        }
    }

    // ========================================================================
    // Monitor events
    // ========================================================================

    async fn on_cloud_event(&mut self, event: CloudMonitorEvent) {
        match event {
            CloudMonitorEvent::DidFinishGathering(set) => {
                // First cloud success: bring up the local side.
                if !self.local_running {
                    match self.local_monitor.start(self.local_tx.clone()).await {
                        Ok(()) => {
                            self.local_running = true;
                            info!("Local monitor started");
                        }
                        Err(err) => {
                            error!(
                                error = %err,
                                "Local monitor failed to start, stopping synchronization"
                            );
                            self.stopped.cancel();
                            return;
                        }
                    }
                }
                self.pump(IncomingEvent::DidFinishGatheringCloud(set)).await;
            }
            CloudMonitorEvent::DidUpdate(set) => {
                self.pump(IncomingEvent::DidUpdateCloud(set)).await;
            }
            CloudMonitorEvent::MonitorError(err) => self.on_sync_error(err),
            CloudMonitorEvent::AvailabilityChanged { available: false } => {
                self.on_sync_error(SyncError::CloudUnavailable);
            }
            CloudMonitorEvent::AvailabilityChanged { available: true } => {
                info!("Cloud account became available");
            }
        }
    }

    async fn on_local_event(&mut self, event: LocalMonitorEvent) {
        match event {
            LocalMonitorEvent::DidFinishGathering(set) => {
                self.pump(IncomingEvent::DidFinishGatheringLocal(set)).await;
            }
            LocalMonitorEvent::DidUpdate(set) => {
                self.pump(IncomingEvent::DidUpdateLocal(set)).await;
            }
            LocalMonitorEvent::MonitorError(err) => self.on_sync_error(err),
        }
    }

    // ========================================================================
    // Batch dispatch
    // ========================================================================

    /// Resolves one observation and drains the resulting batch in order
    async fn pump(&mut self, event: IncomingEvent) {
        if self.stopped.is_cancelled() {
            return;
        }

        let batch = self.reconciler.resolve(event);
        if batch.is_empty() {
            return;
        }

        let batch_id = Uuid::new_v4();
        info!(batch = %batch_id, tasks = batch.len(), "Dispatching reconciliation batch");

        for action in batch {
            if self.stopped.is_cancelled() {
                debug!(batch = %batch_id, "Lane drained, remaining tasks skipped");
                break;
            }
            self.dispatch(action).await;
        }

        // Batch commit: at most one downstream reload per batch.
        if self.reload_needed {
            self.reload_needed = false;
            self.bookmark_loader.load_bookmarks().await;
            debug!(batch = %batch_id, "Bookmarks reload triggered");
        }
    }

    /// Executes a single action through the workers
    async fn dispatch(&mut self, action: OutgoingEvent) {
        let kind = action.kind();
        let name = action.item_name().map(str::to_owned);

        // Ok(true) marks actions that touched local documents and thus
        // require a bookmark reload after the batch.
        let result: anyhow::Result<bool> = match action {
            OutgoingEvent::CreateLocal(item) | OutgoingEvent::UpdateLocal(item) => {
                self.workers.write_to_local(&item).await.map(|_| true)
            }
            OutgoingEvent::RemoveLocal(item) => self.workers.remove_local(&item).await,
            OutgoingEvent::StartDownloading(item) => {
                self.workers.start_downloading(&item).await.map(|_| false)
            }
            OutgoingEvent::CreateCloud(item) | OutgoingEvent::UpdateCloud(item) => {
                self.workers.write_to_cloud(&item).await.map(|_| false)
            }
            OutgoingEvent::RemoveCloud(item) => {
                self.workers.remove_cloud(&item).await.map(|_| false)
            }
            OutgoingEvent::ResolveVersionsConflict(item) => self
                .workers
                .resolve_versions_conflict(&item)
                .await
                .map(|_| true),
            OutgoingEvent::ResolveInitialSyncConflict(item) => {
                self.workers.preserve_local_copy(&item).await.map(|_| false)
            }
            OutgoingEvent::DidFinishInitialSync => self
                .state_store
                .set_did_finish_initial_synchronization(true)
                .await
                .map(|_| false),
            OutgoingEvent::DidReceiveError(err) => {
                self.on_sync_error(err);
                Ok(false)
            }
        };

        match result {
            Ok(true) => self.reload_needed = true,
            Ok(false) => {}
            Err(err) => {
                if let Some(fatal) = fatal_sync_error(&err) {
                    error!(task = kind, error = %fatal, "Fatal task error, stopping synchronization");
                    self.stopped.cancel();
                } else {
                    // Per-item failure: siblings keep running, the next
                    // snapshot retries implicitly.
                    warn!(task = kind, name = name.as_deref(), error = %err, "Task failed");
                }
            }
        }
    }

    /// Classifies an error surfaced by a monitor or the reconciler
    fn on_sync_error(&mut self, err: SyncError) {
        if err.is_fatal() {
            error!(error = %err, "Fatal synchronization error, stopping");
            self.stopped.cancel();
        } else {
            warn!(error = %err, "Synchronization error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_fatal_error_found_through_context_chain() {
        let err = anyhow::Error::from(SyncError::CloudUnavailable)
            .context("coordinated write of a.kml")
            .context("task failed");
        assert_eq!(fatal_sync_error(&err), Some(&SyncError::CloudUnavailable));
    }

    #[test]
    fn test_transient_error_is_not_fatal() {
        let err = anyhow::Error::from(SyncError::UbiquityServerNotAvailable);
        assert!(fatal_sync_error(&err).is_none());
    }

    #[test]
    fn test_plain_io_error_is_not_fatal() {
        let err = anyhow::Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(fatal_sync_error(&err).is_none());
    }

    #[tokio::test]
    async fn test_controller_stop_flag() {
        let (lifecycle_tx, _lifecycle_rx) = mpsc::channel(4);
        let controller = SyncController {
            lifecycle_tx,
            stop: CancellationToken::new(),
        };

        assert!(!controller.is_stopped());
        controller.stop();
        assert!(controller.is_stopped());
    }
}
