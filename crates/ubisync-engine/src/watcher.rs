//! Local directory monitor (notify-based adapter)
//!
//! Implements [`ILocalDirectoryMonitor`] over the `notify` crate. The
//! monitor never forwards raw OS events: it re-scans the documents
//! directory after a change burst settles and delivers whole
//! [`LocalSet`](ubisync_core::domain::item::LocalSet) snapshots, which is
//! the only input shape the reconciler accepts.
//!
//! ## Architecture
//!
//! ```text
//! inotify ──→ callback (extension filter) ──→ mpsc ──→ debounce task ──→ re-scan ──→ DidUpdate
//! ```
//!
//! Rapid-fire changes keep extending the debounce window (~200 ms by
//! default) until the directory is quiet, so intermediate editor saves
//! collapse into one snapshot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ubisync_core::config::SyncConfig;
use ubisync_core::domain::errors::SyncError;
use ubisync_core::ports::local_monitor::{ILocalDirectoryMonitor, LocalMonitorEvent};

use crate::fsutil;

/// Raw signal from the notify callback to the debounce task
enum RawSignal {
    /// Something relevant changed; the path set is rebuilt by re-scanning
    Change,
    /// The OS watcher reported an error
    Error(String),
}

/// State held while a watch is active
struct RunningWatch {
    /// Keeps the OS watch alive; dropping it stops event delivery
    _watcher: RecommendedWatcher,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
    events: mpsc::Sender<LocalMonitorEvent>,
}

/// Watches the local documents directory and reports snapshots
pub struct LocalDirectoryMonitor {
    root: PathBuf,
    extension: String,
    debounce: Duration,
    paused: Arc<AtomicBool>,
    running: Option<RunningWatch>,
}

impl LocalDirectoryMonitor {
    /// Creates a monitor for `root`, filtering to `extension`
    pub fn new(root: PathBuf, extension: impl Into<String>, debounce: Duration) -> Self {
        Self {
            root,
            extension: extension.into(),
            debounce,
            paused: Arc::new(AtomicBool::new(false)),
            running: None,
        }
    }

    /// Creates a monitor from the sync configuration section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.accepted_extension.clone(),
            Duration::from_millis(config.debounce_ms),
        )
    }
}

/// Returns true if the OS event can affect the accepted document set
///
/// Access events never do; everything else is relevant when any involved
/// path carries the accepted extension.
fn is_relevant(event: &notify::Event, extension: &str) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    })
}

/// Collapses change signals and emits a snapshot once the burst settles
async fn debounce_loop(
    root: PathBuf,
    extension: String,
    debounce: Duration,
    paused: Arc<AtomicBool>,
    mut signals: mpsc::Receiver<RawSignal>,
    events: mpsc::Sender<LocalMonitorEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            _ = shutdown.cancelled() => break,
            signal = signals.recv() => signal,
        };

        match signal {
            None => break,
            Some(RawSignal::Error(message)) => {
                warn!(error = %message, "Filesystem watcher error");
                let _ = events
                    .send(LocalMonitorEvent::MonitorError(SyncError::Internal(
                        message,
                    )))
                    .await;
            }
            Some(RawSignal::Change) => {
                // Each further signal restarts the quiet window.
                loop {
                    match tokio::time::timeout(debounce, signals.recv()).await {
                        Ok(Some(RawSignal::Change)) => continue,
                        Ok(Some(RawSignal::Error(message))) => {
                            let _ = events
                                .send(LocalMonitorEvent::MonitorError(SyncError::Internal(
                                    message,
                                )))
                                .await;
                        }
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                if paused.load(Ordering::Acquire) {
                    debug!("Monitor paused, discarding settled burst");
                    continue;
                }

                match fsutil::scan_directory(&root, &extension).await {
                    Ok(snapshot) => {
                        debug!(items = snapshot.len(), "Change burst settled, snapshot sent");
                        if events
                            .send(LocalMonitorEvent::DidUpdate(snapshot))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = events
                            .send(LocalMonitorEvent::MonitorError(SyncError::internal(&err)))
                            .await;
                    }
                }
            }
        }
    }

    debug!("Local monitor debounce task stopped");
}

#[async_trait::async_trait]
impl ILocalDirectoryMonitor for LocalDirectoryMonitor {
    async fn start(&mut self, events: mpsc::Sender<LocalMonitorEvent>) -> Result<()> {
        if self.running.is_some() {
            anyhow::bail!("local monitor already started");
        }

        // Survive a missing documents directory by creating it.
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create documents directory: {}", self.root.display()))?;

        let snapshot = fsutil::scan_directory(&self.root, &self.extension).await?;
        info!(
            root = %self.root.display(),
            items = snapshot.len(),
            "Local gathering finished"
        );
        events
            .send(LocalMonitorEvent::DidFinishGathering(snapshot))
            .await
            .map_err(|_| anyhow::anyhow!("monitor event channel closed"))?;

        let (signal_tx, signal_rx) = mpsc::channel::<RawSignal>(256);
        let extension = self.extension.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if is_relevant(&event, &extension) {
                        let _ = signal_tx.blocking_send(RawSignal::Change);
                    }
                }
                Err(err) => {
                    let _ = signal_tx.blocking_send(RawSignal::Error(err.to_string()));
                }
            },
            notify::Config::default(),
        )
        .context("create filesystem watcher")?;

        watcher
            .watch(&self.root, RecursiveMode::NonRecursive)
            .with_context(|| format!("watch directory: {}", self.root.display()))?;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(debounce_loop(
            self.root.clone(),
            self.extension.clone(),
            self.debounce,
            self.paused.clone(),
            signal_rx,
            events.clone(),
            shutdown.clone(),
        ));

        self.running = Some(RunningWatch {
            _watcher: watcher,
            shutdown,
            task,
            events,
        });
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.cancel();
            let _ = running.task.await;
            info!(root = %self.root.display(), "Local monitor stopped");
        }
        self.paused.store(false, Ordering::Release);
    }

    async fn pause(&mut self) {
        debug!(root = %self.root.display(), "Local monitor paused");
        self.paused.store(true, Ordering::Release);
    }

    async fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::Release);
        // Catch up on anything that changed while paused.
        if let Some(running) = &self.running {
            let snapshot = fsutil::scan_directory(&self.root, &self.extension).await?;
            running
                .events
                .send(LocalMonitorEvent::DidUpdate(snapshot))
                .await
                .map_err(|_| anyhow::anyhow!("monitor event channel closed"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod relevance {
        use super::*;

        fn event(kind: EventKind, paths: Vec<PathBuf>) -> notify::Event {
            notify::Event {
                kind,
                paths,
                attrs: Default::default(),
            }
        }

        #[test]
        fn test_matching_extension_is_relevant() {
            let e = event(
                EventKind::Create(notify::event::CreateKind::File),
                vec![PathBuf::from("/docs/a.kml")],
            );
            assert!(is_relevant(&e, "kml"));
        }

        #[test]
        fn test_extension_match_is_case_insensitive() {
            let e = event(
                EventKind::Modify(notify::event::ModifyKind::Any),
                vec![PathBuf::from("/docs/a.KML")],
            );
            assert!(is_relevant(&e, "kml"));
        }

        #[test]
        fn test_other_extension_is_ignored() {
            let e = event(
                EventKind::Create(notify::event::CreateKind::File),
                vec![PathBuf::from("/docs/notes.txt")],
            );
            assert!(!is_relevant(&e, "kml"));
        }

        #[test]
        fn test_access_events_are_ignored() {
            let e = event(
                EventKind::Access(notify::event::AccessKind::Read),
                vec![PathBuf::from("/docs/a.kml")],
            );
            assert!(!is_relevant(&e, "kml"));
        }

        #[test]
        fn test_rename_is_relevant_if_either_path_matches() {
            let e = event(
                EventKind::Modify(notify::event::ModifyKind::Name(
                    notify::event::RenameMode::Both,
                )),
                vec![PathBuf::from("/docs/a.kml"), PathBuf::from("/docs/b.txt")],
            );
            assert!(is_relevant(&e, "kml"));
        }
    }

    mod lifecycle {
        use super::*;
        use std::time::Duration;

        async fn recv_with_timeout(
            rx: &mut mpsc::Receiver<LocalMonitorEvent>,
        ) -> LocalMonitorEvent {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for monitor event")
                .expect("monitor channel closed")
        }

        #[tokio::test]
        async fn test_start_gathers_existing_documents() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("a.kml"), b"a").unwrap();
            std::fs::write(dir.path().join("skip.txt"), b"s").unwrap();

            let mut monitor = LocalDirectoryMonitor::new(
                dir.path().to_path_buf(),
                "kml",
                Duration::from_millis(50),
            );
            let (tx, mut rx) = mpsc::channel(16);
            monitor.start(tx).await.unwrap();

            match recv_with_timeout(&mut rx).await {
                LocalMonitorEvent::DidFinishGathering(set) => {
                    assert_eq!(set.len(), 1);
                    assert!(set.contains("a.kml"));
                }
                other => panic!("expected gathering, got {other:?}"),
            }

            monitor.stop().await;
        }

        #[tokio::test]
        async fn test_start_creates_missing_directory() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("documents");

            let mut monitor =
                LocalDirectoryMonitor::new(root.clone(), "kml", Duration::from_millis(50));
            let (tx, mut rx) = mpsc::channel(16);
            monitor.start(tx).await.unwrap();

            assert!(root.is_dir());
            match recv_with_timeout(&mut rx).await {
                LocalMonitorEvent::DidFinishGathering(set) => assert!(set.is_empty()),
                other => panic!("expected gathering, got {other:?}"),
            }

            monitor.stop().await;
        }

        #[tokio::test]
        async fn test_change_burst_produces_one_snapshot() {
            let dir = tempfile::tempdir().unwrap();
            let mut monitor = LocalDirectoryMonitor::new(
                dir.path().to_path_buf(),
                "kml",
                Duration::from_millis(50),
            );
            let (tx, mut rx) = mpsc::channel(16);
            monitor.start(tx).await.unwrap();
            let _ = recv_with_timeout(&mut rx).await; // gathering

            std::fs::write(dir.path().join("new.kml"), b"fresh").unwrap();

            match recv_with_timeout(&mut rx).await {
                LocalMonitorEvent::DidUpdate(set) => {
                    assert!(set.contains("new.kml"));
                }
                other => panic!("expected update, got {other:?}"),
            }

            monitor.stop().await;
        }

        #[tokio::test]
        async fn test_double_start_fails() {
            let dir = tempfile::tempdir().unwrap();
            let mut monitor = LocalDirectoryMonitor::new(
                dir.path().to_path_buf(),
                "kml",
                Duration::from_millis(50),
            );
            let (tx, mut _rx) = mpsc::channel(16);
            monitor.start(tx.clone()).await.unwrap();
            assert!(monitor.start(tx).await.is_err());
            monitor.stop().await;
        }
    }
}
