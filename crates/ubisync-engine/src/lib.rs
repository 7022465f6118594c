//! Ubisync Engine - Reconciliation and orchestration
//!
//! Provides:
//! - The pure snapshot reconciler (decides, never performs I/O)
//! - The orchestrator pumping monitor events through the reconciler and
//!   draining the resulting actions on one serialized lane
//! - The I/O workers executing those actions against the two stores
//! - A notify-based local directory monitor
//! - Filesystem-backed adapters for the local store and durable state

pub mod fsutil;
pub mod orchestrator;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod watcher;
pub mod workers;

pub use orchestrator::{SyncController, SyncDependencies, SyncOrchestrator};
pub use reconciler::Reconciler;
pub use state::FileStateStore;
pub use store::FsDocumentStore;
pub use watcher::LocalDirectoryMonitor;
pub use workers::SyncWorkers;
