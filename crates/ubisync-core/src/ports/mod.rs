//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the engine depends
//! on, but whose implementations live in adapter crates or in the host
//! application.
//!
//! ## Ports Overview
//!
//! - [`ILocalDirectoryMonitor`] / [`ICloudDirectoryMonitor`] - snapshot
//!   observation of the two sides (gathering, then incremental updates)
//! - [`ICloudContainer`] - coordinated file operations against the
//!   ubiquitous container, downloads and conflict-version primitives
//! - [`ILocalDocumentStore`] - the local documents directory
//! - [`ISyncStateStore`] - durable synchronization state
//! - [`IBookmarkLoader`], [`IBackgroundActivity`] - application hooks

pub mod app_hooks;
pub mod cloud_container;
pub mod cloud_monitor;
pub mod local_monitor;
pub mod local_store;
pub mod state_store;

pub use app_hooks::{AppLifecycleEvent, IBackgroundActivity, IBookmarkLoader};
pub use cloud_container::{DocumentVersion, ICloudContainer};
pub use cloud_monitor::{CloudMonitorEvent, ICloudDirectoryMonitor};
pub use local_monitor::{ILocalDirectoryMonitor, LocalMonitorEvent};
pub use local_store::ILocalDocumentStore;
pub use state_store::ISyncStateStore;
