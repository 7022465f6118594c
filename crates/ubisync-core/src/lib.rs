//! Ubisync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LocalItem`, `CloudItem`, `LocalSet`, `CloudSet`
//! - **Event vocabulary** - `IncomingEvent` observations and `OutgoingEvent` actions
//! - **Error taxonomy** - `SyncError` with per-item / fatal classification
//! - **Port definitions** - Traits for adapters: `ICloudContainer`,
//!   `ILocalDirectoryMonitor`, `ICloudDirectoryMonitor`, `ISyncStateStore`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. The
//! reconciliation state machine itself lives in `ubisync-engine` and consumes
//! only the types defined here.

pub mod config;
pub mod domain;
pub mod ports;
