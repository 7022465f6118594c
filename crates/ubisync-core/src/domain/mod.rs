//! Domain entities and business logic
//!
//! This module contains the core domain types for Ubisync:
//! - Per-file metadata records for each side of the synchronization
//! - Snapshot sets keyed by file name
//! - The closed incoming/outgoing event vocabulary
//! - Domain-specific error types

pub mod errors;
pub mod events;
pub mod item;

// Re-export commonly used types
pub use errors::{DomainError, SyncError};
pub use events::{IncomingEvent, OutgoingEvent};
pub use item::{CloudItem, CloudSet, LocalItem, LocalSet, MetadataItem};
