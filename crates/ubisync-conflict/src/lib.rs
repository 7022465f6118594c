//! Ubisync Conflict - Conflict-copy naming and version resolution
//!
//! Provides:
//! - Deterministic generation of preserved-copy file names
//! - Collapse of cloud-side concurrent document versions

pub mod error;
pub mod namer;
pub mod resolver;

pub use error::ConflictError;
pub use namer::CopyNamer;
pub use resolver::{ResolvedVersions, VersionResolver};
