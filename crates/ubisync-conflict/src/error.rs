//! Conflict resolution error types

use thiserror::Error;

/// Errors raised while collapsing cloud-side document versions
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The cloud layer advertised a conflict but listed no alternate versions
    #[error("No alternate versions found for {0}")]
    NoVersions(String),

    /// No unused preserved-copy name could be found within the probe limit
    #[error("Could not find an unused copy name for {0}")]
    NamingExhausted(String),

    /// A file operation during resolution failed
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),
}
