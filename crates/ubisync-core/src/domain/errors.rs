//! Domain error types
//!
//! This module defines the synchronization error taxonomy surfaced to the
//! orchestrator, plus validation-level errors for domain constructors.
//!
//! `SyncError` deliberately carries owned strings rather than source errors
//! so that it stays `Clone + PartialEq`: reconciliation batches are compared
//! verbatim in tests, and per-item errors travel inside cloud metadata
//! snapshots.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the synchronization machinery
///
/// Adapters classify their underlying failures (I/O, metadata decoding,
/// cloud-layer per-item errors) into this taxonomy before the errors reach
/// the core. Fatal variants stop the session; the rest are logged and
/// recovery happens through the next gathering/update event.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncError {
    /// The item's bytes cannot be fetched yet (peer has not finished uploading)
    #[error("file is not yet available in the cloud: {name}")]
    FileUnavailable {
        /// Name of the affected file
        name: String,
    },

    /// The cloud account is out of space
    #[error("file was not uploaded, cloud storage quota exhausted: {name}")]
    FileNotUploadedDueToQuota {
        /// Name of the affected file
        name: String,
    },

    /// Transport failure talking to the metadata server
    #[error("cloud metadata server is not available")]
    UbiquityServerNotAvailable,

    /// The user has no cloud identity on this device
    #[error("no cloud account is available")]
    CloudUnavailable,

    /// The application's cloud container cannot be resolved
    #[error("cloud container could not be resolved")]
    ContainerNotFound,

    /// Catch-all for coordinator errors, I/O failures and snapshot decoding errors
    #[error("internal synchronization error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Wraps an arbitrary error as [`SyncError::Internal`]
    pub fn internal(err: impl std::fmt::Display) -> Self {
        SyncError::Internal(err.to_string())
    }

    /// Returns true if this error must stop the synchronization session
    ///
    /// Quota exhaustion, a missing cloud identity and an unresolvable
    /// container are fatal. Everything else is per-item or transient.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::FileNotUploadedDueToQuota { .. }
                | SyncError::CloudUnavailable
                | SyncError::ContainerNotFound
        )
    }
}

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid file name (empty, or containing path separators)
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::FileUnavailable {
            name: "trip.kml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "file is not yet available in the cloud: trip.kml"
        );

        let err = SyncError::Internal("coordinator timed out".to_string());
        assert_eq!(
            err.to_string(),
            "internal synchronization error: coordinator timed out"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::FileNotUploadedDueToQuota {
            name: "big.kml".to_string()
        }
        .is_fatal());
        assert!(SyncError::CloudUnavailable.is_fatal());
        assert!(SyncError::ContainerNotFound.is_fatal());

        assert!(!SyncError::FileUnavailable {
            name: "a.kml".to_string()
        }
        .is_fatal());
        assert!(!SyncError::UbiquityServerNotAvailable.is_fatal());
        assert!(!SyncError::Internal("io".to_string()).is_fatal());
    }

    #[test]
    fn test_internal_wraps_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = SyncError::internal(&io);
        assert_eq!(err, SyncError::Internal("gone".to_string()));
    }

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InvalidName("a/b".to_string());
        assert_eq!(err.to_string(), "Invalid file name: a/b");
    }
}
