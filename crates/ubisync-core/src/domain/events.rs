//! Incoming and outgoing event vocabulary
//!
//! `IncomingEvent` is an observation delivered by one of the directory
//! monitors; `OutgoingEvent` is an action the orchestrator must execute.
//! Both are closed sum types: every dispatch site matches exhaustively, so
//! adding a variant is a compile error until all dispatchers handle it.
//!
//! No outgoing event is ever produced by the I/O layer; all state
//! transitions originate from fresh observations.

use super::errors::SyncError;
use super::item::{CloudItem, CloudSet, LocalItem, LocalSet};

/// An observation from one of the directory monitors
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingEvent {
    /// The local monitor finished its initial enumeration
    DidFinishGatheringLocal(LocalSet),
    /// The cloud monitor finished its initial enumeration
    DidFinishGatheringCloud(CloudSet),
    /// The local monitor reported a coalesced burst of changes
    DidUpdateLocal(LocalSet),
    /// The cloud monitor reported a metadata update
    DidUpdateCloud(CloudSet),
}

impl IncomingEvent {
    /// Short tag for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            IncomingEvent::DidFinishGatheringLocal(_) => "did_finish_gathering_local",
            IncomingEvent::DidFinishGatheringCloud(_) => "did_finish_gathering_cloud",
            IncomingEvent::DidUpdateLocal(_) => "did_update_local",
            IncomingEvent::DidUpdateCloud(_) => "did_update_cloud",
        }
    }
}

/// An action produced by reconciliation, executed by the I/O workers
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingEvent {
    /// Write a cloud item's bytes to a new local file
    CreateLocal(CloudItem),
    /// Overwrite an existing local file with a cloud item's bytes
    UpdateLocal(CloudItem),
    /// Delete the local file matching a trashed cloud item
    RemoveLocal(CloudItem),
    /// Ask the cloud layer to materialize an item's bytes
    StartDownloading(CloudItem),
    /// Write a local file's bytes to a new cloud document
    CreateCloud(LocalItem),
    /// Overwrite an existing cloud document with a local file's bytes
    UpdateCloud(LocalItem),
    /// Move a cloud document to the container's trash
    RemoveCloud(LocalItem),
    /// Collapse a cloud item's concurrent versions into one
    ResolveVersionsConflict(CloudItem),
    /// Preserve a local file under a new name before first-sync overwrites
    ResolveInitialSyncConflict(LocalItem),
    /// The first-ever reconciliation completed; persist that fact
    DidFinishInitialSync,
    /// A per-item or session error surfaced during reconciliation
    DidReceiveError(SyncError),
}

impl OutgoingEvent {
    /// Short tag for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingEvent::CreateLocal(_) => "create_local",
            OutgoingEvent::UpdateLocal(_) => "update_local",
            OutgoingEvent::RemoveLocal(_) => "remove_local",
            OutgoingEvent::StartDownloading(_) => "start_downloading",
            OutgoingEvent::CreateCloud(_) => "create_cloud",
            OutgoingEvent::UpdateCloud(_) => "update_cloud",
            OutgoingEvent::RemoveCloud(_) => "remove_cloud",
            OutgoingEvent::ResolveVersionsConflict(_) => "resolve_versions_conflict",
            OutgoingEvent::ResolveInitialSyncConflict(_) => "resolve_initial_sync_conflict",
            OutgoingEvent::DidFinishInitialSync => "did_finish_initial_sync",
            OutgoingEvent::DidReceiveError(_) => "did_receive_error",
        }
    }

    /// Name of the file this action targets, if any
    pub fn item_name(&self) -> Option<&str> {
        match self {
            OutgoingEvent::CreateLocal(c)
            | OutgoingEvent::UpdateLocal(c)
            | OutgoingEvent::RemoveLocal(c)
            | OutgoingEvent::StartDownloading(c)
            | OutgoingEvent::ResolveVersionsConflict(c) => Some(&c.name),
            OutgoingEvent::CreateCloud(l)
            | OutgoingEvent::UpdateCloud(l)
            | OutgoingEvent::RemoveCloud(l)
            | OutgoingEvent::ResolveInitialSyncConflict(l) => Some(&l.name),
            OutgoingEvent::DidFinishInitialSync | OutgoingEvent::DidReceiveError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::path::PathBuf;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_incoming_kind() {
        let event = IncomingEvent::DidUpdateLocal(LocalSet::new());
        assert_eq!(event.kind(), "did_update_local");
        let event = IncomingEvent::DidFinishGatheringCloud(CloudSet::new());
        assert_eq!(event.kind(), "did_finish_gathering_cloud");
    }

    #[test]
    fn test_outgoing_item_name() {
        let item = CloudItem::new("a.kml", PathBuf::from("/c/a.kml"), "kml", ts(0), ts(0)).unwrap();
        let event = OutgoingEvent::CreateLocal(item);
        assert_eq!(event.item_name(), Some("a.kml"));
        assert_eq!(event.kind(), "create_local");

        assert_eq!(OutgoingEvent::DidFinishInitialSync.item_name(), None);
    }
}
