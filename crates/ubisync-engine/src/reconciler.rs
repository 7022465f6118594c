//! Snapshot reconciliation state machine
//!
//! The [`Reconciler`] is the decision core of the engine: given its two
//! retained snapshots and one incoming observation it produces the ordered
//! list of actions that bring the local documents directory and the
//! ubiquitous container into agreement. It is pure and single-threaded —
//! no I/O, no clocks, no locking — and it never fails; problems surface as
//! [`OutgoingEvent::DidReceiveError`] values inside the batch.
//!
//! ## Flow
//!
//! ```text
//! monitor ──→ resolve(IncomingEvent) ──→ [OutgoingEvent] ──→ orchestrator
//! ```
//!
//! Both monitors must finish their initial gathering before the first full
//! reconciliation runs; incremental updates are diffed immediately even if
//! the other side is still gathering. Within one batch, actions are ordered
//! errors → unresolved conflicts → download starts → removals → creations →
//! updates; iteration within each class is in name order.

use tracing::debug;

use ubisync_core::domain::events::{IncomingEvent, OutgoingEvent};
use ubisync_core::domain::item::{CloudSet, LocalSet, MetadataItem};

/// The synchronization state manager
///
/// Retains the most recent snapshot of each side plus the gathering and
/// initial-sync flags. All mutation happens through [`resolve`] and
/// [`reset`]; ownership by a single task replaces locks.
///
/// [`resolve`]: Reconciler::resolve
/// [`reset`]: Reconciler::reset
#[derive(Debug, Default)]
pub struct Reconciler {
    local_snapshot: LocalSet,
    cloud_snapshot: CloudSet,
    local_gathered: bool,
    cloud_gathered: bool,
    is_initial_sync: bool,
}

impl Reconciler {
    /// Creates a reconciler with empty snapshots
    ///
    /// The initial-sync flag starts false; the orchestrator sets it from
    /// durable state before pumping events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks whether this session is the first-ever synchronization
    pub fn set_initial_sync(&mut self, initial: bool) {
        self.is_initial_sync = initial;
    }

    /// True while the first-ever reconciliation has not completed
    pub fn is_initial_sync(&self) -> bool {
        self.is_initial_sync
    }

    /// Clears all retained state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feeds one observation through the state machine
    ///
    /// Returns the actions to execute, in order. The snapshot for the side
    /// implicated by the event equals the delivered set when this returns,
    /// with one exception: a cloud update carrying unresolved conflicts is
    /// not committed (see [`diff_cloud`](Self::diff_cloud)).
    pub fn resolve(&mut self, event: IncomingEvent) -> Vec<OutgoingEvent> {
        let kind = event.kind();
        let out = match event {
            IncomingEvent::DidFinishGatheringLocal(set) => {
                self.local_snapshot = set;
                self.local_gathered = true;
                self.reconcile_if_gathered()
            }
            IncomingEvent::DidFinishGatheringCloud(set) => {
                self.cloud_snapshot = set;
                self.cloud_gathered = true;
                self.reconcile_if_gathered()
            }
            IncomingEvent::DidUpdateLocal(set) => self.diff_local(set),
            IncomingEvent::DidUpdateCloud(set) => self.diff_cloud(set),
        };

        debug!(event = kind, actions = out.len(), "Resolved incoming event");
        out
    }

    // ========================================================================
    // Initial reconciliation
    // ========================================================================

    /// Runs the full reconciliation once both sides have gathered
    ///
    /// Quiescence rule: gathering events return nothing until the pair is
    /// complete. A later re-gather (monitor restart) re-runs the full
    /// reconciliation, which is a no-op in steady state.
    fn reconcile_if_gathered(&mut self) -> Vec<OutgoingEvent> {
        if !(self.local_gathered && self.cloud_gathered) {
            return Vec::new();
        }

        let was_initial = self.is_initial_sync;
        let mut out = Vec::new();

        match (self.local_snapshot.is_empty(), self.cloud_snapshot.is_empty()) {
            (true, true) => {}
            (true, false) => {
                let cloud = self.cloud_snapshot.clone();
                out.extend(self.diff_cloud(cloud));
            }
            (false, true) => {
                let local = self.local_snapshot.clone();
                out.extend(self.diff_local(local));
            }
            (false, false) => {
                if was_initial {
                    out.extend(self.initial_conflict_pass());
                }
                let cloud = self.cloud_snapshot.clone();
                out.extend(self.diff_cloud(cloud));
                let local = self.local_snapshot.clone();
                out.extend(self.diff_local(local));
            }
        }

        if was_initial {
            out.push(OutgoingEvent::DidFinishInitialSync);
            self.is_initial_sync = false;
        }

        out
    }

    /// Schedules preservation of every local item whose name also exists
    /// on the cloud side (either tier)
    ///
    /// These are the only items at risk of data loss during the first-ever
    /// sync: the incremental diffs that follow may overwrite or remove the
    /// local copy, so it is renamed aside first and re-enters as a fresh
    /// cloud creation.
    fn initial_conflict_pass(&self) -> Vec<OutgoingEvent> {
        self.local_snapshot
            .iter()
            .filter(|local| self.cloud_snapshot.contains_name(&local.name))
            .map(|local| OutgoingEvent::ResolveInitialSyncConflict(local.clone()))
            .collect()
    }

    // ========================================================================
    // Local-side diff
    // ========================================================================

    /// Diffs a fresh local snapshot against the retained state
    ///
    /// Produces, over the local namespace:
    /// - removals: names present before but gone now (previous item as
    ///   payload)
    /// - creations: names with no cloud twin, or whose only twin is a
    ///   strictly older trash entry
    /// - updates: names whose live cloud twin is strictly older; skipped
    ///   entirely during initial sync, because the initial-conflict pass
    ///   owns those names until the local copy is preserved
    ///
    /// Commits `local_snapshot` unconditionally.
    fn diff_local(&mut self, new_local: LocalSet) -> Vec<OutgoingEvent> {
        let mut removals = Vec::new();
        let mut creations = Vec::new();
        let mut updates = Vec::new();

        for previous in self.local_snapshot.iter() {
            if !new_local.contains(&previous.name) {
                removals.push(OutgoingEvent::RemoveCloud(previous.clone()));
            }
        }

        for local in new_local.iter() {
            match self.cloud_snapshot.get_live(&local.name) {
                None => {
                    let create = match self.cloud_snapshot.get_trashed(&local.name) {
                        None => true,
                        Some(trash) => trash.modified_secs() < local.modified_secs(),
                    };
                    if create {
                        creations.push(OutgoingEvent::CreateCloud(local.clone()));
                    }
                }
                Some(live) => {
                    if !self.is_initial_sync && live.modified_secs() < local.modified_secs() {
                        updates.push(OutgoingEvent::UpdateCloud(local.clone()));
                    }
                }
            }
        }

        self.local_snapshot = new_local;

        let mut out = removals;
        out.extend(creations);
        out.extend(updates);
        out
    }

    // ========================================================================
    // Cloud-side diff
    // ========================================================================

    /// Diffs a fresh cloud snapshot against the retained state
    ///
    /// Step order:
    /// 1. per-item errors become `DidReceiveError` (the diff continues)
    /// 2. any live item with unresolved conflicts short-circuits the batch
    ///    to `ResolveVersionsConflict` events, **without committing the
    ///    snapshot** — timestamps are meaningless until the version history
    ///    collapses, and the post-resolution metadata update re-enters this
    ///    diff cleanly
    /// 3. removals (trash-authoritative), creations and updates over the
    ///    cloud namespace
    /// 4. download gating: items whose bytes are not materialized only
    ///    produce `StartDownloading`; they graduate to concrete writes on a
    ///    later snapshot
    fn diff_cloud(&mut self, new_cloud: CloudSet) -> Vec<OutgoingEvent> {
        let mut out = Vec::new();

        // Step 1: error extraction
        for item in new_cloud.iter() {
            if let Some(err) = &item.downloading_error {
                out.push(OutgoingEvent::DidReceiveError(err.clone()));
            }
            if let Some(err) = &item.uploading_error {
                out.push(OutgoingEvent::DidReceiveError(err.clone()));
            }
        }

        // Step 2: unresolved-conflict extraction
        let conflicted: Vec<_> = new_cloud
            .live()
            .filter(|item| item.has_unresolved_conflicts)
            .collect();
        if !conflicted.is_empty() {
            out.extend(
                conflicted
                    .into_iter()
                    .map(|item| OutgoingEvent::ResolveVersionsConflict(item.clone())),
            );
            return out;
        }

        // Step 3: the three disjoint subsets of the cloud namespace
        let mut downloads = Vec::new();
        let mut removals = Vec::new();
        let mut creations = Vec::new();
        let mut updates = Vec::new();

        for trash in new_cloud.trashed() {
            if trash.has_unresolved_conflicts {
                continue;
            }
            // A strictly newer live twin means the file was re-created after
            // the deletion; the trash entry is not authoritative.
            let superseded = new_cloud
                .get_live(&trash.name)
                .is_some_and(|live| live.modified_secs() > trash.modified_secs());
            if superseded {
                continue;
            }
            let Some(local) = self.local_snapshot.get(&trash.name) else {
                continue;
            };
            // `<=` on purpose: an equal timestamp means the delete happened
            // at least as late as the local write, so the trash wins.
            if local.modified_secs() <= trash.modified_secs() && trash.is_downloaded {
                removals.push(OutgoingEvent::RemoveLocal(trash.clone()));
            }
        }

        for cloud in new_cloud.live() {
            match self.local_snapshot.get(&cloud.name) {
                None => {
                    if cloud.is_downloaded {
                        creations.push(OutgoingEvent::CreateLocal(cloud.clone()));
                    } else {
                        downloads.push(OutgoingEvent::StartDownloading(cloud.clone()));
                    }
                }
                Some(local) => {
                    // During initial sync a name match alone schedules the
                    // update: the local copy is already preserved under a
                    // new name by the initial-conflict pass.
                    let wants_update = self.is_initial_sync
                        || local.modified_secs() < cloud.modified_secs();
                    if wants_update {
                        if cloud.is_downloaded {
                            updates.push(OutgoingEvent::UpdateLocal(cloud.clone()));
                        } else {
                            downloads.push(OutgoingEvent::StartDownloading(cloud.clone()));
                        }
                    }
                }
            }
        }

        out.extend(downloads);
        out.extend(removals);
        out.extend(creations);
        out.extend(updates);

        self.cloud_snapshot = new_cloud;
        out
    }
}
