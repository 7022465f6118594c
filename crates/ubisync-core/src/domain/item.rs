//! Per-file metadata records and snapshot sets
//!
//! A `LocalItem` describes one document in the local documents directory; a
//! `CloudItem` describes one document in the ubiquitous container, including
//! the cloud-only attributes (download state, trash tier, unresolved version
//! conflicts, per-item transfer errors). Both sides share the
//! [`MetadataItem`] accessor set; there is no subtype relation between them.
//!
//! ## Timestamp resolution
//!
//! Cross-side equality works on modification times truncated to whole
//! seconds ([`MetadataItem::modified_secs`]). The cloud layer and most
//! filesystems disagree below one second, so finer precision would make
//! every round trip look like a change. Items with equal truncated
//! `modified_at` are considered equal in time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// MetadataItem trait
// ============================================================================

/// Shared accessors for a file's metadata on either side
pub trait MetadataItem {
    /// File name including extension; unique key within its set
    fn name(&self) -> &str;

    /// Opaque path handle to the file
    fn url(&self) -> &Path;

    /// Byte count, absent when the file has not been stat'd yet
    fn size(&self) -> Option<u64>;

    /// Media-type tag; filtered upstream to a single accepted type
    fn content_type(&self) -> &str;

    /// Creation time
    fn created_at(&self) -> DateTime<Utc>;

    /// Modification time
    fn modified_at(&self) -> DateTime<Utc>;

    /// Modification time truncated to whole seconds
    ///
    /// All cross-side timestamp comparisons go through this accessor.
    fn modified_secs(&self) -> i64 {
        self.modified_at().timestamp()
    }
}

/// Validates a file name: non-empty and free of path separators
fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ============================================================================
// LocalItem
// ============================================================================

/// A document observed in the local documents directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalItem {
    /// File name including extension; unique key within the local set
    pub name: String,
    /// Path of the file on disk
    pub url: PathBuf,
    /// Byte count, if already stat'd
    pub size: Option<u64>,
    /// Media-type tag
    pub content_type: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Modification time
    pub modified_at: DateTime<Utc>,
}

impl LocalItem {
    /// Creates a local item record, validating the name
    pub fn new(
        name: impl Into<String>,
        url: PathBuf,
        content_type: impl Into<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            url,
            size: None,
            content_type: content_type.into(),
            created_at,
            modified_at,
        })
    }

    /// Sets the byte count
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

impl MetadataItem for LocalItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &Path {
        &self.url
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

// ============================================================================
// CloudItem
// ============================================================================

/// A document observed in the ubiquitous container
///
/// Superset of [`LocalItem`]: cloud metadata may advertise an item before
/// its bytes are present locally (`is_downloaded == false`), items under
/// the container's trash directory carry `is_in_trash`, and the cloud layer
/// reports concurrent-edit conflicts and per-item transfer errors inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudItem {
    /// File name including extension; unique key within its tier
    pub name: String,
    /// Path of the file inside the container
    pub url: PathBuf,
    /// Byte count, if known
    pub size: Option<u64>,
    /// Media-type tag
    pub content_type: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Modification time
    pub modified_at: DateTime<Utc>,
    /// True iff the full byte content is materialized in the container
    pub is_downloaded: bool,
    /// True iff the item's path lies under the container's trash directory
    pub is_in_trash: bool,
    /// True iff the cloud layer advertises more than one concurrent version
    pub has_unresolved_conflicts: bool,
    /// Per-item download error reported by the cloud layer
    pub downloading_error: Option<super::errors::SyncError>,
    /// Per-item upload error reported by the cloud layer
    pub uploading_error: Option<super::errors::SyncError>,
}

impl CloudItem {
    /// Creates a cloud item record, validating the name
    ///
    /// The record starts as a live, downloaded, conflict-free item; use the
    /// `with_*` builders to describe other states.
    pub fn new(
        name: impl Into<String>,
        url: PathBuf,
        content_type: impl Into<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            url,
            size: None,
            content_type: content_type.into(),
            created_at,
            modified_at,
            is_downloaded: true,
            is_in_trash: false,
            has_unresolved_conflicts: false,
            downloading_error: None,
            uploading_error: None,
        })
    }

    /// Sets the byte count
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Marks the item as not yet materialized locally
    pub fn with_not_downloaded(mut self) -> Self {
        self.is_downloaded = false;
        self
    }

    /// Marks the item as living under the container's trash directory
    pub fn with_in_trash(mut self) -> Self {
        self.is_in_trash = true;
        self
    }

    /// Marks the item as carrying unresolved concurrent versions
    pub fn with_unresolved_conflicts(mut self) -> Self {
        self.has_unresolved_conflicts = true;
        self
    }

    /// Attaches a per-item download error
    pub fn with_downloading_error(mut self, err: super::errors::SyncError) -> Self {
        self.downloading_error = Some(err);
        self
    }

    /// Attaches a per-item upload error
    pub fn with_uploading_error(mut self, err: super::errors::SyncError) -> Self {
        self.uploading_error = Some(err);
        self
    }
}

impl MetadataItem for CloudItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &Path {
        &self.url
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

// ============================================================================
// LocalSet
// ============================================================================

/// Snapshot of the local documents directory, keyed by file name
///
/// Iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSet {
    items: BTreeMap<String, LocalItem>,
}

impl LocalSet {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item, replacing any previous item with the same name
    pub fn insert(&mut self, item: LocalItem) -> Option<LocalItem> {
        self.items.insert(item.name.clone(), item)
    }

    /// Looks up an item by name
    pub fn get(&self, name: &str) -> Option<&LocalItem> {
        self.items.get(name)
    }

    /// Returns true if an item with this name is present
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Number of items in the snapshot
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the snapshot holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates items in name order
    pub fn iter(&self) -> impl Iterator<Item = &LocalItem> {
        self.items.values()
    }
}

impl FromIterator<LocalItem> for LocalSet {
    fn from_iter<T: IntoIterator<Item = LocalItem>>(iter: T) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

// ============================================================================
// CloudSet
// ============================================================================

/// Snapshot of the ubiquitous container, keyed by file name
///
/// The container has two tiers: live items and items under the trash
/// directory. A name may be present in both tiers at once (the live file
/// was re-created after an older copy was trashed); within each tier names
/// are unique. Cardinality and emptiness count both tiers. Iteration is in
/// name order, live items first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudSet {
    live: BTreeMap<String, CloudItem>,
    trashed: BTreeMap<String, CloudItem>,
}

impl CloudSet {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item into the tier indicated by its `is_in_trash` flag
    pub fn insert(&mut self, item: CloudItem) -> Option<CloudItem> {
        if item.is_in_trash {
            self.trashed.insert(item.name.clone(), item)
        } else {
            self.live.insert(item.name.clone(), item)
        }
    }

    /// Looks up the live item with this name
    pub fn get_live(&self, name: &str) -> Option<&CloudItem> {
        self.live.get(name)
    }

    /// Looks up the trashed item with this name
    pub fn get_trashed(&self, name: &str) -> Option<&CloudItem> {
        self.trashed.get(name)
    }

    /// Returns true if either tier holds an item with this name
    pub fn contains_name(&self, name: &str) -> bool {
        self.live.contains_key(name) || self.trashed.contains_key(name)
    }

    /// Number of items across both tiers
    pub fn len(&self) -> usize {
        self.live.len() + self.trashed.len()
    }

    /// True if both tiers are empty
    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.trashed.is_empty()
    }

    /// Iterates live items in name order
    pub fn live(&self) -> impl Iterator<Item = &CloudItem> {
        self.live.values()
    }

    /// Iterates trashed items in name order
    pub fn trashed(&self) -> impl Iterator<Item = &CloudItem> {
        self.trashed.values()
    }

    /// Iterates all items, live tier first
    pub fn iter(&self) -> impl Iterator<Item = &CloudItem> {
        self.live.values().chain(self.trashed.values())
    }
}

impl FromIterator<CloudItem> for CloudSet {
    fn from_iter<T: IntoIterator<Item = CloudItem>>(iter: T) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn local(name: &str, secs: i64) -> LocalItem {
        LocalItem::new(
            name,
            PathBuf::from(format!("/documents/{name}")),
            "kml",
            ts(secs),
            ts(secs),
        )
        .unwrap()
    }

    fn cloud(name: &str, secs: i64) -> CloudItem {
        CloudItem::new(
            name,
            PathBuf::from(format!("/container/{name}")),
            "kml",
            ts(secs),
            ts(secs),
        )
        .unwrap()
    }

    mod name_validation {
        use super::*;

        #[test]
        fn test_rejects_empty_name() {
            let err = LocalItem::new("", PathBuf::from("/d"), "kml", ts(0), ts(0)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidName(_)));
        }

        #[test]
        fn test_rejects_path_separators() {
            assert!(CloudItem::new("a/b.kml", PathBuf::from("/c"), "kml", ts(0), ts(0)).is_err());
            assert!(CloudItem::new("a\\b.kml", PathBuf::from("/c"), "kml", ts(0), ts(0)).is_err());
        }
    }

    mod timestamps {
        use super::*;

        #[test]
        fn test_modified_secs_truncates_to_whole_seconds() {
            let mut item = local("a.kml", 100);
            item.modified_at = DateTime::from_timestamp(100, 999_000_000).unwrap();
            assert_eq!(item.modified_secs(), 100);
        }

        #[test]
        fn test_sub_second_difference_is_equal_in_time() {
            let mut a = local("a.kml", 100);
            a.modified_at = DateTime::from_timestamp(100, 1_000_000).unwrap();
            let mut b = cloud("a.kml", 100);
            b.modified_at = DateTime::from_timestamp(100, 900_000_000).unwrap();
            assert_eq!(a.modified_secs(), b.modified_secs());
        }
    }

    mod local_set {
        use super::*;

        #[test]
        fn test_insert_and_get() {
            let mut set = LocalSet::new();
            assert!(set.insert(local("a.kml", 1)).is_none());
            assert!(set.contains("a.kml"));
            assert_eq!(set.get("a.kml").unwrap().modified_secs(), 1);
        }

        #[test]
        fn test_insert_replaces_same_name() {
            let mut set = LocalSet::new();
            set.insert(local("a.kml", 1));
            let previous = set.insert(local("a.kml", 2));
            assert_eq!(previous.unwrap().modified_secs(), 1);
            assert_eq!(set.len(), 1);
            assert_eq!(set.get("a.kml").unwrap().modified_secs(), 2);
        }

        #[test]
        fn test_iteration_is_name_ordered() {
            let set: LocalSet = [local("c.kml", 1), local("a.kml", 2), local("b.kml", 3)]
                .into_iter()
                .collect();
            let names: Vec<&str> = set.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["a.kml", "b.kml", "c.kml"]);
        }

        #[test]
        fn test_empty() {
            let set = LocalSet::new();
            assert!(set.is_empty());
            assert_eq!(set.len(), 0);
        }
    }

    mod cloud_set {
        use super::*;

        #[test]
        fn test_insert_routes_by_trash_flag() {
            let mut set = CloudSet::new();
            set.insert(cloud("a.kml", 1));
            set.insert(cloud("b.kml", 2).with_in_trash());

            assert!(set.get_live("a.kml").is_some());
            assert!(set.get_trashed("a.kml").is_none());
            assert!(set.get_live("b.kml").is_none());
            assert!(set.get_trashed("b.kml").is_some());
        }

        #[test]
        fn test_same_name_in_both_tiers() {
            let mut set = CloudSet::new();
            set.insert(cloud("a.kml", 5));
            set.insert(cloud("a.kml", 3).with_in_trash());

            assert_eq!(set.len(), 2);
            assert_eq!(set.get_live("a.kml").unwrap().modified_secs(), 5);
            assert_eq!(set.get_trashed("a.kml").unwrap().modified_secs(), 3);
        }

        #[test]
        fn test_cardinality_counts_trash() {
            let set: CloudSet = [
                cloud("a.kml", 1).with_in_trash(),
                cloud("b.kml", 2).with_in_trash(),
            ]
            .into_iter()
            .collect();
            assert!(!set.is_empty());
            assert_eq!(set.len(), 2);
            assert_eq!(set.live().count(), 0);
        }

        #[test]
        fn test_contains_name_checks_both_tiers() {
            let mut set = CloudSet::new();
            set.insert(cloud("t.kml", 1).with_in_trash());
            assert!(set.contains_name("t.kml"));
            assert!(!set.contains_name("other.kml"));
        }

        #[test]
        fn test_iter_live_first() {
            let mut set = CloudSet::new();
            set.insert(cloud("z.kml", 1).with_in_trash());
            set.insert(cloud("a.kml", 2));
            let names: Vec<&str> = set.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["a.kml", "z.kml"]);
        }
    }
}
