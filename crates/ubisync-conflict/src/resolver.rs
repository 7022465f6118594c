//! Cloud version-conflict resolution
//!
//! When two devices write divergent versions of the same document, the
//! cloud layer advertises the item with unresolved conflicts and the
//! normal timestamp diffs are invalid until the history is collapsed.
//!
//! The [`VersionResolver`] collapses it keep-both style:
//! 1. enumerate the alternate versions and pick the latest by
//!    modification date,
//! 2. copy the current document aside under a [`CopyNamer`] name,
//! 3. replace the current content with the latest version,
//! 4. discard the remaining alternates.
//!
//! The preserved copy re-enters synchronization as an ordinary new
//! document on the next metadata snapshot.

use std::sync::Arc;

use tracing::{debug, info};

use ubisync_core::domain::item::CloudItem;
use ubisync_core::ports::cloud_container::{DocumentVersion, ICloudContainer};

use crate::error::ConflictError;
use crate::namer::CopyNamer;

/// Upper bound on copy-name probing before giving up
const MAX_NAME_PROBES: usize = 1_000;

/// Summary of one collapsed version conflict
#[derive(Debug, Clone)]
pub struct ResolvedVersions {
    /// Name the previous current version was preserved under
    pub preserved_as: String,
    /// The version promoted to current
    pub promoted: DocumentVersion,
    /// Number of alternate versions discarded
    pub discarded: usize,
}

/// Collapses concurrent document versions through the container port
pub struct VersionResolver {
    container: Arc<dyn ICloudContainer>,
}

impl VersionResolver {
    pub fn new(container: Arc<dyn ICloudContainer>) -> Self {
        Self { container }
    }

    /// Resolves the version conflict advertised on `item`
    ///
    /// # Errors
    /// Fails when the cloud layer lists no alternate versions, when no
    /// unused preserved-copy name can be found, or when a file operation
    /// fails. The caller retries implicitly: the item keeps advertising
    /// the conflict until a resolution succeeds.
    pub async fn resolve(&self, item: &CloudItem) -> Result<ResolvedVersions, ConflictError> {
        let versions = self
            .container
            .list_conflict_versions(&item.url)
            .await
            .map_err(|e| ConflictError::ResolutionFailed(format!("list versions: {e}")))?;

        let latest = versions
            .iter()
            .max_by_key(|v| v.modified_at)
            .cloned()
            .ok_or_else(|| ConflictError::NoVersions(item.name.clone()))?;

        debug!(
            name = %item.name,
            alternates = versions.len(),
            promoted = %latest.id,
            "Collapsing version conflict"
        );

        let preserved_as = self.preserve_current(item).await?;

        self.container
            .replace_with_version(&item.url, &latest)
            .await
            .map_err(|e| ConflictError::ResolutionFailed(format!("replace with version: {e}")))?;

        self.container
            .clear_conflict_versions(&item.url)
            .await
            .map_err(|e| ConflictError::ResolutionFailed(format!("clear versions: {e}")))?;

        info!(
            name = %item.name,
            preserved_as = %preserved_as,
            discarded = versions.len(),
            "Version conflict resolved"
        );

        Ok(ResolvedVersions {
            preserved_as,
            promoted: latest,
            discarded: versions.len(),
        })
    }

    /// Copies the current document aside under the first unused copy name
    async fn preserve_current(&self, item: &CloudItem) -> Result<String, ConflictError> {
        let parent = item.url.parent().ok_or_else(|| {
            ConflictError::ResolutionFailed(format!("no parent directory: {}", item.url.display()))
        })?;

        for candidate in CopyNamer::candidates(&item.name).take(MAX_NAME_PROBES) {
            let candidate_url = parent.join(&candidate);
            let taken = self
                .container
                .exists(&candidate_url)
                .await
                .map_err(|e| ConflictError::ResolutionFailed(format!("probe copy name: {e}")))?;
            if taken {
                continue;
            }

            self.container
                .copy(&item.url, &candidate_url)
                .await
                .map_err(|e| ConflictError::ResolutionFailed(format!("preserve copy: {e}")))?;
            return Ok(candidate);
        }

        Err(ConflictError::NamingExhausted(item.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn conflicted_item(name: &str) -> CloudItem {
        CloudItem::new(
            name,
            PathBuf::from(format!("/container/{name}")),
            "kml",
            ts(10),
            ts(10),
        )
        .unwrap()
        .with_unresolved_conflicts()
    }

    /// Container fake recording the operations the resolver performs
    struct FakeContainer {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        versions: Mutex<Vec<DocumentVersion>>,
        replaced_with: Mutex<Option<String>>,
        cleared: Mutex<bool>,
    }

    impl FakeContainer {
        fn new(versions: Vec<DocumentVersion>) -> Self {
            let mut files = HashMap::new();
            files.insert(PathBuf::from("/container/trip.kml"), b"current".to_vec());
            Self {
                files: Mutex::new(files),
                versions: Mutex::new(versions),
                replaced_with: Mutex::new(None),
                cleared: Mutex::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl ICloudContainer for FakeContainer {
        async fn container_url(&self) -> anyhow::Result<PathBuf> {
            Ok(PathBuf::from("/container"))
        }

        async fn read(&self, url: &Path) -> anyhow::Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("not found"))
        }

        async fn write(
            &self,
            url: &Path,
            data: &[u8],
            _modified_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(url.to_path_buf(), data.to_vec());
            Ok(())
        }

        async fn copy(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
            let mut files = self.files.lock().unwrap();
            let data = files
                .get(from)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("source not found"))?;
            files.insert(to.to_path_buf(), data);
            Ok(())
        }

        async fn remove(&self, url: &Path) -> anyhow::Result<()> {
            self.files.lock().unwrap().remove(url);
            Ok(())
        }

        async fn exists(&self, url: &Path) -> anyhow::Result<bool> {
            Ok(self.files.lock().unwrap().contains_key(url))
        }

        async fn trash_entry(&self, _name: &str) -> anyhow::Result<Option<PathBuf>> {
            Ok(None)
        }

        async fn move_to_trash(&self, _url: &Path) -> anyhow::Result<()> {
            Ok(())
        }

        async fn start_download(&self, _item: &CloudItem) -> anyhow::Result<()> {
            Ok(())
        }

        async fn list_conflict_versions(
            &self,
            _url: &Path,
        ) -> anyhow::Result<Vec<DocumentVersion>> {
            Ok(self.versions.lock().unwrap().clone())
        }

        async fn replace_with_version(
            &self,
            _url: &Path,
            version: &DocumentVersion,
        ) -> anyhow::Result<()> {
            *self.replaced_with.lock().unwrap() = Some(version.id.clone());
            Ok(())
        }

        async fn clear_conflict_versions(&self, _url: &Path) -> anyhow::Result<()> {
            *self.cleared.lock().unwrap() = true;
            Ok(())
        }
    }

    fn version(id: &str, secs: i64) -> DocumentVersion {
        DocumentVersion {
            id: id.to_string(),
            modified_at: ts(secs),
        }
    }

    #[tokio::test]
    async fn test_resolve_promotes_latest_version() {
        let container = Arc::new(FakeContainer::new(vec![
            version("v1", 5),
            version("v3", 20),
            version("v2", 12),
        ]));
        let resolver = VersionResolver::new(container.clone());

        let result = resolver.resolve(&conflicted_item("trip.kml")).await.unwrap();

        assert_eq!(result.promoted.id, "v3");
        assert_eq!(result.discarded, 3);
        assert_eq!(
            container.replaced_with.lock().unwrap().as_deref(),
            Some("v3")
        );
        assert!(*container.cleared.lock().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_preserves_current_copy() {
        let container = Arc::new(FakeContainer::new(vec![version("v1", 5)]));
        let resolver = VersionResolver::new(container.clone());

        let result = resolver.resolve(&conflicted_item("trip.kml")).await.unwrap();

        assert_eq!(result.preserved_as, "trip_1.kml");
        let files = container.files.lock().unwrap();
        assert_eq!(
            files.get(Path::new("/container/trip_1.kml")).unwrap(),
            b"current"
        );
    }

    #[tokio::test]
    async fn test_resolve_probes_past_taken_copy_names() {
        let container = Arc::new(FakeContainer::new(vec![version("v1", 5)]));
        container.files.lock().unwrap().insert(
            PathBuf::from("/container/trip_1.kml"),
            b"already there".to_vec(),
        );
        let resolver = VersionResolver::new(container.clone());

        let result = resolver.resolve(&conflicted_item("trip.kml")).await.unwrap();

        assert_eq!(result.preserved_as, "trip_2.kml");
    }

    #[tokio::test]
    async fn test_resolve_fails_without_versions() {
        let container = Arc::new(FakeContainer::new(Vec::new()));
        let resolver = VersionResolver::new(container);

        let err = resolver
            .resolve(&conflicted_item("trip.kml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::NoVersions(name) if name == "trip.kml"));
    }
}
