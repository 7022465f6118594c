//! Local document store adapter (secondary/driven adapter)
//!
//! Implements [`ILocalDocumentStore`] over the user's documents directory
//! using `tokio::fs`. Writes are atomic and stamp the destination's
//! modification time; removals distinguish a deleted file from a no-op.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::debug;

use ubisync_core::ports::local_store::ILocalDocumentStore;

use crate::fsutil;

/// Adapter that bridges [`ILocalDocumentStore`] to the real filesystem
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Creates a store rooted at the documents directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The documents directory this store operates on
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait::async_trait]
impl ILocalDocumentStore for FsDocumentStore {
    fn url_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.url_for(name)).await.unwrap_or(false)
    }

    async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.url_for(name);
        let data = tokio::fs::read(&path).await?;
        Ok(data)
    }

    async fn write(
        &self,
        name: &str,
        data: &[u8],
        modified_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.url_for(name);
        fsutil::atomic_write(&path, data).await?;
        fsutil::stamp_modified(&path, modified_at)?;
        debug!(name, bytes = data.len(), "Wrote local document");
        Ok(())
    }

    async fn remove(&self, name: &str) -> anyhow::Result<bool> {
        let path = self.url_for(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name, "Removed local document");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> anyhow::Result<()> {
        tokio::fs::rename(self.url_for(from), self.url_for(to)).await?;
        debug!(from, to, "Renamed local document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("documents"));

        store.write("a.kml", b"bytes", ts(100)).await.unwrap();

        assert!(store.exists("a.kml").await);
        assert_eq!(store.read("a.kml").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_write_stamps_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().to_path_buf());

        store.write("a.kml", b"x", ts(1_650_000_000)).await.unwrap();

        let modified: DateTime<Utc> = std::fs::metadata(store.url_for("a.kml"))
            .unwrap()
            .modified()
            .unwrap()
            .into();
        assert_eq!(modified.timestamp(), 1_650_000_000);
    }

    #[tokio::test]
    async fn test_remove_reports_whether_file_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().to_path_buf());

        store.write("a.kml", b"x", ts(1)).await.unwrap();
        assert!(store.remove("a.kml").await.unwrap());
        assert!(!store.remove("a.kml").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().to_path_buf());

        store.write("a.kml", b"x", ts(1)).await.unwrap();
        store.rename("a.kml", "a_1.kml").await.unwrap();

        assert!(!store.exists("a.kml").await);
        assert!(store.exists("a_1.kml").await);
    }
}
