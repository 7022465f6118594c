//! Filesystem helpers shared by the adapters
//!
//! - Atomic writes: write-to-temp + rename so that readers (and the cloud
//!   sync daemon) never observe a partial file.
//! - Modification-time stamping: destinations are stamped to the source's
//!   mtime after the byte write completes, so the next metadata snapshot
//!   compares equal on both sides instead of bouncing an event back.
//! - Directory scans producing [`LocalSet`] snapshots filtered to the
//!   single accepted extension.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use ubisync_core::domain::item::{LocalItem, LocalSet};

/// Atomically writes `data` to `path` via a temp file in the same directory
pub async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent directory: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no file name: {}", path.display()))?;

    let tmp = parent.join(format!(".{file_name}.part"));
    tokio::fs::write(&tmp, data)
        .await
        .with_context(|| format!("write temp file: {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("rename into place: {}", path.display()))?;
    Ok(())
}

/// Stamps the file's modification time to `modified_at`
pub fn stamp_modified(path: &Path, modified_at: DateTime<Utc>) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("open for stamping: {}", path.display()))?;
    let mtime: SystemTime = modified_at.into();
    file.set_modified(mtime)
        .with_context(|| format!("stamp mtime: {}", path.display()))?;
    Ok(())
}

/// Scans `root` (non-recursively) into a [`LocalSet`] snapshot
///
/// Only regular files with the accepted extension (case-insensitive) are
/// included. Entries with unreadable metadata fail the scan; the monitor
/// surfaces that as a per-item error and retries on the next burst.
pub async fn scan_directory(root: &Path, extension: &str) -> Result<LocalSet> {
    let mut set = LocalSet::new();
    let mut entries = tokio::fs::read_dir(root)
        .await
        .with_context(|| format!("read directory: {}", root.display()))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("enumerate directory: {}", root.display()))?
    {
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("stat: {}", entry.path().display()))?;
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches_extension {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let modified: DateTime<Utc> = metadata
            .modified()
            .with_context(|| format!("mtime: {}", path.display()))?
            .into();
        let created: DateTime<Utc> = metadata
            .created()
            .map(Into::into)
            .unwrap_or(modified);

        let item = LocalItem::new(name, path.clone(), extension, created, modified)?
            .with_size(metadata.len());
        set.insert(item);
    }

    Ok(set)
}
