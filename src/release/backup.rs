//! `CHANGELOG.md` backups.
//!
//! Every changelog update first copies the current file to
//! `backups/CHANGELOG.md.<timestamp>.bak` and `backups/CHANGELOG.md.latest.bak`.
//! A restore copies the current file to `CHANGELOG.md.emergency.<ms>` before
//! overwriting it.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::atomic::write_atomic;

// ============================================================================
// Constants
// ============================================================================

/// Backup directory relative to the project root.
pub const BACKUP_DIR: &str = "backups";

/// Changelog file name relative to the project root.
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Name accepted by [`BackupStore::restore`] for the most recent backup.
pub const LATEST: &str = "latest";

const PREFIX: &str = "CHANGELOG.md.";
const SUFFIX: &str = ".bak";

// ============================================================================
// BackupFile
// ============================================================================

/// One file in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub name: String,
    pub path: PathBuf,
    /// The part between `CHANGELOG.md.` and `.bak`.
    pub timestamp: String,
}

impl BackupFile {
    /// Returns `true` for the `latest` shortcut file.
    #[inline]
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.timestamp == LATEST
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    /// Backup that was copied over the changelog.
    pub source: PathBuf,
    /// Copy of the changelog taken before the restore, if one existed.
    pub emergency: Option<PathBuf>,
}

// ============================================================================
// BackupStore
// ============================================================================

/// Backups of one project's changelog.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    target: PathBuf,
}

impl BackupStore {
    /// Creates a store for `<root>/CHANGELOG.md` backed up into `<root>/backups`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(BACKUP_DIR),
            target: root.join(CHANGELOG_FILE),
        }
    }

    /// Returns the backup directory.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the changelog path.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Writes a timestamped backup of `content` and refreshes `latest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backup`] if either file cannot be written.
    pub fn create(&self, content: &str) -> Result<PathBuf> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let path = self.dir.join(format!("{PREFIX}{timestamp}{SUFFIX}"));

        write_atomic(&path, content)
            .map_err(|e| Error::backup(format!("cannot write {}: {e}", path.display())))?;
        let latest = self.latest_path();
        write_atomic(&latest, content)
            .map_err(|e| Error::backup(format!("cannot write {}: {e}", latest.display())))?;

        info!(backup = %path.display(), "Changelog backup created");
        Ok(path)
    }

    /// Lists backups, newest first.
    ///
    /// The `latest` shortcut sorts ahead of timestamped files. A missing
    /// backup directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<BackupFile>> {
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "No backup directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(timestamp) = name
                .strip_prefix(PREFIX)
                .and_then(|rest| rest.strip_suffix(SUFFIX))
            {
                files.push(BackupFile {
                    timestamp: timestamp.to_string(),
                    path: entry.path(),
                    name,
                });
            }
        }

        files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(files)
    }

    /// Restores the changelog from `name`, or from the newest backup when
    /// `name` is `"latest"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backup`] if the backup does not exist or the
    /// restore fails.
    pub fn restore(&self, name: &str) -> Result<Restored> {
        let source = if name == LATEST {
            self.latest_path()
        } else {
            self.list()?
                .into_iter()
                .find(|b| b.name == name)
                .map(|b| b.path)
                .ok_or_else(|| Error::backup(format!("backup not found: {name}")))?
        };

        let content = fs::read_to_string(&source)
            .map_err(|e| Error::backup(format!("cannot read {}: {e}", source.display())))?;

        let emergency = if self.target.exists() {
            let current = fs::read_to_string(&self.target)?;
            let path = PathBuf::from(format!(
                "{}.emergency.{}",
                self.target.display(),
                Utc::now().timestamp_millis()
            ));
            write_atomic(&path, &current)?;
            info!(emergency = %path.display(), "Emergency copy created");
            Some(path)
        } else {
            None
        };

        write_atomic(&self.target, &content)
            .map_err(|e| Error::backup(format!("restore failed: {e}")))?;
        info!(from = %source.display(), "Changelog restored");

        Ok(Restored { source, emergency })
    }

    fn latest_path(&self) -> PathBuf {
        self.dir.join(format!("{PREFIX}{LATEST}{SUFFIX}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BackupStore::new(dir.path()).list().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let path = store.create("# Changelog\n").unwrap();
        fs::write(store.dir().join("CHANGELOG.md.2020-01-01T00-00-00.bak"), "old").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let files = store.list().unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].is_latest());
        assert_eq!(files[1].path, path);
        assert_eq!(files[2].timestamp, "2020-01-01T00-00-00");
    }

    #[test]
    fn test_restore_latest_with_emergency_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        store.create("backed up").unwrap();
        fs::write(store.target(), "broken").unwrap();

        let restored = store.restore(LATEST).unwrap();
        assert_eq!(fs::read_to_string(store.target()).unwrap(), "backed up");

        let emergency = restored.emergency.unwrap();
        assert_eq!(fs::read_to_string(emergency).unwrap(), "broken");
    }

    #[test]
    fn test_restore_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("CHANGELOG.md.2020-01-01T00-00-00.bak"), "old").unwrap();

        let restored = store.restore("CHANGELOG.md.2020-01-01T00-00-00.bak").unwrap();
        assert!(restored.emergency.is_none());
        assert_eq!(fs::read_to_string(store.target()).unwrap(), "old");
    }

    #[test]
    fn test_restore_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());
        assert!(matches!(
            store.restore("../etc/passwd"),
            Err(Error::Backup { .. })
        ));
        assert!(matches!(store.restore(LATEST), Err(Error::Backup { .. })));
    }
}
