//! Version bump, changelog and backup tooling.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `atomic` | Temp-file-then-persist writes |
//! | `backup` | `CHANGELOG.md` backups and restore |
//! | `bump` | The release workflow and interactive change entry |
//! | `changelog` | Commit types, version entries, Markdown insertion |
//! | `manifest` | `package.json` and `version.json` |
//! | `version` | `x.y.z` parsing and bumping |

// ============================================================================
// Submodules
// ============================================================================

/// Crash-safe file writes.
pub mod atomic;

/// Changelog backups.
pub mod backup;

/// The release workflow.
pub mod bump;

/// Changelog entries.
pub mod changelog;

/// Project manifests.
pub mod manifest;

/// Semantic versions.
pub mod version;

// ============================================================================
// Re-exports
// ============================================================================

pub use atomic::write_atomic;
pub use backup::{BACKUP_DIR, BackupFile, BackupStore, CHANGELOG_FILE, LATEST, Restored};
pub use bump::{
    ChangeLine, ChangelogOutcome, DEFAULT_COMMIT_TYPE, GitOutcome, PUBLIC_CHANGELOG, Release,
    ReleaseOptions, ReleaseReport, VersionInfo, collect_changes, parse_change_line, version_info,
};
pub use changelog::{
    ChangeSet, CommitType, Insertion, VersionEntry, commit_type_short_title, commit_type_title,
    has_version, insert_entry,
};
pub use manifest::{ChangelogHistory, PACKAGE_JSON, PackageManifest, VERSION_JSON, VersionConfig};
pub use version::{BumpKind, Version, increment_version};
