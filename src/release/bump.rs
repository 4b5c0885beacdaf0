//! The release workflow.
//!
//! [`Release::run`] performs, in order:
//!
//! | Step | Files | Skippable |
//! |------|-------|-----------|
//! | Bump version | `package.json` | no |
//! | Record history | `src/config/version.json` | no |
//! | Back up and update changelog | `CHANGELOG.md`, `public/CHANGELOG.md` | `--skip-changelog` |
//! | Commit and tag | git | `--skip-git` |
//!
//! Without messages, changes are read interactively as `<type> <message>`
//! lines until `done` (or `cancel`, which discards them).

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Local;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::atomic::write_atomic;
use super::backup::{BackupStore, CHANGELOG_FILE};
use super::changelog::{
    ChangeSet, CommitType, Insertion, VersionEntry, commit_type_short_title, insert_entry,
};
use super::manifest::{PackageManifest, VersionConfig};
use super::version::{BumpKind, increment_version};

/// Type used for `-m` messages without a matching `-t`.
pub const DEFAULT_COMMIT_TYPE: &str = "chore";

/// Public copy of the changelog relative to the project root.
pub const PUBLIC_CHANGELOG: &str = "public/CHANGELOG.md";

// ============================================================================
// Options / Report
// ============================================================================

/// Release parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    pub kind: BumpKind,
    /// Change messages; empty means collect interactively.
    pub messages: Vec<String>,
    /// Commit type for each message, by position.
    pub commit_types: Vec<String>,
    pub skip_changelog: bool,
    pub skip_git: bool,
}

impl ReleaseOptions {
    /// Creates options for `kind` with nothing skipped.
    #[must_use]
    pub fn new(kind: BumpKind) -> Self {
        Self {
            kind,
            messages: Vec::new(),
            commit_types: Vec::new(),
            skip_changelog: false,
            skip_git: false,
        }
    }

    /// Groups `messages` by their positional `commit_types`.
    #[must_use]
    pub fn change_set(&self) -> ChangeSet {
        let mut set = ChangeSet::new();
        for (i, message) in self.messages.iter().enumerate() {
            let kind = self
                .commit_types
                .get(i)
                .map_or(DEFAULT_COMMIT_TYPE, String::as_str);
            set.push(kind, message.clone());
        }
        set
    }
}

/// What happened to the changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogOutcome {
    Skipped,
    /// `CHANGELOG.md` does not exist.
    Missing,
    AlreadyPresent,
    NoHeading,
    Updated { backup: PathBuf },
    /// The update failed; the previous file is intact.
    Failed(String),
}

/// What happened in git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome {
    Skipped,
    Tagged(String),
    Failed(String),
}

/// Summary of a finished release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub previous: String,
    pub version: String,
    pub entry: VersionEntry,
    pub changelog: ChangelogOutcome,
    pub git: GitOutcome,
}

// ============================================================================
// Interactive Input
// ============================================================================

/// One parsed interactive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeLine {
    Done,
    Cancel,
    Change(CommitType, String),
}

/// Parses `done`, `cancel` or `<type> <message>`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for malformed lines or unknown types.
pub fn parse_change_line(line: &str) -> Result<ChangeLine> {
    let trimmed = line.trim();
    match trimmed {
        "done" => return Ok(ChangeLine::Done),
        "cancel" => return Ok(ChangeLine::Cancel),
        _ => {}
    }

    let Some((kind, message)) = trimmed.split_once(char::is_whitespace) else {
        return Err(Error::invalid_argument("expected <type> <message>"));
    };
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::invalid_argument("expected <type> <message>"));
    }

    Ok(ChangeLine::Change(kind.parse()?, message.to_string()))
}

/// Reads changes from `input` until `done`, `cancel` or end of input.
///
/// Prompts and feedback go to `output`. `cancel` returns an empty set.
///
/// # Errors
///
/// Returns an IO error if reading or writing fails.
pub fn collect_changes<R: BufRead, W: Write>(input: R, mut output: W) -> Result<ChangeSet> {
    let types: Vec<&str> = CommitType::ALL.iter().map(CommitType::as_str).collect();
    writeln!(output, "Add changes as <type> <message>, e.g. `fix login crash`")?;
    writeln!(output, "Types: {}", types.join(", "))?;
    writeln!(output, "Type `done` to finish or `cancel` to discard")?;

    let mut changes = ChangeSet::new();
    let mut lines = input.lines();

    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match parse_change_line(&line?) {
            Ok(ChangeLine::Done) => break,
            Ok(ChangeLine::Cancel) => return Ok(ChangeSet::new()),
            Ok(ChangeLine::Change(kind, message)) => {
                writeln!(
                    output,
                    "Added: {} - {message}",
                    commit_type_short_title(kind.as_str())
                )?;
                changes.push(kind.as_str(), message);
            }
            Err(e) => writeln!(output, "{e}")?,
        }
    }

    Ok(changes)
}

// ============================================================================
// Release
// ============================================================================

/// A release of the project rooted at `root`.
#[derive(Debug, Clone)]
pub struct Release {
    root: PathBuf,
    options: ReleaseOptions,
}

impl Release {
    /// Creates a release.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, options: ReleaseOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Returns the project root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the release, prompting on stdin when no messages were given.
    ///
    /// # Errors
    ///
    /// See [`run_with_input`](Self::run_with_input).
    pub fn run(&self) -> Result<ReleaseReport> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.run_with_input(stdin.lock(), stdout.lock())
    }

    /// Runs the release, reading interactive changes from `input`.
    ///
    /// Changelog and git failures are reported in the returned
    /// [`ReleaseReport`] rather than as errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] if the manifests cannot be read or the
    /// version cannot be bumped, or an IO error if they cannot be written.
    pub fn run_with_input<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<ReleaseReport> {
        let kind = self.options.kind;
        let mut package = PackageManifest::load(&self.root)?;
        let mut config = VersionConfig::load(&self.root)?;

        let previous = package.version()?.to_string();
        let version = increment_version(&previous, kind)?;
        info!(%previous, %version, %kind, "Bumping version");

        let changes = if self.options.messages.is_empty() {
            collect_changes(input, output)?
        } else {
            self.options.change_set()
        };

        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M:%S").to_string();
        let entry = VersionEntry::new(&version, &date, kind, changes);

        package.set_version(&version);
        package.save()?;

        config.record(entry.clone(), &date, &time);
        config.save(&self.root)?;

        let changelog = if self.options.skip_changelog {
            ChangelogOutcome::Skipped
        } else {
            self.update_changelog(&entry)
        };

        let git = if self.options.skip_git {
            GitOutcome::Skipped
        } else {
            match self.commit_and_tag(&version) {
                Ok(tag) => GitOutcome::Tagged(tag),
                Err(e) => {
                    warn!("Git step failed: {e}");
                    GitOutcome::Failed(e.to_string())
                }
            }
        };

        Ok(ReleaseReport {
            previous,
            version,
            entry,
            changelog,
            git,
        })
    }

    fn update_changelog(&self, entry: &VersionEntry) -> ChangelogOutcome {
        let path = self.root.join(CHANGELOG_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "No changelog, skipping update");
            return ChangelogOutcome::Missing;
        }

        match self.try_update_changelog(&path, entry) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Changelog update failed, previous file kept: {e}");
                ChangelogOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_update_changelog(&self, path: &Path, entry: &VersionEntry) -> Result<ChangelogOutcome> {
        let content = fs::read_to_string(path)?;
        let backup = BackupStore::new(&self.root).create(&content)?;

        match insert_entry(&content, entry)? {
            Insertion::AlreadyPresent => {
                warn!(version = %entry.version, "Version already in changelog");
                Ok(ChangelogOutcome::AlreadyPresent)
            }
            Insertion::NoHeading => {
                warn!("No `## [x.y.z]` heading to insert after");
                Ok(ChangelogOutcome::NoHeading)
            }
            Insertion::Inserted(updated) => {
                write_atomic(path, &updated)?;
                write_atomic(&self.root.join(PUBLIC_CHANGELOG), &updated)?;
                info!(version = %entry.version, "Changelog updated");
                Ok(ChangelogOutcome::Updated { backup })
            }
        }
    }

    fn commit_and_tag(&self, version: &str) -> Result<String> {
        let tag = format!("v{version}");
        self.git(&["add", "."])?;
        self.git(&["commit", "-m", &format!("chore: release {tag}")])?;
        self.git(&["tag", &tag])?;
        info!(%tag, "Git tag created");
        Ok(tag)
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let command = args.first().copied().unwrap_or_default();
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::git(command, e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::git(
                command,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

// ============================================================================
// Version Info
// ============================================================================

/// Snapshot shown by `maicraft-version info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub name: String,
    pub build_date: String,
    pub last_updated: String,
    pub total_versions: usize,
}

/// Reads the current version information of the project at `root`.
///
/// # Errors
///
/// Returns [`Error::Version`] if either manifest cannot be read.
pub fn version_info(root: &Path) -> Result<VersionInfo> {
    let package = PackageManifest::load(root)?;
    let config = VersionConfig::load(root)?;
    Ok(VersionInfo {
        version: package.version()?.to_string(),
        name: config.name,
        build_date: config.build_date,
        last_updated: config.changelog.last_updated,
        total_versions: config.changelog.total_versions,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn test_parse_change_line() {
        assert_eq!(parse_change_line(" done ").unwrap(), ChangeLine::Done);
        assert_eq!(parse_change_line("cancel").unwrap(), ChangeLine::Cancel);
        assert_eq!(
            parse_change_line("fix  login crash").unwrap(),
            ChangeLine::Change(CommitType::Fix, "login crash".into())
        );
        assert!(parse_change_line("fix").is_err());
        assert!(parse_change_line("oops something").is_err());
    }

    #[test]
    fn test_collect_changes() {
        let input = Cursor::new("feat add map\nbogus\nfix crash\ndone\nfix ignored\n");
        let mut output = Vec::new();
        let changes = collect_changes(input, &mut output).unwrap();

        let groups: Vec<(&str, usize)> = changes.iter().map(|(k, m)| (k, m.len())).collect();
        assert_eq!(groups, vec![("feat", 1), ("fix", 1)]);
        assert!(String::from_utf8(output).unwrap().contains("unknown commit type: bogus"));
    }

    #[test]
    fn test_collect_changes_cancel() {
        let input = Cursor::new("feat add map\ncancel\n");
        let changes = collect_changes(input, std::io::sink()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_change_set_defaults_to_chore() {
        let mut options = ReleaseOptions::new(BumpKind::Patch);
        options.messages = vec!["a".into(), "b".into()];
        options.commit_types = vec!["fix".into()];

        let set = options.change_set();
        let groups: Vec<&str> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(groups, vec!["fix", DEFAULT_COMMIT_TYPE]);
    }
}
