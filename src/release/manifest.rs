//! `package.json` and `version.json` handling.
//!
//! Both files are edited in place: unknown fields survive a load/save cycle
//! in their original order.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::atomic::write_atomic;
use super::changelog::VersionEntry;

// ============================================================================
// Paths
// ============================================================================

/// `package.json` relative to the project root.
pub const PACKAGE_JSON: &str = "package.json";

/// `version.json` relative to the project root.
pub const VERSION_JSON: &str = "src/config/version.json";

fn read_json(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::version(format!("cannot read {}: {e}", path.display())))
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

// ============================================================================
// PackageManifest
// ============================================================================

/// A `package.json` document.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl PackageManifest {
    /// Loads `<root>/package.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] if the file is unreadable or not an object.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PACKAGE_JSON);
        let doc: Map<String, Value> = serde_json::from_str(&read_json(&path)?)
            .map_err(|e| Error::version(format!("invalid {}: {e}", path.display())))?;
        Ok(Self { path, doc })
    }

    /// Returns the `version` field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] if the field is missing.
    pub fn version(&self) -> Result<&str> {
        self.doc
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::version(format!("{} has no version", self.path.display())))
    }

    /// Sets the `version` field.
    pub fn set_version(&mut self, version: &str) {
        self.doc.insert("version".into(), Value::from(version));
    }

    /// Writes the document back.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the write fails.
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, &to_pretty(&self.doc)?)
    }
}

// ============================================================================
// VersionConfig
// ============================================================================

/// Release history block of `version.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogHistory {
    #[serde(default)]
    pub last_updated: String,
    /// Newest first.
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
    #[serde(default)]
    pub total_versions: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `version.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub build_time: String,
    #[serde(default)]
    pub changelog: ChangelogHistory,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionConfig {
    /// Loads `<root>/src/config/version.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] if the file is unreadable or malformed.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(VERSION_JSON);
        serde_json::from_str(&read_json(&path)?)
            .map_err(|e| Error::version(format!("invalid {}: {e}", path.display())))
    }

    /// Writes `<root>/src/config/version.json`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the write fails.
    pub fn save(&self, root: &Path) -> Result<()> {
        write_atomic(&root.join(VERSION_JSON), &to_pretty(self)?)
    }

    /// Records a new release at the head of the history.
    pub fn record(&mut self, entry: VersionEntry, date: &str, time: &str) {
        self.current = entry.version.clone();
        self.build_date = date.to_string();
        self.build_time = time.to_string();
        self.changelog.last_updated = date.to_string();
        self.changelog.versions.insert(0, entry);
        self.changelog.total_versions = self.changelog.versions.len();
    }
}

// ============================================================================
// Tests
// ============================================================================
