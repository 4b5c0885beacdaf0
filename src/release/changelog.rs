//! Changelog entries and Markdown insertion.
//!
//! Entries are rendered as:
//!
//! ```text
//! ## [1.2.4] - 2025-09-20
//!
//! ### 🐛 修复 / Bug Fixes
//! - fix login
//! ```
//!
//! and inserted right after the first `## [x.y.z]` (or `## [vx.y.z]`)
//! heading of the file.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::version::BumpKind;

// ============================================================================
// CommitType
// ============================================================================

/// Conventional commit category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
    Ci,
    Build,
}

impl CommitType {
    /// Every type, in help-text order.
    pub const ALL: [CommitType; 10] = [
        Self::Feat,
        Self::Fix,
        Self::Docs,
        Self::Style,
        Self::Refactor,
        Self::Perf,
        Self::Test,
        Self::Chore,
        Self::Ci,
        Self::Build,
    ];

    /// Returns the short name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Ci => "ci",
            Self::Build => "build",
        }
    }

    /// Returns the bilingual section title.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Feat => "✨ 新功能 / New Features",
            Self::Fix => "🐛 修复 / Bug Fixes",
            Self::Docs => "📚 文档 / Documentation",
            Self::Style => "🎨 样式 / Style",
            Self::Refactor => "🔧 重构 / Refactoring",
            Self::Perf => "⚡ 性能 / Performance",
            Self::Test => "🧪 测试 / Tests",
            Self::Chore => "🔨 构建 / Build",
            Self::Ci => "🔄 CI / CI",
            Self::Build => "🏗️ 构建 / Build",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::invalid_argument(format!("unknown commit type: {s}")))
    }
}

/// Returns the section title for any type name.
///
/// Unknown names render as `name / NAME`.
#[must_use]
pub fn commit_type_title(name: &str) -> String {
    match name.parse::<CommitType>() {
        Ok(t) => t.title().to_string(),
        Err(_) => format!("{name} / {}", name.to_uppercase()),
    }
}

/// Returns the part of the title before ` / `.
#[must_use]
pub fn commit_type_short_title(name: &str) -> String {
    let title = commit_type_title(name);
    match title.split_once(" / ") {
        Some((short, _)) => short.to_string(),
        None => title,
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// Messages grouped by commit type, in first-seen type order.
///
/// Serializes as a JSON object `{type: [message, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    groups: Vec<(String, Vec<String>)>,
}

impl ChangeSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message under `kind`.
    pub fn push(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        let kind = kind.into();
        let message = message.into();
        match self.groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, messages)) => messages.push(message),
            None => self.groups.push((kind, vec![message])),
        }
    }

    /// Returns `true` if no message was added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates `(type, messages)` groups.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the `; `-joined `short title - message` summary.
    #[must_use]
    pub fn summary(&self) -> String {
        self.groups
            .iter()
            .flat_map(|(kind, messages)| {
                let short = commit_type_short_title(kind);
                messages.iter().map(move |m| format!("{short} - {m}"))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (kind, messages) in &self.groups {
            map.serialize_entry(kind, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // serde_json's preserve_order keeps the file's type order.
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut set = Self::new();
        for (kind, messages) in raw {
            let messages: Vec<String> = serde_json::from_value(messages).map_err(DeError::custom)?;
            set.groups.push((kind, messages));
        }
        Ok(set)
    }
}

// ============================================================================
// VersionEntry
// ============================================================================

/// One release in `version.json` and `CHANGELOG.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: BumpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Plain bullet list used when no typed changes were given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<Vec<String>>,
}

impl VersionEntry {
    /// Creates an entry from typed changes.
    ///
    /// An empty set falls back to a single `Version X released` line.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        date: impl Into<String>,
        kind: BumpKind,
        changes: ChangeSet,
    ) -> Self {
        let version = version.into();
        if changes.is_empty() {
            let line = format!("Version {version} released");
            return Self {
                version,
                date: date.into(),
                kind,
                changes: None,
                summary: None,
                changelog: Some(vec![line]),
            };
        }

        let summary = changes.summary();
        Self {
            version,
            date: date.into(),
            kind,
            changes: Some(changes),
            summary: Some(summary),
            changelog: None,
        }
    }

    /// Renders the Markdown section, including surrounding blank lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("\n\n## [{}] - {}\n", self.version, self.date);

        match (&self.changes, &self.changelog) {
            (Some(changes), _) => {
                for (kind, messages) in changes.iter().filter(|(_, m)| !m.is_empty()) {
                    out.push_str(&format!("\n### {}\n", commit_type_title(kind)));
                    for message in messages {
                        out.push_str(&format!("- {message}\n"));
                    }
                }
            }
            (None, Some(lines)) if !lines.is_empty() => {
                let bullets: Vec<String> = lines.iter().map(|l| format!("- {l}")).collect();
                out.push_str(&format!("\n{}\n", bullets.join("\n")));
            }
            _ => {}
        }

        out.push('\n');
        out
    }
}

// ============================================================================
// Insertion
// ============================================================================

/// Matches `## [1.2.3]` and `## [v1.2.3]`.
const HEADING_PATTERN: &str = r"## \[v?\d+\.\d+\.\d+\]";

/// Result of [`insert_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// New file content.
    Inserted(String),
    /// The version already has a heading.
    AlreadyPresent,
    /// The file has no `## [x.y.z]` heading to anchor on.
    NoHeading,
}

/// Returns `true` if `content` has a heading for `version`.
#[must_use]
pub fn has_version(content: &str, version: &str) -> bool {
    content.contains(&format!("## [{version}]")) || content.contains(&format!("## [v{version}]"))
}

/// Inserts `entry` after the line holding the first version heading.
///
/// # Errors
///
/// Returns [`Error::Changelog`] if the heading pattern fails to compile.
pub fn insert_entry(content: &str, entry: &VersionEntry) -> Result<Insertion> {
    if has_version(content, &entry.version) {
        return Ok(Insertion::AlreadyPresent);
    }

    let heading = Regex::new(HEADING_PATTERN).map_err(|e| Error::changelog(e.to_string()))?;
    Ok(match heading.find(content) {
        Some(heading) => {
            let at = content[heading.end()..]
                .find('\n')
                .map_or(content.len(), |offset| heading.end() + offset);
            let mut out = String::with_capacity(content.len() + 256);
            out.push_str(&content[..at]);
            out.push_str(&entry.render());
            out.push_str(&content[at..]);
            Insertion::Inserted(out)
        }
        None => Insertion::NoHeading,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = "# Changelog\n\n## [1.2.3] - 2025-01-19\n\n- initial\n";

    fn entry(version: &str) -> VersionEntry {
        let mut changes = ChangeSet::new();
        changes.push("fix", "fix login");
        changes.push("feat", "add register");
        changes.push("fix", "fix logout");
        VersionEntry::new(version, "2025-09-20", BumpKind::Patch, changes)
    }

    #[test]
    fn test_titles() {
        assert_eq!(commit_type_title("fix"), "🐛 修复 / Bug Fixes");
        assert_eq!(commit_type_title("wip"), "wip / WIP");
        assert_eq!(commit_type_short_title("feat"), "✨ 新功能");
        assert!("nope".parse::<CommitType>().is_err());
    }

    #[test]
    fn test_change_set_groups_in_first_seen_order() {
        let e = entry("1.2.4");
        let changes = e.changes.as_ref().unwrap();
        let kinds: Vec<&str> = changes.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec!["fix", "feat"]);
        assert_eq!(
            e.summary.as_deref(),
            Some("🐛 修复 - fix login; 🐛 修复 - fix logout; ✨ 新功能 - add register")
        );
    }

    #[test]
    fn test_change_set_json_shape() {
        let e = entry("1.2.4");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "patch");
        assert_eq!(json["changes"]["fix"][1], "fix logout");
        assert!(json.get("changelog").is_none());

        let back: VersionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_empty_changes_fall_back_to_plain_line() {
        let e = VersionEntry::new("2.0.0", "2025-09-20", BumpKind::Major, ChangeSet::new());
        assert_eq!(e.changelog, Some(vec!["Version 2.0.0 released".into()]));
        assert!(e.render().contains("\n- Version 2.0.0 released\n"));
    }

    #[test]
    fn test_insert_after_first_heading() {
        let Insertion::Inserted(out) = insert_entry(CHANGELOG, &entry("1.2.4")).unwrap() else {
            panic!("expected insertion");
        };
        let first = out.find("## [1.2.3]").unwrap();
        let new = out.find("## [1.2.4] - 2025-09-20").unwrap();
        assert!(new > first);
        assert!(out.contains("## [1.2.3] - 2025-01-19\n"));
        assert!(out.contains("### 🐛 修复 / Bug Fixes\n- fix login\n- fix logout\n"));
        assert!(out.ends_with("- initial\n"));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let Insertion::Inserted(once) = insert_entry(CHANGELOG, &entry("1.2.4")).unwrap() else {
            panic!("expected insertion");
        };
        assert_eq!(
            insert_entry(&once, &entry("1.2.4")).unwrap(),
            Insertion::AlreadyPresent
        );
    }

    #[test]
    fn test_v_prefixed_headings() {
        let content = "## [v1.2.3] - 2025-01-19\n";
        assert!(matches!(
            insert_entry(content, &entry("1.2.4")).unwrap(),
            Insertion::Inserted(_)
        ));
        assert_eq!(
            insert_entry("## [v1.2.4]\n", &entry("1.2.4")).unwrap(),
            Insertion::AlreadyPresent
        );
    }

    #[test]
    fn test_no_heading() {
        assert_eq!(
            insert_entry("# Changelog\n", &entry("1.0.1")).unwrap(),
            Insertion::NoHeading
        );
    }
}
