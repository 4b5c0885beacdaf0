//! Bounded FIFO log buffer.
//!
//! Log endpoints push entries forever; the buffer keeps the newest
//! [`LOG_CAPACITY`] and evicts the oldest first.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Constants
// ============================================================================

/// Maximum entries retained per log stream.
pub const LOG_CAPACITY: usize = 1000;

/// Display format for `formatted_timestamp`.
const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// ============================================================================
// LogEntry
// ============================================================================

/// A normalized log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 timestamp (or the server's string, if unparsable).
    pub timestamp: String,
    /// Local display timestamp.
    pub formatted_timestamp: String,
    /// Level name (`INFO`, `WARN`, ...).
    pub level: String,
    /// Emitting module.
    pub module: String,
    /// Log text.
    pub message: String,
    /// Any other fields the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogEntry {
    /// Normalizes a `log` / `log_entry` frame.
    ///
    /// Numeric timestamps are epoch milliseconds. A missing timestamp means
    /// "now".
    #[must_use]
    pub fn from_frame(frame: &Value) -> Self {
        let text = |key: &str| {
            frame
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let (timestamp, formatted_timestamp) = normalize_timestamp(frame.get("timestamp"));

        let extra = frame
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(k, _)| {
                        !matches!(
                            k.as_str(),
                            "type" | "timestamp" | "formatted_timestamp" | "level" | "module" | "message"
                        )
                    })
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            timestamp,
            formatted_timestamp,
            level: text("level"),
            module: text("module"),
            message: text("message"),
            extra,
        }
    }
}

/// Returns `(rfc3339, display)` for a raw timestamp value.
fn normalize_timestamp(raw: Option<&Value>) -> (String, String) {
    let parsed: Option<DateTime<Utc>> = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => Some(Utc::now()),
    };

    match (parsed, raw) {
        (Some(dt), Some(Value::String(s))) => (s.clone(), display(dt)),
        (Some(dt), _) => (dt.to_rfc3339(), display(dt)),
        (None, Some(Value::String(s))) => (s.clone(), s.clone()),
        (None, other) => {
            let raw = other.map(Value::to_string).unwrap_or_default();
            (raw.clone(), raw)
        }
    }
}

fn display(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

// ============================================================================
// LogBuffer
// ============================================================================

/// FIFO ring buffer of log entries.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    evicted: u64,
}

impl LogBuffer {
    /// Creates a buffer with the default capacity.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    /// Creates a buffer with a custom capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many entries have been evicted since creation or clear.
    #[inline]
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Returns the newest `n` entries, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Returns all entries, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
