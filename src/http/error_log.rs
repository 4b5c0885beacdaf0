//! In-memory error log.
//!
//! [`ErrorReporter`] classifies failures by level and kind, keeps the newest
//! `max_errors_in_memory` records, logs them through `tracing` and notifies
//! registered callbacks.

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::identifiers::{ErrorId, HandlerId};
use crate::transport::{HandlerList, now_ms};

use super::error::{ApiError, ErrorCode};

// ============================================================================
// Constants
// ============================================================================

/// Default cap on stored records.
pub const DEFAULT_MAX_ERRORS: usize = 100;

// ============================================================================
// Level / Kind
// ============================================================================

/// Severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// Does not affect main functionality.
    Low,
    /// May affect part of the functionality.
    Medium,
    /// Seriously affects functionality.
    High,
    /// May take the application down.
    Critical,
}

impl ErrorLevel {
    /// All levels, least severe first.
    pub const ALL: [ErrorLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Level for an API failure with `code`.
    #[must_use]
    pub fn for_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationError | ErrorCode::InvalidParameter => Self::Low,
            ErrorCode::SubscriptionError
            | ErrorCode::GameStateError
            | ErrorCode::EnvironmentError => Self::High,
            ErrorCode::InternalError => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        })
    }
}

/// What failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Api,
    Validation,
    Permission,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// All kinds.
    pub const ALL: [ErrorKind; 6] = [
        Self::Network,
        Self::Api,
        Self::Validation,
        Self::Permission,
        Self::Timeout,
        Self::Unknown,
    ];

    /// Kind for an API failure with `code`.
    #[must_use]
    pub fn for_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::NetworkError | ErrorCode::ConnectionError => Self::Network,
            ErrorCode::TimeoutError => Self::Timeout,
            ErrorCode::AuthenticationError | ErrorCode::PermissionDenied => Self::Permission,
            ErrorCode::ValidationError | ErrorCode::InvalidParameter => Self::Validation,
            _ => Self::Api,
        }
    }
}

// ============================================================================
// ErrorRecord
// ============================================================================

/// One logged failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: ErrorId,
    pub timestamp: i64,
    pub level: ErrorLevel,
    pub kind: ErrorKind,
    /// Technical message.
    pub message: String,
    /// End-user message.
    pub user_message: String,
    /// Request context and error metadata.
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ErrorRecord {
    /// Creates a record stamped now.
    #[must_use]
    pub fn new(
        level: ErrorLevel,
        kind: ErrorKind,
        message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            id: ErrorId::generate(),
            timestamp: now_ms(),
            level,
            kind,
            message: message.into(),
            user_message: user_message.into(),
            context: Map::new(),
        }
    }

    /// Adds context fields.
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context.extend(context);
        self
    }
}

// ============================================================================
// Config / Stats
// ============================================================================

/// Reporter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Emit a `tracing` event per stored record.
    pub enable_logging: bool,
    /// Stored record cap; older records are dropped first.
    pub max_errors_in_memory: usize,
    /// Records below this level are discarded.
    pub min_level: ErrorLevel,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            max_errors_in_memory: DEFAULT_MAX_ERRORS,
            min_level: ErrorLevel::Medium,
        }
    }
}

/// Counts over the stored records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub by_level: BTreeMap<ErrorLevel, usize>,
    pub by_kind: BTreeMap<ErrorKind, usize>,
}

/// Callback invoked for every stored record.
pub type ErrorCallback = dyn Fn(&ErrorRecord) + Send + Sync;

// ============================================================================
// ErrorReporter
// ============================================================================

/// Bounded, classified error log.
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Default)]
pub struct ErrorReporter {
    config: RwLock<ReporterConfig>,
    records: Mutex<VecDeque<ErrorRecord>>,
    callbacks: HandlerList<ErrorCallback>,
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("config", &*self.config.read())
            .field("records", &self.records.lock().len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ErrorReporter {
    /// Creates a reporter.
    #[must_use]
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            config: RwLock::new(config),
            records: Mutex::new(VecDeque::new()),
            callbacks: HandlerList::default(),
        }
    }

    /// Returns the current config.
    #[must_use]
    pub fn config(&self) -> ReporterConfig {
        self.config.read().clone()
    }

    /// Replaces the config, trimming stored records to the new cap.
    pub fn update_config(&self, config: ReporterConfig) {
        let cap = config.max_errors_in_memory;
        *self.config.write() = config;

        let mut records = self.records.lock();
        while records.len() > cap {
            records.pop_front();
        }
    }
}

// ============================================================================
// ErrorReporter - Intake
// ============================================================================

impl ErrorReporter {
    /// Records a failed API call.
    ///
    /// Returns the stored record, or `None` if below the minimum level.
    pub fn handle_api_error(
        &self,
        err: &ApiError,
        context: Map<String, Value>,
    ) -> Option<ErrorRecord> {
        let level = ErrorLevel::for_code(&err.error_code);
        let kind = ErrorKind::for_code(&err.error_code);

        let mut record = ErrorRecord::new(level, kind, err.message.clone(), err.user_message())
            .with_context(context);
        record
            .context
            .insert("error_code".into(), Value::from(err.error_code.as_str()));
        if let Some(status) = err.status_code {
            record.context.insert("status_code".into(), Value::from(status));
        }
        if let Some(ref request_id) = err.request_id {
            record
                .context
                .insert("request_id".into(), Value::from(request_id.as_str()));
        }

        self.report(record)
    }

    /// Records a failure to reach the server.
    pub fn handle_network_error(
        &self,
        err: &ApiError,
        context: Map<String, Value>,
    ) -> Option<ErrorRecord> {
        let record = ErrorRecord::new(
            ErrorLevel::Medium,
            ErrorKind::Network,
            err.message.clone(),
            "Network connection failed, please check the network and retry",
        )
        .with_context(context);

        self.report(record)
    }

    /// Records an input validation failure.
    pub fn handle_validation_error(
        &self,
        message: &str,
        details: Map<String, Value>,
    ) -> Option<ErrorRecord> {
        let record = ErrorRecord::new(
            ErrorLevel::Low,
            ErrorKind::Validation,
            format!("Validation error: {message}"),
            message,
        )
        .with_context(details);

        self.report(record)
    }

    /// Stores, logs and dispatches a record at or above the minimum level.
    pub fn report(&self, record: ErrorRecord) -> Option<ErrorRecord> {
        let config = self.config();
        if record.level < config.min_level {
            return None;
        }

        {
            let mut records = self.records.lock();
            records.push_back(record.clone());
            while records.len() > config.max_errors_in_memory {
                records.pop_front();
            }
        }

        if config.enable_logging {
            log_record(&record);
        }

        for callback in self.callbacks.snapshot() {
            callback(&record);
        }

        Some(record)
    }
}

fn log_record(record: &ErrorRecord) {
    let kind = format!("{:?}", record.kind).to_lowercase();
    match record.level {
        ErrorLevel::Low => {
            debug!(id = %record.id, level = %record.level, kind, "{}", record.message);
        }
        ErrorLevel::Medium => {
            warn!(id = %record.id, level = %record.level, kind, "{}", record.message);
        }
        ErrorLevel::High | ErrorLevel::Critical => {
            error!(id = %record.id, level = %record.level, kind, "{}", record.message);
        }
    }
}

// ============================================================================
// ErrorReporter - Callbacks
// ============================================================================

impl ErrorReporter {
    /// Registers a callback for every stored record.
    pub fn add_callback<F>(&self, callback: F) -> HandlerId
    where
        F: Fn(&ErrorRecord) + Send + Sync + 'static,
    {
        self.callbacks.add(Arc::new(callback) as Arc<ErrorCallback>)
    }

    /// Removes a callback.
    pub fn remove_callback(&self, id: HandlerId) -> bool {
        self.callbacks.remove(id)
    }
}

// ============================================================================
// ErrorReporter - Queries
// ============================================================================

impl ErrorReporter {
    /// Returns every stored record, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Returns the newest `count` records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<ErrorRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(count);
        records.iter().skip(skip).cloned().collect()
    }

    /// Returns records at exactly `level`.
    #[must_use]
    pub fn by_level(&self, level: ErrorLevel) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    /// Returns records of `kind`.
    #[must_use]
    pub fn by_kind(&self, kind: ErrorKind) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the number of stored records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drops every stored record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Counts stored records by level and kind.
    #[must_use]
    pub fn stats(&self) -> ErrorStats {
        let mut stats = ErrorStats {
            total: 0,
            by_level: ErrorLevel::ALL.iter().map(|l| (*l, 0)).collect(),
            by_kind: ErrorKind::ALL.iter().map(|k| (*k, 0)).collect(),
        };

        for record in self.records.lock().iter() {
            stats.total += 1;
            *stats.by_level.entry(record.level).or_default() += 1;
            *stats.by_kind.entry(record.kind).or_default() += 1;
        }

        stats
    }
}

// ============================================================================
// Tests
// ============================================================================
