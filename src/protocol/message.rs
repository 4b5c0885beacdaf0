//! JSON envelope types.
//!
//! Every frame on every endpoint is a JSON object with a `type`
//! discriminator. The link does not validate schemas: anything that parses
//! as JSON is forwarded to handlers.
//!
//! # Outbound Envelopes
//!
//! | Envelope | Shape |
//! |----------|-------|
//! | Heartbeat | `{"type":"ping","timestamp":<ms>}` |
//! | Subscribe | `{"type":"subscribe","update_interval"?,"levels"?,"modules"?,"event_types"?,"model_filter"?,"timestamp"?}` |
//! | Unsubscribe | `{"type":"unsubscribe"}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Constants
// ============================================================================

/// Log levels subscribed to by default.
pub const DEFAULT_LOG_LEVELS: [&str; 4] = ["INFO", "WARN", "ERROR", "DEBUG"];

// ============================================================================
// Envelope
// ============================================================================

/// A JSON object with a `type` discriminator.
///
/// # Format
///
/// ```json
/// { "type": "player_update", "data": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub kind: String,

    /// Remaining top-level fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with no extra fields.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Creates a heartbeat ping.
    #[inline]
    #[must_use]
    pub fn ping(timestamp_ms: i64) -> Self {
        Self::new("ping").with("timestamp", timestamp_ms)
    }

    /// Creates a heartbeat pong.
    #[inline]
    #[must_use]
    pub fn pong(timestamp_ms: i64) -> Self {
        Self::new("pong").with("timestamp", timestamp_ms)
    }

    /// Creates an unsubscribe envelope.
    #[inline]
    #[must_use]
    pub fn unsubscribe() -> Self {
        Self::new("unsubscribe")
    }

    /// Reads an envelope out of a JSON value.
    ///
    /// Returns `None` unless the value is an object with a string `type`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = object.get("type")?.as_str()?.to_string();
        let fields = object
            .iter()
            .filter(|(k, _)| k.as_str() != "type")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self { kind, fields })
    }

    /// Returns a field by name.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the `data` field, if any.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.fields.get("data")
    }

    /// Converts into a plain JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert("type".to_string(), Value::String(self.kind));
        object.extend(self.fields);
        Value::Object(object)
    }
}

/// Returns the `type` discriminator of a raw frame.
#[inline]
#[must_use]
pub fn message_type(frame: &Value) -> Option<&str> {
    frame.get("type").and_then(Value::as_str)
}

// ============================================================================
// SubscribeRequest
// ============================================================================

/// A `subscribe` envelope with optional endpoint-specific fields.
///
/// # Example
///
/// ```
/// use maicraft_link::SubscribeRequest;
///
/// let request = SubscribeRequest::interval(500);
/// let json = serde_json::to_value(&request).unwrap();
/// assert_eq!(json["type"], "subscribe");
/// assert_eq!(json["update_interval"], 500);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Always `"subscribe"`.
    #[serde(rename = "type")]
    kind: SubscribeKind,

    /// Push period in milliseconds; `0` means real-time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<u64>,

    /// Log levels to receive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<String>>,

    /// Log modules to receive; absent means all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,

    /// Event types to receive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    /// Model filter; `Some(Value::Null)` sends an explicit `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_filter: Option<Value>,

    /// Client timestamp in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Serialized as the literal string `"subscribe"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SubscribeKind {
    #[default]
    Subscribe,
}

impl SubscribeRequest {
    /// Creates a bare subscribe request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a subscribe request with an update interval.
    #[inline]
    #[must_use]
    pub fn interval(update_interval_ms: u64) -> Self {
        Self::new().with_update_interval(update_interval_ms)
    }

    /// Creates a log subscription for the default levels.
    #[must_use]
    pub fn logs() -> Self {
        Self::new().with_levels(DEFAULT_LOG_LEVELS)
    }

    /// Sets the update interval.
    #[inline]
    #[must_use]
    pub fn with_update_interval(mut self, update_interval_ms: u64) -> Self {
        self.update_interval = Some(update_interval_ms);
        self
    }

    /// Sets the log levels.
    #[must_use]
    pub fn with_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels = Some(levels.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the log modules.
    #[must_use]
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the event types.
    #[must_use]
    pub fn with_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the model filter; `None` sends an explicit `null`.
    #[must_use]
    pub fn with_model_filter(mut self, model: Option<String>) -> Self {
        self.model_filter = Some(model.map_or(Value::Null, Value::String));
        self
    }

    /// Sets the client timestamp.
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
