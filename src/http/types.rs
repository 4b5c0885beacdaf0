//! Request and response shapes for the REST client.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::now_ms;

use super::error::{ApiError, ErrorCode};

// ============================================================================
// Result Alias
// ============================================================================

/// Result of a REST call.
pub type ApiResult<T> = StdResult<T, ApiError>;

// ============================================================================
// ApiResponse
// ============================================================================

/// Normalized success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// `"SUCCESS"` unless the server said otherwise.
    pub code: String,
    pub success: bool,
    pub message: String,
    /// Payload; the whole body when the server sent no `data` field.
    pub data: Value,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

impl ApiResponse {
    /// Wraps a non-envelope body.
    #[must_use]
    pub fn raw(data: Value) -> Self {
        Self {
            code: "SUCCESS".to_string(),
            success: true,
            message: "OK".to_string(),
            data,
            timestamp: now_ms(),
            request_id: None,
            pagination: None,
        }
    }

    /// Builds the envelope from a decoded body.
    ///
    /// Snake-case aliases (`is_success`, `request_id`, `error_code`) are
    /// accepted, and `success` is inferred from `code` when absent.
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        let body = normalize_fields(body);
        let object = match body {
            Value::Object(object) => object,
            other => return Self::raw(other),
        };

        let has_code = object.contains_key("code");
        let success = if has_code {
            object.get("success") != Some(&Value::Bool(false))
        } else {
            object.get("isSuccess") != Some(&Value::Bool(false))
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        let code = text("code")
            .unwrap_or_else(|| if success { "SUCCESS" } else { "ERROR" }.to_string());
        let message = text("message").unwrap_or_else(|| "OK".to_string());
        let request_id = text("requestId");
        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or_else(now_ms);
        let pagination = object.get("pagination").cloned();
        let data = object.get("data").cloned();

        Self {
            code,
            success,
            message,
            data: data.unwrap_or(Value::Object(object)),
            timestamp,
            request_id,
            pagination,
        }
    }

    /// Deserializes `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorCode::InvalidParameter`] error if `data` has the
    /// wrong shape.
    pub fn data_as<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            ApiError::new(
                ErrorCode::InvalidParameter,
                format!("Unexpected response data: {e}"),
            )
        })
    }
}

/// Renames snake-case envelope aliases and infers `success`, recursing into
/// `data` and `pagination`.
#[must_use]
pub fn normalize_fields(value: Value) -> Value {
    let mut object = match value {
        Value::Object(object) => object,
        other => return other,
    };

    for (snake, camel) in [
        ("is_success", "isSuccess"),
        ("request_id", "requestId"),
        ("error_code", "errorCode"),
    ] {
        if !object.contains_key(camel)
            && let Some(v) = object.remove(snake)
        {
            object.insert(camel.to_string(), v);
        }
    }

    if !object.contains_key("success")
        && let Some(code) = object.get("code")
    {
        let success = code.as_str() == Some("SUCCESS");
        object.insert("success".to_string(), Value::Bool(success));
    }

    for key in ["data", "pagination"] {
        if let Some(nested) = object.remove(key) {
            let nested = if nested.is_object() {
                normalize_fields(nested)
            } else {
                nested
            };
            object.insert(key.to_string(), nested);
        }
    }

    Value::Object(object)
}

// ============================================================================
// PreparedRequest
// ============================================================================

/// A fully resolved request, as seen by request interceptors.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// Sets a header, replacing any existing one with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// RequestOptions
// ============================================================================

/// Per-request overrides of the client defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// Merged over the default headers.
    pub headers: Vec<(String, String)>,
    /// Query parameters; `null` values are skipped.
    pub params: Vec<(String, Value)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    /// Do not record the final failure in the error log.
    pub skip_error_handler: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            timeout: None,
            max_retries: None,
            retry_delay: None,
            skip_error_handler: false,
        }
    }
}

impl RequestOptions {
    /// Creates options for `method`.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = Some(max_retries);
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Skips the error log for this request.
    #[must_use]
    pub fn skip_error_handler(mut self) -> Self {
        self.skip_error_handler = true;
        self
    }
}

// ============================================================================
// BatchRequest
// ============================================================================

/// One entry of [`crate::HttpClient::batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl BatchRequest {
    /// Creates a batch entry.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }
}

/// Builds an error from a non-2xx body.
pub(crate) fn error_from_body(status: u16, reason: Option<&str>, body: &Value) -> ApiError {
    let empty = Map::new();
    let object = body.as_object().unwrap_or(&empty);
    let text = |key: &str| object.get(key).and_then(Value::as_str);

    let message = text("message")
        .or_else(|| text("error"))
        .map(str::to_string)
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"));

    let error_code = text("error_code")
        .or_else(|| text("errorCode"))
        .map(ErrorCode::from)
        .unwrap_or_else(|| ErrorCode::from_status(status));

    let mut err = ApiError::new(error_code, message).with_status(status);
    if let Some(code) = text("code") {
        err.code = code.to_string();
    }
    if let Some(ts) = object.get("timestamp").and_then(Value::as_i64) {
        err.timestamp = ts;
    }
    if let Some(id) = text("request_id").or_else(|| text("requestId")) {
        err.request_id = Some(id.to_string());
    }
    err
}

// ============================================================================
// Tests
// ============================================================================
