//! REST error taxonomy.
//!
//! The agent API reports failures as `{code, success: false, message,
//! error_code, ...}`. [`ErrorCode`] is the `error_code` vocabulary; unknown
//! server codes pass through as [`ErrorCode::Other`].
//!
//! # Status Mapping
//!
//! | HTTP status | [`ErrorCode`] |
//! |-------------|---------------|
//! | 400, 422 | `VALIDATION_ERROR` |
//! | 401 | `AUTHENTICATION_ERROR` |
//! | 403 | `PERMISSION_DENIED` |
//! | 404 | `RESOURCE_NOT_FOUND` |
//! | 405 | `METHOD_NOT_ALLOWED` |
//! | 409 | `CONFLICT` |
//! | 429 | `RATE_LIMIT_EXCEEDED` |
//! | 500, 502, 503, 504 | `INTERNAL_ERROR` |
//! | anything else | `UNKNOWN_ERROR` |

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::transport::now_ms;

// ============================================================================
// ErrorCode
// ============================================================================

/// `error_code` values used by the agent API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationError,
    AuthenticationError,
    PermissionDenied,
    ResourceNotFound,
    MethodNotAllowed,
    Conflict,
    RateLimitExceeded,
    InternalError,
    NetworkError,
    TimeoutError,
    ConnectionError,
    OperationFailed,
    InvalidParameter,
    SubscriptionError,
    GameStateError,
    EnvironmentError,
    UnknownError,
    /// A server code outside the known set.
    Other(String),
}

impl ErrorCode {
    /// Returns the wire string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Conflict => "CONFLICT",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::SubscriptionError => "SUBSCRIPTION_ERROR",
            Self::GameStateError => "GAME_STATE_ERROR",
            Self::EnvironmentError => "ENVIRONMENT_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other(code) => code,
        }
    }

    /// Maps an HTTP status to a code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::ValidationError,
            401 => Self::AuthenticationError,
            403 => Self::PermissionDenied,
            404 => Self::ResourceNotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            429 => Self::RateLimitExceeded,
            500 | 502 | 503 | 504 => Self::InternalError,
            _ => Self::UnknownError,
        }
    }

    /// Returns the end-user text for this code, if it has one.
    #[must_use]
    pub fn user_message(&self) -> Option<&'static str> {
        let text = match self {
            Self::ValidationError => "Invalid input, please check and try again",
            Self::ResourceNotFound => "The requested resource does not exist",
            Self::InvalidParameter => "Invalid parameter, please check and try again",
            Self::OperationFailed => "The operation failed, please try again later",
            Self::ConnectionError => "Connection failed, please check the network and retry",
            Self::SubscriptionError => "Subscription failed, please reconnect",
            Self::GameStateError => "Game state error, please restart the game",
            Self::EnvironmentError => "Environment misconfigured, please contact the administrator",
            Self::InternalError => "Internal server error, please contact the administrator",
            _ => return None,
        };
        Some(text)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "VALIDATION_ERROR" => Self::ValidationError,
            "AUTHENTICATION_ERROR" => Self::AuthenticationError,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "RESOURCE_NOT_FOUND" => Self::ResourceNotFound,
            "METHOD_NOT_ALLOWED" => Self::MethodNotAllowed,
            "CONFLICT" => Self::Conflict,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimitExceeded,
            "INTERNAL_ERROR" => Self::InternalError,
            "NETWORK_ERROR" => Self::NetworkError,
            "TIMEOUT_ERROR" => Self::TimeoutError,
            "CONNECTION_ERROR" => Self::ConnectionError,
            "OPERATION_FAILED" => Self::OperationFailed,
            "INVALID_PARAMETER" => Self::InvalidParameter,
            "SUBSCRIPTION_ERROR" => Self::SubscriptionError,
            "GAME_STATE_ERROR" => Self::GameStateError,
            "ENVIRONMENT_ERROR" => Self::EnvironmentError,
            "UNKNOWN_ERROR" => Self::UnknownError,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(code) => code,
            Err(never) => match never {},
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

// ============================================================================
// ApiError
// ============================================================================

/// A failed REST call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Envelope `code` (`"ERROR"` unless the server said otherwise).
    pub code: String,
    /// Taxonomy code.
    pub error_code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// HTTP status, if a response arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Server request id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Wall-clock ms when the error was created or reported.
    pub timestamp: i64,
    /// Extra context (`url`, `method`, `original_error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Creates an error without a status.
    #[must_use]
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: "ERROR".to_string(),
            error_code,
            message: message.into(),
            status_code: None,
            request_id: None,
            timestamp: now_ms(),
            details: None,
        }
    }

    /// Sets the HTTP status.
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Sets the request id.
    #[inline]
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the details object.
    #[inline]
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns text suitable for an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.error_code.user_message() {
            Some(text) => text.to_string(),
            None if !self.message.is_empty() => self.message.clone(),
            None => "The operation failed, please try again later".to_string(),
        }
    }

    /// Returns `true` for 4xx statuses.
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code.is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` for 5xx statuses.
    #[inline]
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code.is_some_and(|s| s >= 500)
    }

    /// Returns `true` if the request never reached the server.
    #[inline]
    #[must_use]
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.error_code,
            ErrorCode::NetworkError | ErrorCode::ConnectionError
        )
    }

    /// Returns `true` if the request timed out.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error_code == ErrorCode::TimeoutError
    }

    /// Returns `true` if another attempt may succeed.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.is_network_error()
            || self.is_timeout()
            || self.error_code == ErrorCode::OperationFailed
            || self.is_server_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::from_status(400), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::ValidationError);
        assert_eq!(ErrorCode::from_status(401), ErrorCode::AuthenticationError);
        assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimitExceeded);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::InternalError);
        assert_eq!(ErrorCode::from_status(418), ErrorCode::UnknownError);
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let code = ErrorCode::from("AGENT_BUSY");
        assert_eq!(code, ErrorCode::Other("AGENT_BUSY".into()));
        assert_eq!(code.to_string(), "AGENT_BUSY");

        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json, "AGENT_BUSY");
        let back: ErrorCode = serde_json::from_value(json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_retry_predicate() {
        assert!(ApiError::new(ErrorCode::NetworkError, "x").can_retry());
        assert!(ApiError::new(ErrorCode::TimeoutError, "x").can_retry());
        assert!(ApiError::new(ErrorCode::ConnectionError, "x").can_retry());
        assert!(ApiError::new(ErrorCode::OperationFailed, "x").can_retry());
        assert!(
            ApiError::new(ErrorCode::UnknownError, "x")
                .with_status(502)
                .can_retry()
        );
        assert!(
            !ApiError::new(ErrorCode::ValidationError, "x")
                .with_status(400)
                .can_retry()
        );
    }

    #[test]
    fn test_user_message_fallbacks() {
        let mapped = ApiError::new(ErrorCode::ResourceNotFound, "no such task");
        assert_eq!(mapped.user_message(), "The requested resource does not exist");

        let raw = ApiError::new(ErrorCode::Conflict, "task already exists");
        assert_eq!(raw.user_message(), "task already exists");
    }

    #[test]
    fn test_status_classes() {
        let client = ApiError::new(ErrorCode::PermissionDenied, "x").with_status(403);
        assert!(client.is_client_error());
        assert!(!client.is_server_error());
        assert!(!ApiError::new(ErrorCode::NetworkError, "x").is_client_error());
    }
}
