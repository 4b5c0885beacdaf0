//! Error types for the Maicraft link.
//!
//! This module defines the crate-level error type. The HTTP layer has its own
//! richer taxonomy in [`crate::http::ApiError`], which converts into
//! [`Error::Api`] when it crosses into crate-level code.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use maicraft_link::{Endpoint, Registry, Result};
//!
//! async fn example(registry: &Registry) -> Result<()> {
//!     registry.connect(Endpoint::Player).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::UnknownEndpoint`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ReconnectExhausted`], [`Error::HeartbeatTimeout`] |
//! | Arguments | [`Error::InvalidArgument`] |
//! | HTTP | [`Error::Api`], [`Error::Http`] |
//! | Release | [`Error::Version`], [`Error::Changelog`], [`Error::Backup`], [`Error::Git`] |
//! | Agent | [`Error::Agent`], [`Error::ProcessLaunchFailed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::http::ApiError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when link settings are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint name is not part of the endpoint table.
    #[error("Unknown endpoint: {name}")]
    UnknownEndpoint {
        /// The unrecognized endpoint name.
        name: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the transport cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection attempt did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Reconnection gave up after the configured number of attempts.
    #[error("Reconnect to {endpoint} gave up after {attempts} attempts")]
    ReconnectExhausted {
        /// Endpoint name.
        endpoint: String,
        /// Attempts made.
        attempts: u32,
    },

    /// No pong arrived within the liveness deadline.
    #[error("No heartbeat reply from {endpoint} within {timeout_ms}ms")]
    HeartbeatTimeout {
        /// Endpoint name.
        endpoint: String,
        /// Milliseconds waited for the pong.
        timeout_ms: u64,
    },

    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// Invalid argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // HTTP Errors
    // ========================================================================
    /// Structured API error from the REST client.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Low-level HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Release Errors
    // ========================================================================
    /// Version string could not be parsed or bumped.
    #[error("Version error: {message}")]
    Version {
        /// Description of the version error.
        message: String,
    },

    /// Changelog could not be updated.
    #[error("Changelog error: {message}")]
    Changelog {
        /// Description of the changelog error.
        message: String,
    },

    /// Backup could not be created or restored.
    #[error("Backup error: {message}")]
    Backup {
        /// Description of the backup error.
        message: String,
    },

    /// A git invocation failed.
    #[error("git {command} failed: {message}")]
    Git {
        /// The git subcommand.
        command: String,
        /// Captured stderr or spawn error.
        message: String,
    },

    // ========================================================================
    // Agent Errors
    // ========================================================================
    /// Agent supervisor rejected the request.
    #[error("Agent error: {message}")]
    Agent {
        /// Description of the agent error.
        message: String,
    },

    /// Failed to launch the agent process.
    #[error("Failed to launch agent: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unknown endpoint error.
    #[inline]
    pub fn unknown_endpoint(name: impl Into<String>) -> Self {
        Self::UnknownEndpoint { name: name.into() }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(endpoint: impl Into<String>, attempts: u32) -> Self {
        Self::ReconnectExhausted {
            endpoint: endpoint.into(),
            attempts,
        }
    }

    /// Creates a heartbeat timeout error.
    #[inline]
    pub fn heartbeat_timeout(endpoint: impl Into<String>, timeout_ms: u64) -> Self {
        Self::HeartbeatTimeout {
            endpoint: endpoint.into(),
            timeout_ms,
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a version error.
    #[inline]
    pub fn version(message: impl Into<String>) -> Self {
        Self::Version {
            message: message.into(),
        }
    }

    /// Creates a changelog error.
    #[inline]
    pub fn changelog(message: impl Into<String>) -> Self {
        Self::Changelog {
            message: message.into(),
        }
    }

    /// Creates a backup error.
    #[inline]
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
        }
    }

    /// Creates a git error.
    #[inline]
    pub fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an agent error.
    #[inline]
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
        }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectionTimeout { .. } | Self::HeartbeatTimeout { .. } => true,
            Self::Api(api) => api.is_timeout(),
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ReconnectExhausted { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection { .. }
            | Self::ConnectionTimeout { .. }
            | Self::HeartbeatTimeout { .. }
            | Self::WebSocket(_) => true,
            Self::Api(api) => api.can_retry(),
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::http::ErrorCode;

    #[test]
    fn test_messages_name_the_endpoint() {
        assert_eq!(
            Error::reconnect_exhausted("PLAYER", 5).to_string(),
            "Reconnect to PLAYER gave up after 5 attempts"
        );
        assert_eq!(
            Error::heartbeat_timeout("LOGS", 10_000).to_string(),
            "No heartbeat reply from LOGS within 10000ms"
        );
        assert_eq!(Error::unknown_endpoint("RADAR").to_string(), "Unknown endpoint: RADAR");
    }

    #[test]
    fn test_git_error_names_subcommand() {
        let err = Error::git("tag", "tag 'v1.2.3' already exists");
        assert_eq!(err.to_string(), "git tag failed: tag 'v1.2.3' already exists");
    }

    #[test]
    fn test_timeouts() {
        assert!(Error::connection_timeout(10_000).is_timeout());
        assert!(Error::heartbeat_timeout("WORLD", 30_000).is_timeout());
        assert!(Error::Api(ApiError::new(ErrorCode::TimeoutError, "slow")).is_timeout());
        assert!(!Error::connection("refused").is_timeout());
    }

    #[test]
    fn test_connection_family() {
        assert!(Error::connection("refused").is_connection_error());
        assert!(Error::WebSocket(WsError::ConnectionClosed).is_connection_error());
        assert!(Error::reconnect_exhausted("WORLD", 3).is_connection_error());
        assert!(!Error::backup("no backups").is_connection_error());
    }

    #[test]
    fn test_exhausted_reconnect_is_final() {
        assert!(Error::heartbeat_timeout("STATUS", 3000).is_recoverable());
        assert!(!Error::reconnect_exhausted("STATUS", 10).is_recoverable());
        assert!(!Error::agent("Agent is not running").is_recoverable());
    }

    #[test]
    fn test_api_error_recoverable_follows_code() {
        let retryable: Error = ApiError::new(ErrorCode::ConnectionError, "down").into();
        let fatal: Error = ApiError::new(ErrorCode::ValidationError, "bad").into();

        assert!(retryable.is_recoverable());
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_manifest_parse_failure_converts() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{\"version\":").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
