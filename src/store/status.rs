//! Aggregate connection status across the hub's endpoints.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Endpoint;
use crate::error::Error;
use crate::transport::now_ms;

// ============================================================================
// Constants
// ============================================================================

/// Longest error text kept in [`EndpointDetails::last_error`].
pub const MAX_ERROR_LEN: usize = 200;

// ============================================================================
// EndpointDetails
// ============================================================================

/// Connection history of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointDetails {
    /// Whether the transport is open.
    pub connected: bool,
    /// Wall-clock ms of the last open.
    pub last_connected: Option<i64>,
    /// Wall-clock ms of the last close.
    pub last_disconnected: Option<i64>,
    /// Frames received.
    pub message_count: u64,
    /// Errors seen.
    pub error_count: u64,
    /// Last error, truncated to [`MAX_ERROR_LEN`] characters.
    pub last_error: Option<String>,
}

// ============================================================================
// GlobalStatus
// ============================================================================

/// Status snapshot of every supervised endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalStatus {
    /// A `connect_all()` is in progress.
    pub is_connecting: bool,
    /// Every supervised endpoint is connected.
    pub all_connected: bool,
    /// Number of connected endpoints.
    pub connection_count: usize,
    /// Number of supervised endpoints.
    pub total_endpoints: usize,
    /// Per-endpoint details.
    pub details: BTreeMap<Endpoint, EndpointDetails>,
}

impl GlobalStatus {
    /// Creates a status with every endpoint disconnected.
    #[must_use]
    pub fn new(endpoints: &[Endpoint]) -> Self {
        Self {
            is_connecting: false,
            all_connected: false,
            connection_count: 0,
            total_endpoints: endpoints.len(),
            details: endpoints
                .iter()
                .map(|e| (*e, EndpointDetails::default()))
                .collect(),
        }
    }

    /// Returns `true` if `endpoint` is connected.
    #[must_use]
    pub fn is_connected(&self, endpoint: Endpoint) -> bool {
        self.details.get(&endpoint).is_some_and(|d| d.connected)
    }

    /// Returns the details for `endpoint`.
    #[must_use]
    pub fn endpoint(&self, endpoint: Endpoint) -> Option<&EndpointDetails> {
        self.details.get(&endpoint)
    }

    pub(crate) fn record_connection(&mut self, endpoint: Endpoint, connected: bool) {
        let details = self.details.entry(endpoint).or_default();
        details.connected = connected;
        if connected {
            details.last_connected = Some(now_ms());
        } else {
            details.last_disconnected = Some(now_ms());
        }
        self.recount();
    }

    pub(crate) fn record_message(&mut self, endpoint: Endpoint) {
        self.details.entry(endpoint).or_default().message_count += 1;
    }

    pub(crate) fn record_error(&mut self, endpoint: Endpoint, error: &Error) {
        let details = self.details.entry(endpoint).or_default();
        details.error_count += 1;
        details.last_error = Some(format_error(error));
    }

    pub(crate) fn recount(&mut self) {
        self.total_endpoints = self.details.len();
        self.connection_count = self.details.values().filter(|d| d.connected).count();
        self.all_connected = self.connection_count == self.total_endpoints;
    }
}

/// Renders an error for display, truncated to [`MAX_ERROR_LEN`] characters.
#[must_use]
pub fn format_error(error: &Error) -> String {
    let text = error.to_string();
    if text.chars().count() <= MAX_ERROR_LEN {
        return text;
    }
    let mut truncated: String = text.chars().take(MAX_ERROR_LEN).collect();
    truncated.push_str("...");
    truncated
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_all_disconnected() {
        let status = GlobalStatus::new(&[Endpoint::Player, Endpoint::World]);
        assert_eq!(status.total_endpoints, 2);
        assert_eq!(status.connection_count, 0);
        assert!(!status.all_connected);
        assert!(!status.is_connected(Endpoint::Player));
    }

    #[test]
    fn test_record_connection_recounts() {
        let mut status = GlobalStatus::new(&[Endpoint::Player, Endpoint::World]);
        status.record_connection(Endpoint::Player, true);
        assert_eq!(status.connection_count, 1);
        assert!(!status.all_connected);

        status.record_connection(Endpoint::World, true);
        assert!(status.all_connected);

        status.record_connection(Endpoint::Player, false);
        let details = status.endpoint(Endpoint::Player).unwrap();
        assert!(!details.connected);
        assert!(details.last_connected.is_some());
        assert!(details.last_disconnected.is_some());
        assert_eq!(status.connection_count, 1);
    }

    #[test]
    fn test_record_error_truncates() {
        let mut status = GlobalStatus::new(&[Endpoint::Logs]);
        let long = Error::connection("x".repeat(500));
        status.record_error(Endpoint::Logs, &long);

        let details = status.endpoint(Endpoint::Logs).unwrap();
        assert_eq!(details.error_count, 1);
        let text = details.last_error.as_deref().unwrap();
        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), MAX_ERROR_LEN + 3);
    }
}
