//! Logical endpoints and their connection parameters.
//!
//! Every WebSocket stream the agent exposes has a logical name
//! ([`Endpoint`]) and a static [`EndpointConfig`] describing where it lives
//! and how its client keeps the connection alive.
//!
//! # Default Table
//!
//! | Endpoint | Path | Reconnect | Max attempts |
//! |----------|------|-----------|--------------|
//! | `PLAYER` | `/ws/game/player` | 5s | 5 |
//! | `WORLD` | `/ws/game/world` | 5s | 5 |
//! | `MARKER` | `/ws/game/marker` | 5s | 5 |
//! | `LOGS` | `/ws/logs` | 5s | 5 |
//! | `LOGS_ALT` | `/ws/logs` on the alternate host | 5s | 5 |
//! | `MCP_LOGS` | `/ws/mcp-logs` | 5s | 5 |
//! | `TOKEN_USAGE` | `/ws/token-usage` | 3s | 3 |
//! | `EVENTS` | `/ws/events` | 3s | 3 |
//! | `TASK_MANAGER` | `/ws/task-manager` | 3s | 3 |
//! | `GENERAL` | `/ws` | 5s | 5 |
//! | `STATUS` | `/ws/status` | 5s | 5 |
//!
//! All endpoints heartbeat every 30s.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::settings::WsSettings;

// ============================================================================
// Constants
// ============================================================================

/// Default agent WebSocket origin.
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:20914";

/// Default origin of the alternate log stream (the mock server).
pub const DEFAULT_LOGS_ALT_BASE_URL: &str = "ws://localhost:8000";

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default reconnect interval.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Default reconnect attempt budget.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay between a successful open and the first heartbeat tick.
pub const DEFAULT_HEARTBEAT_WARMUP: Duration = Duration::from_secs(1);

// ============================================================================
// Endpoint
// ============================================================================

/// Logical WebSocket endpoint name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Endpoint {
    /// Player state stream.
    Player,
    /// World state stream.
    World,
    /// Map marker stream.
    Marker,
    /// Agent log stream.
    Logs,
    /// Log stream on the alternate host.
    LogsAlt,
    /// MCP tool log stream.
    McpLogs,
    /// LLM token usage stream.
    TokenUsage,
    /// Game event stream.
    Events,
    /// Task manager stream.
    TaskManager,
    /// General-purpose stream.
    General,
    /// Agent status stream.
    Status,
}

impl Endpoint {
    /// All endpoints, in table order.
    pub const ALL: [Endpoint; 11] = [
        Endpoint::Player,
        Endpoint::World,
        Endpoint::Marker,
        Endpoint::Logs,
        Endpoint::LogsAlt,
        Endpoint::McpLogs,
        Endpoint::TokenUsage,
        Endpoint::Events,
        Endpoint::TaskManager,
        Endpoint::General,
        Endpoint::Status,
    ];

    /// Returns the canonical upper-case name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "PLAYER",
            Self::World => "WORLD",
            Self::Marker => "MARKER",
            Self::Logs => "LOGS",
            Self::LogsAlt => "LOGS_ALT",
            Self::McpLogs => "MCP_LOGS",
            Self::TokenUsage => "TOKEN_USAGE",
            Self::Events => "EVENTS",
            Self::TaskManager => "TASK_MANAGER",
            Self::General => "GENERAL",
            Self::Status => "STATUS",
        }
    }

    /// Returns the URL path served by the agent.
    #[inline]
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Player => "/ws/game/player",
            Self::World => "/ws/game/world",
            Self::Marker => "/ws/game/marker",
            Self::Logs | Self::LogsAlt => "/ws/logs",
            Self::McpLogs => "/ws/mcp-logs",
            Self::TokenUsage => "/ws/token-usage",
            Self::Events => "/ws/events",
            Self::TaskManager => "/ws/task-manager",
            Self::General => "/ws",
            Self::Status => "/ws/status",
        }
    }

    /// Returns `true` for the monitoring streams that use the short
    /// reconnect policy.
    #[inline]
    #[must_use]
    pub const fn is_monitoring(self) -> bool {
        matches!(self, Self::TokenUsage | Self::Events | Self::TaskManager)
    }

    /// Returns `true` for endpoints whose frames are log entries.
    #[inline]
    #[must_use]
    pub const fn is_log_stream(self) -> bool {
        matches!(self, Self::Logs | Self::LogsAlt | Self::McpLogs)
    }

    /// Returns the default config for this endpoint rooted at `base_url`.
    #[must_use]
    pub fn default_config(self, base_url: &str) -> EndpointConfig {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path());
        let config = EndpointConfig::new(url);

        if self.is_monitoring() {
            config
                .with_reconnect_interval(Duration::from_secs(3))
                .with_max_reconnect_attempts(3)
        } else {
            config
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| Error::unknown_endpoint(s))
    }
}

// ============================================================================
// EndpointConfig
// ============================================================================

/// Connection parameters for one endpoint.
///
/// Immutable once handed to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// WebSocket URL.
    pub url: String,
    /// Period between `ping` envelopes.
    pub heartbeat_interval: Duration,
    /// Base delay before a reconnect attempt.
    pub reconnect_interval: Duration,
    /// Reconnect budget after an unexpected close.
    pub max_reconnect_attempts: u32,
    /// Whether unexpected closes schedule a reconnect.
    pub auto_reconnect: bool,
    /// Whether the heartbeat runs at all.
    pub enable_heartbeat: bool,
    /// Delay between open and the first heartbeat.
    pub heartbeat_warmup: Duration,
    /// Pong deadline after a ping; `None` disables liveness checks.
    pub pong_timeout: Option<Duration>,
}

impl EndpointConfig {
    /// Creates a config for `url` with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
            enable_heartbeat: true,
            heartbeat_warmup: DEFAULT_HEARTBEAT_WARMUP,
            pong_timeout: None,
        }
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the reconnect interval.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the reconnect attempt budget.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Enables or disables the heartbeat.
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.enable_heartbeat = enabled;
        self
    }

    /// Sets the heartbeat warm-up delay.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_warmup(mut self, warmup: Duration) -> Self {
        self.heartbeat_warmup = warmup;
        self
    }

    /// Sets the pong deadline.
    #[inline]
    #[must_use]
    pub fn with_pong_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Returns the delay before reconnect attempt `attempt` (1-based).
    ///
    /// `reconnect_interval * 2^(attempt-1)`, capped at 60s.
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        const MAX_DELAY: Duration = Duration::from_secs(60);

        let exponent = attempt.saturating_sub(1).min(16);
        self.reconnect_interval
            .saturating_mul(1u32 << exponent)
            .min(MAX_DELAY)
    }
}

// ============================================================================
// EndpointTable
// ============================================================================

/// Static endpoint → config table loaded at startup.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    entries: FxHashMap<Endpoint, EndpointConfig>,
}

impl EndpointTable {
    /// Builds the default table rooted at the given origins.
    #[must_use]
    pub fn new(base_url: &str, logs_alt_base_url: &str) -> Self {
        let entries = Endpoint::ALL
            .into_iter()
            .map(|endpoint| {
                let base = if endpoint == Endpoint::LogsAlt {
                    logs_alt_base_url
                } else {
                    base_url
                };
                (endpoint, endpoint.default_config(base))
            })
            .collect();

        Self { entries }
    }

    /// Builds the table from WebSocket settings, applying global overrides.
    #[must_use]
    pub fn from_settings(settings: &WsSettings) -> Self {
        let mut table = Self::new(&settings.base_url, &settings.logs_alt_base_url);

        for config in table.entries.values_mut() {
            if let Some(interval) = settings.heartbeat_interval {
                config.heartbeat_interval = interval;
            }
            if let Some(interval) = settings.reconnect_interval {
                config.reconnect_interval = interval;
            }
            if let Some(attempts) = settings.max_reconnect_attempts {
                config.max_reconnect_attempts = attempts;
            }
            config.enable_heartbeat = settings.enable_heartbeat;
            config.auto_reconnect = settings.auto_reconnect;
            config.heartbeat_warmup = settings.heartbeat_warmup;
            config.pong_timeout = settings.pong_timeout;
        }

        table
    }

    /// Returns the config for `endpoint`.
    #[must_use]
    pub fn get(&self, endpoint: Endpoint) -> EndpointConfig {
        self.entries
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| endpoint.default_config(DEFAULT_WS_BASE_URL))
    }

    /// Replaces the config for `endpoint`.
    pub fn set(&mut self, endpoint: Endpoint, config: EndpointConfig) {
        self.entries.insert(endpoint, config);
    }

    /// Iterates over all entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, &EndpointConfig)> {
        Endpoint::ALL
            .into_iter()
            .filter_map(|e| self.entries.get(&e).map(|c| (e, c)))
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::new(DEFAULT_WS_BASE_URL, DEFAULT_LOGS_ALT_BASE_URL)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let table = EndpointTable::default();
        assert_eq!(
            table.get(Endpoint::Player).url,
            "ws://localhost:20914/ws/game/player"
        );
        assert_eq!(table.get(Endpoint::LogsAlt).url, "ws://localhost:8000/ws/logs");
        assert_eq!(table.get(Endpoint::General).url, "ws://localhost:20914/ws");
    }

    #[test]
    fn test_monitoring_endpoints_use_short_policy() {
        let table = EndpointTable::default();
        for endpoint in [Endpoint::TokenUsage, Endpoint::Events, Endpoint::TaskManager] {
            let config = table.get(endpoint);
            assert_eq!(config.reconnect_interval, Duration::from_secs(3));
            assert_eq!(config.max_reconnect_attempts, 3);
        }

        let player = table.get(Endpoint::Player);
        assert_eq!(player.reconnect_interval, Duration::from_secs(5));
        assert_eq!(player.max_reconnect_attempts, 5);
        assert_eq!(player.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_from_str() {
        assert_eq!("PLAYER".parse::<Endpoint>().unwrap(), Endpoint::Player);
        assert_eq!("logs_alt".parse::<Endpoint>().unwrap(), Endpoint::LogsAlt);
        assert_eq!("task-manager".parse::<Endpoint>().unwrap(), Endpoint::TaskManager);
        assert!(matches!(
            "NOPE".parse::<Endpoint>(),
            Err(Error::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn test_endpoint_serde_name() {
        let json = serde_json::to_string(&Endpoint::TokenUsage).unwrap();
        assert_eq!(json, "\"TOKEN_USAGE\"");
    }

    #[test]
    fn test_reconnect_delay_doubles_and_caps() {
        let config = EndpointConfig::new("ws://x").with_reconnect_interval(Duration::from_secs(5));
        assert_eq!(config.reconnect_delay(1), Duration::from_secs(5));
        assert_eq!(config.reconnect_delay(2), Duration::from_secs(10));
        assert_eq!(config.reconnect_delay(3), Duration::from_secs(20));
        assert_eq!(config.reconnect_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn test_table_iter_in_order() {
        let table = EndpointTable::default();
        let names: Vec<_> = table.iter().map(|(e, _)| e).collect();
        assert_eq!(names, Endpoint::ALL.to_vec());
    }
}
