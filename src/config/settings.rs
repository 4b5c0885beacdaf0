//! Link settings: HTTP client and WebSocket defaults.
//!
//! Settings come from three places, in increasing priority:
//!
//! 1. Built-in defaults ([`LinkConfig::default`])
//! 2. `MAICRAFT_*` environment variables ([`LinkConfig::from_env`])
//! 3. Explicit builder calls ([`LinkConfig::builder`])
//!
//! # Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `MAICRAFT_API_BASE_URL` | `http.base_url` | `http://localhost:20914/api` |
//! | `MAICRAFT_API_TIMEOUT` | `http.timeout` (ms) | `10000` |
//! | `MAICRAFT_API_MAX_RETRIES` | `http.max_retries` | `3` |
//! | `MAICRAFT_API_RETRY_DELAY` | `http.retry_delay` (ms) | `1000` |
//! | `MAICRAFT_API_DEBUG` | `http.debug` | `false` |
//! | `MAICRAFT_WS_BASE_URL` | `ws.base_url` | `ws://localhost:20914` |
//! | `MAICRAFT_WS_LOGS_ALT_URL` | `ws.logs_alt_base_url` | `ws://localhost:8000` |
//! | `MAICRAFT_WS_HEARTBEAT_INTERVAL` | `ws.heartbeat_interval` (ms) | per endpoint |
//! | `MAICRAFT_WS_RECONNECT_INTERVAL` | `ws.reconnect_interval` (ms) | per endpoint |
//! | `MAICRAFT_WS_MAX_RECONNECT_ATTEMPTS` | `ws.max_reconnect_attempts` | per endpoint |
//! | `MAICRAFT_WS_ENABLE_HEARTBEAT` | `ws.enable_heartbeat` | `true` |
//! | `MAICRAFT_WS_ENABLE_AUTO_RECONNECT` | `ws.auto_reconnect` | `true` |
//!
//! Unparsable values fall back to the default with a warning.

// ============================================================================
// Imports
// ============================================================================

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

use super::endpoint::{
    DEFAULT_HEARTBEAT_WARMUP, DEFAULT_LOGS_ALT_BASE_URL, DEFAULT_WS_BASE_URL, EndpointTable,
};

// ============================================================================
// Constants
// ============================================================================

/// Default REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:20914/api";

/// Default per-request timeout.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// HttpSettings
// ============================================================================

/// REST client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Base URL that endpoint paths are joined onto.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Logs every request and response at debug level when set.
    pub debug: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_API_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            debug: false,
        }
    }
}

// ============================================================================
// WsSettings
// ============================================================================

/// WebSocket defaults applied on top of the endpoint table.
///
/// `None` overrides keep each endpoint's own value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsSettings {
    /// Origin of the agent's WebSocket endpoints.
    pub base_url: String,
    /// Origin of the alternate log stream.
    pub logs_alt_base_url: String,
    /// Heartbeat interval override.
    pub heartbeat_interval: Option<Duration>,
    /// Reconnect interval override.
    pub reconnect_interval: Option<Duration>,
    /// Reconnect budget override.
    pub max_reconnect_attempts: Option<u32>,
    /// Whether clients heartbeat.
    pub enable_heartbeat: bool,
    /// Whether clients reconnect after unexpected closes.
    pub auto_reconnect: bool,
    /// Delay between open and the first heartbeat.
    pub heartbeat_warmup: Duration,
    /// Pong deadline; `None` disables liveness checks.
    pub pong_timeout: Option<Duration>,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_BASE_URL.to_string(),
            logs_alt_base_url: DEFAULT_LOGS_ALT_BASE_URL.to_string(),
            heartbeat_interval: None,
            reconnect_interval: None,
            max_reconnect_attempts: None,
            enable_heartbeat: true,
            auto_reconnect: true,
            heartbeat_warmup: DEFAULT_HEARTBEAT_WARMUP,
            pong_timeout: None,
        }
    }
}

// ============================================================================
// LinkConfig
// ============================================================================

/// Complete link configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkConfig {
    /// REST client settings.
    pub http: HttpSettings,
    /// WebSocket defaults.
    pub ws: WsSettings,
}

impl LinkConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::new()
    }

    /// Loads settings from `MAICRAFT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// Used by [`from_env`](Self::from_env); tests pass a map instead of
    /// touching the process environment.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("MAICRAFT_API_BASE_URL") {
            config.http.base_url = url;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MAICRAFT_API_TIMEOUT") {
            config.http.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "MAICRAFT_API_MAX_RETRIES") {
            config.http.max_retries = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MAICRAFT_API_RETRY_DELAY") {
            config.http.retry_delay = Duration::from_millis(ms);
        }
        if let Some(flag) = lookup("MAICRAFT_API_DEBUG") {
            config.http.debug = flag == "true" || flag == "1";
        }

        if let Some(url) = lookup("MAICRAFT_WS_BASE_URL") {
            config.ws.base_url = url;
        }
        if let Some(url) = lookup("MAICRAFT_WS_LOGS_ALT_URL") {
            config.ws.logs_alt_base_url = url;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MAICRAFT_WS_HEARTBEAT_INTERVAL") {
            config.ws.heartbeat_interval = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MAICRAFT_WS_RECONNECT_INTERVAL") {
            config.ws.reconnect_interval = Some(Duration::from_millis(ms));
        }
        if let Some(n) = parse_var::<u32>(&lookup, "MAICRAFT_WS_MAX_RECONNECT_ATTEMPTS") {
            config.ws.max_reconnect_attempts = Some(n);
        }
        // Anything but an explicit "false" keeps these on.
        if let Some(flag) = lookup("MAICRAFT_WS_ENABLE_HEARTBEAT") {
            config.ws.enable_heartbeat = flag != "false";
        }
        if let Some(flag) = lookup("MAICRAFT_WS_ENABLE_AUTO_RECONNECT") {
            config.ws.auto_reconnect = flag != "false";
        }

        config
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every violation, joined by `"; "`.
    pub fn validate(&self) -> Result<()> {
        let errors = self.violations();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::config(errors.join("; ")))
        }
    }

    /// Returns every configuration violation.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.http.base_url.trim().is_empty() {
            errors.push("API baseURL is required".to_string());
        } else if url::Url::parse(&self.http.base_url).is_err() {
            errors.push(format!("API baseURL is not a valid URL: {}", self.http.base_url));
        }

        if self.http.timeout.is_zero() {
            errors.push("API timeout must be greater than 0".to_string());
        }

        if self.ws.heartbeat_interval.is_some_and(|d| d.is_zero()) {
            errors.push("WebSocket heartbeatInterval must be greater than 0".to_string());
        }

        if self.ws.base_url.trim().is_empty() {
            errors.push("WebSocket base URL is required".to_string());
        }

        errors
    }

    /// Builds the endpoint table for these settings.
    #[inline]
    #[must_use]
    pub fn endpoint_table(&self) -> EndpointTable {
        EndpointTable::from_settings(&self.ws)
    }
}

/// Parses an environment value, warning and returning `None` on garbage.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

// ============================================================================
// LinkConfigBuilder
// ============================================================================

/// Builder for [`LinkConfig`].
#[derive(Debug, Clone, Default)]
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    /// Creates a builder seeded with defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    #[must_use]
    pub fn from_config(config: LinkConfig) -> Self {
        Self { config }
    }

    /// Sets the REST API base URL.
    #[inline]
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.http.base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Sets the retry budget.
    #[inline]
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.http.max_retries = retries;
        self
    }

    /// Sets the delay between retries.
    #[inline]
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.http.retry_delay = delay;
        self
    }

    /// Adds or replaces a default header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let headers = &mut self.config.http.headers;
        match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => headers.push((name, value)),
        }
        self
    }

    /// Enables request/response debug logging.
    #[inline]
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.http.debug = enabled;
        self
    }

    /// Sets the WebSocket origin.
    #[inline]
    #[must_use]
    pub fn ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws.base_url = url.into();
        self
    }

    /// Sets the alternate log stream origin.
    #[inline]
    #[must_use]
    pub fn logs_alt_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws.logs_alt_base_url = url.into();
        self
    }

    /// Overrides the heartbeat interval on every endpoint.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.ws.heartbeat_interval = Some(interval);
        self
    }

    /// Overrides the reconnect interval on every endpoint.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config.ws.reconnect_interval = Some(interval);
        self
    }

    /// Overrides the reconnect budget on every endpoint.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.ws.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Enables or disables heartbeats.
    #[inline]
    #[must_use]
    pub fn enable_heartbeat(mut self, enabled: bool) -> Self {
        self.config.ws.enable_heartbeat = enabled;
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.ws.auto_reconnect = enabled;
        self
    }

    /// Sets the heartbeat warm-up delay.
    #[inline]
    #[must_use]
    pub fn heartbeat_warmup(mut self, warmup: Duration) -> Self {
        self.config.ws.heartbeat_warmup = warmup;
        self
    }

    /// Sets the pong deadline.
    #[inline]
    #[must_use]
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.config.ws.pong_timeout = Some(timeout);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn build(self) -> Result<LinkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    use crate::config::Endpoint;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.http.base_url, "http://localhost:20914/api");
        assert_eq!(config.http.timeout, Duration::from_secs(10));
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.retry_delay, Duration::from_secs(1));
        assert!(config.ws.enable_heartbeat);
        assert!(config.ws.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = LinkConfig::from_lookup(lookup_from(&[
            ("MAICRAFT_API_BASE_URL", "http://agent:9000/api"),
            ("MAICRAFT_API_TIMEOUT", "2500"),
            ("MAICRAFT_API_MAX_RETRIES", "0"),
            ("MAICRAFT_WS_HEARTBEAT_INTERVAL", "10000"),
            ("MAICRAFT_WS_ENABLE_AUTO_RECONNECT", "false"),
        ]));

        assert_eq!(config.http.base_url, "http://agent:9000/api");
        assert_eq!(config.http.timeout, Duration::from_millis(2500));
        assert_eq!(config.http.max_retries, 0);
        assert_eq!(config.ws.heartbeat_interval, Some(Duration::from_secs(10)));
        assert!(!config.ws.auto_reconnect);
        assert!(config.ws.enable_heartbeat);
    }

    #[test]
    fn test_unparsable_value_keeps_default() {
        let config = LinkConfig::from_lookup(lookup_from(&[("MAICRAFT_API_TIMEOUT", "soon")]));
        assert_eq!(config.http.timeout, DEFAULT_API_TIMEOUT);
    }

    #[test]
    fn test_validate_collects_all_violations() {
        let mut config = LinkConfig::default();
        config.http.base_url = String::new();
        config.http.timeout = Duration::ZERO;
        config.ws.heartbeat_interval = Some(Duration::ZERO);

        let violations = config.violations();
        assert_eq!(violations.len(), 3);
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_builder_header_replaces_case_insensitively() {
        let config = LinkConfig::builder()
            .header("accept", "text/plain")
            .header("Authorization", "Bearer x")
            .build()
            .unwrap();

        assert_eq!(config.http.headers.len(), 3);
        assert!(config
            .http
            .headers
            .iter()
            .any(|(n, v)| n == "Accept" && v == "text/plain"));
    }

    #[test]
    fn test_endpoint_table_applies_overrides() {
        let config = LinkConfig::builder()
            .ws_base_url("ws://127.0.0.1:1234")
            .reconnect_interval(Duration::from_millis(50))
            .enable_heartbeat(false)
            .build()
            .unwrap();

        let table = config.endpoint_table();
        let events = table.get(Endpoint::Events);
        assert_eq!(events.url, "ws://127.0.0.1:1234/ws/events");
        assert_eq!(events.reconnect_interval, Duration::from_millis(50));
        assert_eq!(events.max_reconnect_attempts, 3);
        assert!(!events.enable_heartbeat);
    }
}
