//! Retrying REST client for the agent API.
//!
//! A call flows through these stages:
//!
//! ```text
//! RequestOptions ─► PreparedRequest ─► request interceptors
//!                                           │
//!                     ┌─────────────────────┘
//!                     ▼
//!               attempt 1..=max_retries+1 ──► non-retryable ─┐
//!                     │ ok                                   │
//!                     ▼                                      ▼
//!              response interceptors              reporter + on_error chain
//! ```
//!
//! Retryable failures are network errors, timeouts, `OPERATION_FAILED` and
//! any 5xx status (see [`ApiError::can_retry`]).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::{HttpSettings, LinkConfig};
use crate::error::{Error, Result};

use super::error::{ApiError, ErrorCode};
use super::error_log::ErrorReporter;
use super::interceptors::InterceptorChain;
use super::services::{LogsApi, McpApi};
use super::types::{
    ApiResponse, ApiResult, BatchRequest, PreparedRequest, RequestOptions, error_from_body,
};

// ============================================================================
// HttpClient
// ============================================================================

/// REST client with retries, interceptors and error reporting.
///
/// Cloning is cheap; clones share the connection pool, interceptors and
/// error log.
#[derive(Debug, Clone)]
pub struct HttpClient {
    settings: HttpSettings,
    http: reqwest::Client,
    interceptors: Arc<InterceptorChain>,
    reporter: Arc<ErrorReporter>,
}

impl HttpClient {
    /// Creates a client from HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is invalid, or
    /// [`Error::Http`] if the underlying client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self> {
        Url::parse(&settings.base_url)
            .map_err(|e| Error::config(format!("invalid API base URL {}: {e}", settings.base_url)))?;

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            settings,
            http,
            interceptors: Arc::new(InterceptorChain::new()),
            reporter: Arc::new(ErrorReporter::default()),
        })
    }

    /// Creates a client from a full link configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    #[inline]
    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        Self::new(config.http.clone())
    }

    /// Shares an interceptor chain with this client.
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: Arc<InterceptorChain>) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Shares an error log with this client.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// Returns the interceptor chain.
    #[inline]
    #[must_use]
    pub fn interceptors(&self) -> &Arc<InterceptorChain> {
        &self.interceptors
    }

    /// Returns the error log.
    #[inline]
    #[must_use]
    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    /// Typed log management calls.
    #[inline]
    #[must_use]
    pub fn logs(&self) -> LogsApi<'_> {
        LogsApi::new(self)
    }

    /// Typed MCP tool calls.
    #[inline]
    #[must_use]
    pub fn mcp(&self) -> McpApi<'_> {
        McpApi::new(self)
    }
}

// ============================================================================
// HttpClient - URL Building
// ============================================================================

impl HttpClient {
    /// Joins `path` onto the base URL and appends query parameters.
    ///
    /// Absolute `http(s)://` paths are used as-is. `null` parameters are
    /// skipped and string parameters are written without quotes.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorCode::InvalidParameter`] error if the result is
    /// not a valid URL.
    pub fn build_url(&self, path: &str, params: &[(String, Value)]) -> ApiResult<String> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            let base = self.settings.base_url.trim_end_matches('/');
            if path.starts_with('/') {
                format!("{base}{path}")
            } else {
                format!("{base}/{path}")
            }
        };

        let mut url = Url::parse(&joined).map_err(|e| {
            ApiError::new(ErrorCode::InvalidParameter, format!("Invalid URL {joined}: {e}"))
        })?;

        let present: Vec<_> = params.iter().filter(|(_, v)| !v.is_null()).collect();
        if !present.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in present {
                match value {
                    Value::String(s) => query.append_pair(key, s),
                    other => query.append_pair(key, &other.to_string()),
                };
            }
        }

        Ok(url.into())
    }

    fn prepare(&self, path: &str, options: &RequestOptions) -> ApiResult<PreparedRequest> {
        let url = self.build_url(path, &options.params)?;

        let mut request = PreparedRequest {
            method: options.method.clone(),
            url,
            headers: Vec::new(),
            body: options.body.clone(),
            timeout: options.timeout.unwrap_or(self.settings.timeout),
        };
        for (name, value) in self.settings.headers.iter().chain(&options.headers) {
            request.set_header(name.clone(), value.clone());
        }
        Ok(request)
    }
}

// ============================================================================
// HttpClient - Request Execution
// ============================================================================

impl HttpClient {
    /// Sends a request with the full retry and interceptor pipeline.
    ///
    /// # Errors
    ///
    /// Returns the last [`ApiError`] after the retry budget is spent, or
    /// immediately for non-retryable failures.
    pub async fn request(&self, path: &str, options: RequestOptions) -> ApiResult<ApiResponse> {
        let max_retries = options.max_retries.unwrap_or(self.settings.max_retries);
        let retry_delay = options.retry_delay.unwrap_or(self.settings.retry_delay);
        let total = max_retries + 1;

        let prepared = match self.prepare(path, &options) {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e, &options, path, total).await),
        };
        let prepared = match self.interceptors.run_request(prepared).await {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e, &options, path, total).await),
        };

        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                method = %prepared.method,
                url = %prepared.url,
                "Sending request (attempt {attempt}/{total})"
            );
            if self.settings.debug {
                debug!(body = ?prepared.body, headers = ?prepared.headers, "Request payload");
            }

            let attempt_started = Instant::now();
            match self.send_once(&prepared).await {
                Ok(response) => {
                    debug!(
                        method = %prepared.method,
                        url = %prepared.url,
                        duration_ms = attempt_started.elapsed().as_millis() as u64,
                        "Request succeeded"
                    );
                    if self.settings.debug {
                        debug!(data = %response.data, "Response payload");
                    }

                    return match self.interceptors.run_response(response).await {
                        Ok(response) => Ok(response),
                        Err(e) => {
                            self.report(&e, &options, &prepared.url, total);
                            Err(e)
                        }
                    };
                }
                Err(e) if attempt < total && e.can_retry() => {
                    warn!(
                        method = %prepared.method,
                        url = %prepared.url,
                        error_code = %e.error_code,
                        duration_ms = attempt_started.elapsed().as_millis() as u64,
                        "Retryable failure (attempt {attempt}/{total}): {}",
                        e.message
                    );
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        method = %prepared.method,
                        url = %prepared.url,
                        error_code = %e.error_code,
                        total_ms = started.elapsed().as_millis() as u64,
                        "Request failed after {attempt} attempt(s): {}",
                        e.message
                    );
                    return Err(self.fail(e, &options, &prepared.url, total).await);
                }
            }
        }
    }

    /// Makes one HTTP round trip.
    async fn send_once(&self, request: &PreparedRequest) -> ApiResult<ApiResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(ref body) = request.body
            && request.method != Method::GET
        {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e, request))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&e, request))?;

        let body = if text.is_empty() {
            Value::Null
        } else if is_json {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        } else {
            Value::String(text)
        };

        if status.is_success() {
            Ok(ApiResponse::from_body(body))
        } else {
            let err = error_from_body(status.as_u16(), status.canonical_reason(), &body);
            Err(err.with_details(json!({
                "url": request.url,
                "method": request.method.as_str(),
                "response": body,
            })))
        }
    }

    /// Records a final failure and passes it through the error chain.
    async fn fail(
        &self,
        err: ApiError,
        options: &RequestOptions,
        url: &str,
        attempts: u32,
    ) -> ApiError {
        self.report(&err, options, url, attempts);
        self.interceptors.run_error(err).await
    }

    fn report(&self, err: &ApiError, options: &RequestOptions, url: &str, attempts: u32) {
        if options.skip_error_handler {
            return;
        }

        let mut context = Map::new();
        context.insert("url".into(), Value::from(url));
        context.insert("method".into(), Value::from(options.method.as_str()));
        context.insert("retry_attempts".into(), Value::from(attempts));

        if err.is_network_error() {
            self.reporter.handle_network_error(err, context);
        } else {
            self.reporter.handle_api_error(err, context);
        }
    }
}

/// Maps a transport failure onto the HTTP taxonomy.
fn transport_error(err: &reqwest::Error, request: &PreparedRequest) -> ApiError {
    let (code, message) = if err.is_timeout() {
        (
            ErrorCode::TimeoutError,
            format!("Request timed out after {}ms", request.timeout.as_millis()),
        )
    } else if err.is_connect() || err.is_request() {
        (ErrorCode::NetworkError, format!("Network error: {err}"))
    } else {
        (ErrorCode::UnknownError, format!("Request failed: {err}"))
    };

    ApiError::new(code, message).with_details(json!({
        "url": request.url,
        "method": request.method.as_str(),
        "original_error": err.to_string(),
    }))
}

// ============================================================================
// HttpClient - Verb Helpers
// ============================================================================

impl HttpClient {
    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    #[inline]
    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(path, RequestOptions::new(Method::GET)).await
    }

    /// `GET path?params`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get_with(&self, path: &str, params: &[(&str, Value)]) -> ApiResult<ApiResponse> {
        let options = params
            .iter()
            .fold(RequestOptions::new(Method::GET), |options, (k, v)| {
                options.param(*k, v.clone())
            });
        self.request(path, options).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    #[inline]
    pub async fn post(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(path, RequestOptions::new(Method::POST).body(body))
            .await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    #[inline]
    pub async fn put(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(path, RequestOptions::new(Method::PUT).body(body))
            .await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    #[inline]
    pub async fn patch(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(path, RequestOptions::new(Method::PATCH).body(body))
            .await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    #[inline]
    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(path, RequestOptions::new(Method::DELETE)).await
    }

    /// Sends every request concurrently; results keep input order.
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> Vec<ApiResult<ApiResponse>> {
        let calls = requests.into_iter().map(|r| async move {
            let mut options = RequestOptions::new(r.method);
            options.body = r.body;
            self.request(&r.path, options).await
        });
        join_all(calls).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::LinkConfig;

    fn client(base: &str) -> HttpClient {
        let config = LinkConfig::builder().api_base_url(base).build().unwrap();
        HttpClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_build_url_joins_slashes() {
        let c = client("http://localhost:20914/api/");
        assert_eq!(
            c.build_url("tasks", &[]).unwrap(),
            "http://localhost:20914/api/tasks"
        );
        assert_eq!(
            c.build_url("/tasks", &[]).unwrap(),
            "http://localhost:20914/api/tasks"
        );
    }

    #[test]
    fn test_build_url_params() {
        let c = client("http://localhost:20914/api");
        let url = c
            .build_url(
                "/logs",
                &[
                    ("level".into(), Value::from("INFO")),
                    ("limit".into(), Value::from(50)),
                    ("module".into(), Value::Null),
                    ("all".into(), Value::Bool(true)),
                ],
            )
            .unwrap();
        assert_eq!(url, "http://localhost:20914/api/logs?level=INFO&limit=50&all=true");
    }

    #[test]
    fn test_build_url_absolute_path() {
        let c = client("http://localhost:20914/api");
        assert_eq!(
            c.build_url("http://other:1/health", &[]).unwrap(),
            "http://other:1/health"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base() {
        let settings = HttpSettings {
            base_url: "not a url".into(),
            ..HttpSettings::default()
        };
        assert!(matches!(HttpClient::new(settings), Err(Error::Config { .. })));
    }

    #[test]
    fn test_prepare_merges_headers() {
        let c = client("http://localhost:20914/api");
        let options = RequestOptions::default().header("accept", "text/plain");
        let prepared = c.prepare("/x", &options).unwrap();
        assert_eq!(prepared.header("Accept"), Some("text/plain"));
        assert_eq!(prepared.header("content-type"), Some("application/json"));
        assert_eq!(prepared.timeout, c.settings().timeout);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let c = client("http://127.0.0.1:1/api");
        let err = c
            .request("/status", RequestOptions::default().retry(0, Default::default()))
            .await
            .unwrap_err();

        assert_eq!(err.error_code, ErrorCode::NetworkError);
        assert!(err.details.is_some());
        assert_eq!(c.reporter().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_error_handler() {
        let c = client("http://127.0.0.1:1/api");
        let options = RequestOptions::default()
            .retry(0, Default::default())
            .skip_error_handler();
        assert!(c.request("/status", options).await.is_err());
        assert!(c.reporter().is_empty());
    }
}
