//! Request and response interceptor chains.
//!
//! Interceptors run in descending priority; equal priorities keep
//! registration order. Disabled interceptors are skipped but stay
//! registered.
//!
//! # Priorities
//!
//! | Priority | Value | Typical use |
//! |----------|-------|-------------|
//! | `Low` | 1 | Logging |
//! | `Normal` | 5 | Default |
//! | `High` | 10 | Authentication |
//! | `Critical` | 15 | Must run first |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::identifiers::InterceptorId;

use super::error::{ApiError, ErrorCode};
use super::types::{ApiResponse, ApiResult, PreparedRequest};

// ============================================================================
// Traits
// ============================================================================

/// Transforms a request before it is sent.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Returns the request to send, or an error to abort it.
    async fn on_request(&self, request: PreparedRequest) -> ApiResult<PreparedRequest>;
}

/// Observes or transforms responses and final failures.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Returns the response to hand back, or an error to fail the call.
    async fn on_response(&self, response: ApiResponse) -> ApiResult<ApiResponse> {
        Ok(response)
    }

    /// Sees a failure and returns the error to propagate.
    async fn on_error(&self, error: ApiError) -> ApiError {
        error
    }
}

// ============================================================================
// Options
// ============================================================================

/// Interceptor ordering weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterceptorPriority {
    Low = 1,
    Normal = 5,
    High = 10,
    Critical = 15,
}

/// Registration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorOptions {
    pub priority: InterceptorPriority,
    pub enabled: bool,
    /// Used by `set_enabled` and `remove_by_name`.
    pub name: Option<String>,
}

impl Default for InterceptorOptions {
    fn default() -> Self {
        Self {
            priority: InterceptorPriority::Normal,
            enabled: true,
            name: None,
        }
    }
}

impl InterceptorOptions {
    /// Creates named options with `priority`.
    #[must_use]
    pub fn named(name: impl Into<String>, priority: InterceptorPriority) -> Self {
        Self {
            priority,
            enabled: true,
            name: Some(name.into()),
        }
    }
}

// ============================================================================
// InterceptorChain
// ============================================================================

struct Entry<T: ?Sized> {
    id: InterceptorId,
    options: InterceptorOptions,
    interceptor: Arc<T>,
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            options: self.options.clone(),
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

/// Ordered request and response interceptors.
#[derive(Default)]
pub struct InterceptorChain {
    request: RwLock<Vec<Entry<dyn RequestInterceptor>>>,
    response: RwLock<Vec<Entry<dyn ResponseInterceptor>>>,
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("request", &self.request.read().len())
            .field("response", &self.response.read().len())
            .finish()
    }
}

fn insert_sorted<T: ?Sized>(entries: &mut Vec<Entry<T>>, entry: Entry<T>) {
    // Stable: after every entry with priority >= the new one.
    let index = entries
        .iter()
        .position(|e| e.options.priority < entry.options.priority)
        .unwrap_or(entries.len());
    entries.insert(index, entry);
}

impl InterceptorChain {
    /// Creates an empty chain.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request interceptor.
    pub fn add_request(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
        options: InterceptorOptions,
    ) -> InterceptorId {
        let id = InterceptorId::next();
        debug!(%id, name = ?options.name, "Adding request interceptor");
        insert_sorted(
            &mut self.request.write(),
            Entry {
                id,
                options,
                interceptor,
            },
        );
        id
    }

    /// Registers a response interceptor.
    pub fn add_response(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
        options: InterceptorOptions,
    ) -> InterceptorId {
        let id = InterceptorId::next();
        debug!(%id, name = ?options.name, "Adding response interceptor");
        insert_sorted(
            &mut self.response.write(),
            Entry {
                id,
                options,
                interceptor,
            },
        );
        id
    }

    /// Removes an interceptor by id.
    pub fn remove(&self, id: InterceptorId) -> bool {
        let mut removed = false;
        self.request.write().retain(|e| {
            let keep = e.id != id;
            removed |= !keep;
            keep
        });
        self.response.write().retain(|e| {
            let keep = e.id != id;
            removed |= !keep;
            keep
        });
        removed
    }

    /// Removes every interceptor named `name`.
    pub fn remove_by_name(&self, name: &str) -> bool {
        let mut removed = false;
        let matches = |e: &InterceptorOptions| e.name.as_deref() == Some(name);
        self.request.write().retain(|e| {
            let keep = !matches(&e.options);
            removed |= !keep;
            keep
        });
        self.response.write().retain(|e| {
            let keep = !matches(&e.options);
            removed |= !keep;
            keep
        });
        removed
    }

    /// Enables or disables every interceptor named `name`.
    ///
    /// Returns `true` if any matched.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for entry in self.request.write().iter_mut() {
            if entry.options.name.as_deref() == Some(name) {
                entry.options.enabled = enabled;
                found = true;
            }
        }
        for entry in self.response.write().iter_mut() {
            if entry.options.name.as_deref() == Some(name) {
                entry.options.enabled = enabled;
                found = true;
            }
        }
        found
    }

    /// Removes every interceptor.
    pub fn clear(&self) {
        self.request.write().clear();
        self.response.write().clear();
    }

    /// Returns request interceptor names in execution order.
    #[must_use]
    pub fn request_names(&self) -> Vec<Option<String>> {
        self.request
            .read()
            .iter()
            .map(|e| e.options.name.clone())
            .collect()
    }

    /// Returns response interceptor names in execution order.
    #[must_use]
    pub fn response_names(&self) -> Vec<Option<String>> {
        self.response
            .read()
            .iter()
            .map(|e| e.options.name.clone())
            .collect()
    }
}

// ============================================================================
// InterceptorChain - Execution
// ============================================================================

impl InterceptorChain {
    fn enabled_request(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        self.request
            .read()
            .iter()
            .filter(|e| e.options.enabled)
            .map(|e| Arc::clone(&e.interceptor))
            .collect()
    }

    fn enabled_response(&self) -> Vec<Arc<dyn ResponseInterceptor>> {
        self.response
            .read()
            .iter()
            .filter(|e| e.options.enabled)
            .map(|e| Arc::clone(&e.interceptor))
            .collect()
    }

    /// Runs the request chain.
    ///
    /// # Errors
    ///
    /// Returns the first interceptor error.
    pub async fn run_request(&self, mut request: PreparedRequest) -> ApiResult<PreparedRequest> {
        for interceptor in self.enabled_request() {
            request = interceptor.on_request(request).await?;
        }
        Ok(request)
    }

    /// Runs the response chain.
    ///
    /// An interceptor that fails gets to rewrite its own error through
    /// `on_error` before it propagates.
    ///
    /// # Errors
    ///
    /// Returns the first interceptor error.
    pub async fn run_response(&self, mut response: ApiResponse) -> ApiResult<ApiResponse> {
        for interceptor in self.enabled_response() {
            response = match interceptor.on_response(response).await {
                Ok(response) => response,
                Err(e) => return Err(interceptor.on_error(e).await),
            };
        }
        Ok(response)
    }

    /// Passes a final failure through every response interceptor.
    pub async fn run_error(&self, mut error: ApiError) -> ApiError {
        for interceptor in self.enabled_response() {
            error = interceptor.on_error(error).await;
        }
        error
    }
}

// ============================================================================
// Built-in Interceptors
// ============================================================================

/// Adds `Authorization: Bearer <token>` and forgets the token on a 401.
#[derive(Debug, Default)]
pub struct AuthInterceptor {
    token: RwLock<Option<String>>,
}

impl AuthInterceptor {
    /// Creates an interceptor with an optional token.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Sets the token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Forgets the token.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Returns the current token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

#[async_trait]
impl RequestInterceptor for AuthInterceptor {
    async fn on_request(&self, mut request: PreparedRequest) -> ApiResult<PreparedRequest> {
        if let Some(token) = self.token() {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        Ok(request)
    }
}

#[async_trait]
impl ResponseInterceptor for AuthInterceptor {
    async fn on_error(&self, error: ApiError) -> ApiError {
        if error.status_code == Some(401) || error.error_code == ErrorCode::AuthenticationError {
            warn!("Token rejected, clearing it");
            self.clear_token();
        }
        error
    }
}

/// Logs every request, response and failure at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request(&self, request: PreparedRequest) -> ApiResult<PreparedRequest> {
        debug!(method = %request.method, url = %request.url, body = ?request.body, "HTTP request");
        Ok(request)
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn on_response(&self, response: ApiResponse) -> ApiResult<ApiResponse> {
        debug!(code = %response.code, request_id = ?response.request_id, "HTTP response");
        Ok(response)
    }

    async fn on_error(&self, error: ApiError) -> ApiError {
        debug!(
            error_code = %error.error_code,
            status = ?error.status_code,
            request_id = ?error.request_id,
            "HTTP failure: {}",
            error.message
        );
        error
    }
}

/// Registers [`AuthInterceptor`] on both chains at high priority.
///
/// Returns the shared interceptor so the caller can change the token.
pub fn register_auth(chain: &InterceptorChain, token: Option<String>) -> Arc<AuthInterceptor> {
    let auth = Arc::new(AuthInterceptor::new(token));
    chain.add_request(
        Arc::clone(&auth) as Arc<dyn RequestInterceptor>,
        InterceptorOptions::named("auth-request", InterceptorPriority::High),
    );
    chain.add_response(
        Arc::clone(&auth) as Arc<dyn ResponseInterceptor>,
        InterceptorOptions::named("auth-response", InterceptorPriority::High),
    );
    auth
}

/// Registers [`LoggingInterceptor`] on both chains at low priority.
pub fn register_logging(chain: &InterceptorChain) {
    chain.add_request(
        Arc::new(LoggingInterceptor),
        InterceptorOptions::named("request-logger", InterceptorPriority::Low),
    );
    chain.add_response(
        Arc::new(LoggingInterceptor),
        InterceptorOptions::named("response-logger", InterceptorPriority::Low),
    );
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use parking_lot::Mutex;
    use reqwest::Method;
    use serde_json::json;

    struct Tag {
        tag: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl RequestInterceptor for Tag {
        async fn on_request(&self, mut request: PreparedRequest) -> ApiResult<PreparedRequest> {
            self.seen.lock().push(self.tag);
            request.set_header(format!("X-{}", self.tag), "1");
            Ok(request)
        }
    }

    struct Reject;

    #[async_trait]
    impl ResponseInterceptor for Reject {
        async fn on_response(&self, _response: ApiResponse) -> ApiResult<ApiResponse> {
            Err(ApiError::new(ErrorCode::OperationFailed, "rejected"))
        }

        async fn on_error(&self, mut error: ApiError) -> ApiError {
            error.message.push_str(" (seen)");
            error
        }
    }

    fn request() -> PreparedRequest {
        PreparedRequest {
            method: Method::GET,
            url: "http://localhost:20914/api/status".into(),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    fn tag(tag: &'static str, seen: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn RequestInterceptor> {
        Arc::new(Tag {
            tag,
            seen: Arc::clone(seen),
        })
    }

    #[tokio::test]
    async fn test_priority_order_is_stable() {
        let chain = InterceptorChain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        chain.add_request(tag("a", &seen), InterceptorOptions::named("a", InterceptorPriority::Normal));
        chain.add_request(tag("b", &seen), InterceptorOptions::named("b", InterceptorPriority::Critical));
        chain.add_request(tag("c", &seen), InterceptorOptions::named("c", InterceptorPriority::Normal));
        chain.add_request(tag("d", &seen), InterceptorOptions::named("d", InterceptorPriority::Low));

        let out = chain.run_request(request()).await.unwrap();
        assert_eq!(*seen.lock(), vec!["b", "a", "c", "d"]);
        assert_eq!(out.header("X-a"), Some("1"));
    }

    #[tokio::test]
    async fn test_disable_and_remove_by_name() {
        let chain = InterceptorChain::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = chain.add_request(tag("a", &seen), InterceptorOptions::named("a", InterceptorPriority::Normal));
        chain.add_request(tag("b", &seen), InterceptorOptions::named("b", InterceptorPriority::Normal));

        assert!(chain.set_enabled("a", false));
        chain.run_request(request()).await.unwrap();
        assert_eq!(*seen.lock(), vec!["b"]);

        assert!(chain.remove_by_name("b"));
        assert!(!chain.set_enabled("b", true));
        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(chain.request_names().is_empty());
    }

    #[test]
    fn test_response_rejection_goes_through_on_error() {
        let chain = InterceptorChain::new();
        chain.add_response(Arc::new(Reject), InterceptorOptions::default());

        let err = tokio_test::block_on(chain.run_response(ApiResponse::raw(json!(null))))
            .unwrap_err();
        assert_eq!(err.message, "rejected (seen)");
    }

    #[tokio::test]
    async fn test_auth_interceptor() {
        let chain = InterceptorChain::new();
        let auth = register_auth(&chain, Some("secret".into()));
        register_logging(&chain);

        assert_eq!(
            chain.request_names(),
            vec![Some("auth-request".into()), Some("request-logger".into())]
        );

        let out = chain.run_request(request()).await.unwrap();
        assert_eq!(out.header("authorization"), Some("Bearer secret"));

        let err = ApiError::new(ErrorCode::AuthenticationError, "expired").with_status(401);
        chain.run_error(err).await;
        assert!(auth.token().is_none());

        let out = chain.run_request(request()).await.unwrap();
        assert!(out.header("Authorization").is_none());
    }
}
