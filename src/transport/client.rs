//! Reconnecting WebSocket client and its event loop.
//!
//! One [`Client`] exists per logical endpoint. It owns at most one live
//! transport at a time, a heartbeat timer, an optional reconnect timer and
//! four handler lists.
//!
//! # Event Loop
//!
//! Each open transport gets a tokio task that handles:
//!
//! - Incoming frames (parsed as JSON, recorded, dispatched to handlers)
//! - Outgoing frames queued by [`Client::send_message`]
//! - Heartbeat `ping` envelopes after a warm-up delay
//! - The optional pong deadline
//!
//! # Lifecycle
//!
//! ```text
//!   connect() ──► open ──► loop ──┬─ disconnect() ─────────► closed (final)
//!                  ▲              │
//!                  │              └─ remote close / error ─► closed
//!                  │                                           │
//!                  └──── reconnect timer (auto_reconnect) ◄────┘
//! ```
//!
//! Every open is tagged with a session epoch. A loop that exits after its
//! session was replaced or taken by `disconnect()` never touches state.
//!
//! `disconnect()` raises a stop flag under the session lock. Reconnect
//! timers and in-flight opens check it, so nothing reopens the transport
//! until the next explicit `connect()`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::identifiers::HandlerId;
use crate::protocol::{Envelope, ParsedFrame, SubscribeRequest, parse_frame};

use super::handlers::{CloseHandler, ConnectionHandler, ErrorHandler, Handlers, MessageHandler};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for opening a transport.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Current wall-clock time in milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Snapshot of a client's connection record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    /// Whether a transport is open.
    pub is_connected: bool,
    /// Last parsed inbound frame.
    pub last_message: Option<Value>,
    /// Wall-clock ms of the last inbound frame, `0` if none.
    pub last_update: i64,
    /// Last transport error, cleared on successful open.
    pub error: Option<String>,
}

// ============================================================================
// ClientCommand
// ============================================================================

/// Internal commands for the event loop.
enum ClientCommand {
    /// Write a serialized frame.
    Send(String),
    /// Close the transport.
    Shutdown,
}

/// Why an event loop stopped.
enum LoopExit {
    /// `disconnect()` or the client was dropped.
    Requested,
    /// The server closed the transport.
    RemoteClosed,
    /// Read or write failed.
    Failed(Error),
    /// No pong before the deadline.
    HeartbeatTimeout(Duration),
}

/// The live transport's command channel, tagged by epoch.
struct Session {
    epoch: u64,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
}

// ============================================================================
// Client
// ============================================================================

/// Reconnecting WebSocket client for one endpoint.
///
/// Cheap to clone; clones share the same connection.
///
/// # Example
///
/// ```ignore
/// use maicraft_link::{Client, EndpointConfig};
///
/// let client = Client::new("PLAYER", EndpointConfig::new("ws://localhost:20914/ws/game/player"));
/// client.add_message_handler(|frame| println!("{frame}"));
/// client.connect().await?;
/// client.subscribe(500);
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    name: String,
    config: EndpointConfig,
    state: RwLock<ConnectionState>,
    session: Mutex<Option<Session>>,
    stopped: AtomicBool,
    next_epoch: AtomicU64,
    reconnect_attempts: AtomicU32,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    connect_lock: tokio::sync::Mutex<()>,
    handlers: Handlers,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.inner.name)
            .field("url", &self.inner.config.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ============================================================================
// Client - Constructor
// ============================================================================

impl Client {
    /// Creates a disconnected client.
    #[must_use]
    pub fn new(name: impl Into<String>, config: EndpointConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                name: name.into(),
                config,
                state: RwLock::new(ConnectionState::default()),
                session: Mutex::new(None),
                stopped: AtomicBool::new(false),
                next_epoch: AtomicU64::new(1),
                reconnect_attempts: AtomicU32::new(0),
                reconnect_task: Mutex::new(None),
                connect_lock: tokio::sync::Mutex::new(()),
                handlers: Handlers::default(),
            }),
        }
    }

    /// Creates a client for an ad-hoc URL with default timings.
    ///
    /// The client is named `custom-<url>`.
    #[must_use]
    pub fn custom(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(format!("custom-{url}"), EndpointConfig::new(url))
    }
}

// ============================================================================
// Client - Connection
// ============================================================================

impl Client {
    /// Opens the transport.
    ///
    /// Returns immediately if a transport is already open. Concurrent calls
    /// never open two transports.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than 10s
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(&self) -> Result<()> {
        self.inner.stopped.store(false, Ordering::SeqCst);
        self.inner.open().await
    }

    /// Closes the transport and cancels any pending reconnect.
    ///
    /// Never triggers reconnection. Connection handlers see `false` and close
    /// handlers run if a transport was open.
    pub fn disconnect(&self) {
        let session = {
            let mut session = self.inner.session.lock();
            self.inner.stopped.store(true, Ordering::SeqCst);
            session.take()
        };
        self.inner.cancel_reconnect();
        let was_connected = {
            let mut state = self.inner.state.write();
            std::mem::replace(&mut state.is_connected, false)
        };

        if let Some(session) = session {
            let _ = session.command_tx.send(ClientCommand::Shutdown);
            info!(endpoint = %self.inner.name, "WebSocket disconnected");
        }

        if was_connected {
            self.inner.handlers.emit_connection(false);
            self.inner.handlers.emit_close();
        }
    }

    /// Returns `true` if a transport is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.read().is_connected
    }
}

// ============================================================================
// Client - Messaging
// ============================================================================

impl Client {
    /// Serializes `payload` and queues it on the open transport.
    ///
    /// Returns `false` (and logs) when disconnected or when serialization
    /// fails. Nothing is queued for later.
    pub fn send_message<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                error!(endpoint = %self.inner.name, error = %e, "Failed to serialize message");
                return false;
            }
        };

        let session = self.inner.session.lock();
        let Some(session) = session.as_ref() else {
            warn!(endpoint = %self.inner.name, "WebSocket not connected, message dropped");
            return false;
        };

        session.command_tx.send(ClientCommand::Send(json)).is_ok()
    }

    /// Sends `{"type":"subscribe","update_interval":<ms>}`.
    #[inline]
    pub fn subscribe(&self, update_interval_ms: u64) -> bool {
        self.send_message(&SubscribeRequest::interval(update_interval_ms))
    }

    /// Sends an endpoint-specific subscribe envelope.
    #[inline]
    pub fn send_subscription(&self, request: &SubscribeRequest) -> bool {
        self.send_message(request)
    }

    /// Sends `{"type":"unsubscribe"}`.
    #[inline]
    pub fn unsubscribe(&self) -> bool {
        self.send_message(&Envelope::unsubscribe())
    }
}

// ============================================================================
// Client - Handlers
// ============================================================================

impl Client {
    /// Registers a handler for every parsed inbound frame.
    pub fn add_message_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.handlers.message.add(Arc::new(handler) as Arc<MessageHandler>)
    }

    /// Removes a message handler.
    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.message.remove(id)
    }

    /// Registers a handler for open (`true`) and close (`false`).
    pub fn add_connection_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .connection
            .add(Arc::new(handler) as Arc<ConnectionHandler>)
    }

    /// Removes a connection handler.
    pub fn remove_connection_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.connection.remove(id)
    }

    /// Registers a handler for transport errors.
    pub fn add_error_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.inner.handlers.error.add(Arc::new(handler) as Arc<ErrorHandler>)
    }

    /// Removes an error handler.
    pub fn remove_error_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.error.remove(id)
    }

    /// Registers a handler that runs after every close.
    pub fn add_close_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.handlers.close.add(Arc::new(handler) as Arc<CloseHandler>)
    }

    /// Removes a close handler.
    pub fn remove_close_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.close.remove(id)
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the endpoint name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Returns the endpoint config.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Returns a snapshot of the connection record.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.read().clone()
    }

    /// Returns the last parsed inbound frame.
    #[must_use]
    pub fn last_message(&self) -> Option<Value> {
        self.inner.state.read().last_message.clone()
    }

    /// Returns the wall-clock ms of the last inbound frame.
    #[inline]
    #[must_use]
    pub fn last_update(&self) -> i64 {
        self.inner.state.read().last_update
    }

    /// Returns the last recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.read().error.clone()
    }

    /// Returns the reconnect attempts since the last successful open.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Returns `true` if both handles share one connection.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// ClientInner - Open / Close
// ============================================================================

impl ClientInner {
    async fn open(self: &Arc<Self>) -> Result<()> {
        let _guard = self.connect_lock.lock().await;

        if self.session.lock().is_some() {
            return Ok(());
        }

        debug!(endpoint = %self.name, url = %self.config.url, "Opening WebSocket");

        let mut ws_stream = match timeout(CONNECT_TIMEOUT, connect_async(self.config.url.as_str())).await
        {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => return Err(self.record_open_failure(Error::WebSocket(e))),
            Err(_) => {
                let err = Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64);
                return Err(self.record_open_failure(err));
            }
        };

        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let installed = {
            let mut session = self.session.lock();
            if self.stopped.load(Ordering::SeqCst) {
                false
            } else {
                *session = Some(Session { epoch, command_tx });
                true
            }
        };

        if !installed {
            debug!(endpoint = %self.name, "Disconnected while opening, dropping transport");
            let _ = ws_stream.close(None).await;
            return Err(Error::connection(format!("{} was disconnected while opening", self.name)));
        }

        {
            let mut state = self.state.write();
            state.is_connected = true;
            state.error = None;
        }
        self.reconnect_attempts.store(0, Ordering::SeqCst);

        tokio::spawn(run_event_loop(
            Arc::downgrade(self),
            ws_stream,
            command_rx,
            epoch,
            self.config.clone(),
        ));

        info!(endpoint = %self.name, url = %self.config.url, "WebSocket connected");
        self.handlers.emit_connection(true);

        Ok(())
    }

    fn record_open_failure(&self, err: Error) -> Error {
        warn!(endpoint = %self.name, url = %self.config.url, error = %err, "WebSocket connect failed");
        self.state.write().error = Some(err.to_string());
        self.handlers.emit_error(&err);
        err
    }

    /// Runs when an event loop stops on its own.
    fn on_transport_closed(self: &Arc<Self>, epoch: u64, exit: LoopExit) {
        let error = match exit {
            LoopExit::Requested => return,
            LoopExit::RemoteClosed => None,
            LoopExit::Failed(e) => Some(e),
            LoopExit::HeartbeatTimeout(deadline) => Some(Error::heartbeat_timeout(
                self.name.clone(),
                deadline.as_millis() as u64,
            )),
        };

        {
            let mut session = self.session.lock();
            match session.as_ref() {
                Some(current) if current.epoch == epoch => *session = None,
                _ => return,
            }
        }

        {
            let mut state = self.state.write();
            state.is_connected = false;
            if let Some(ref e) = error {
                state.error = Some(e.to_string());
            }
        }

        info!(endpoint = %self.name, "WebSocket closed");

        if let Some(ref e) = error {
            self.handlers.emit_error(e);
        }
        self.handlers.emit_connection(false);
        self.handlers.emit_close();

        self.schedule_reconnect();
    }
}

// ============================================================================
// ClientInner - Reconnect
// ============================================================================

impl ClientInner {
    fn schedule_reconnect(self: &Arc<Self>) {
        if !self.config.auto_reconnect || self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > self.config.max_reconnect_attempts {
            let err = Error::reconnect_exhausted(self.name.clone(), attempt - 1);
            warn!(endpoint = %self.name, attempts = attempt - 1, "Giving up on reconnect");
            self.state.write().error = Some(err.to_string());
            self.handlers.emit_error(&err);
            return;
        }

        let delay = self.config.reconnect_delay(attempt);
        debug!(endpoint = %self.name, attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.stopped.load(Ordering::SeqCst) {
                return;
            }

            if let Err(e) = inner.open().await {
                debug!(endpoint = %inner.name, error = %e, "Reconnect attempt failed");
                inner.schedule_reconnect();
            }
        });

        *self.reconnect_task.lock() = Some(handle);
    }

    fn cancel_reconnect(&self) {
        if let Some(handle) = self.reconnect_task.lock().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// ClientInner - Inbound
// ============================================================================

impl ClientInner {
    /// Records and dispatches one text frame.
    ///
    /// Returns `true` if the frame was a pong.
    fn handle_text(&self, text: &str) -> bool {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(endpoint = %self.name, error = %e, "Dropping unparsable frame");
                return false;
            }
        };

        let is_pong = matches!(parse_frame(&frame), ParsedFrame::Pong { .. });

        {
            let mut state = self.state.write();
            state.last_message = Some(frame.clone());
            state.last_update = now_ms();
        }

        self.handlers.emit_message(&frame);
        is_pong
    }
}

// ============================================================================
// Event Loop
// ============================================================================

async fn run_event_loop(
    inner: Weak<ClientInner>,
    ws_stream: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    epoch: u64,
    config: EndpointConfig,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let heartbeat_enabled = config.enable_heartbeat && !config.heartbeat_interval.is_zero();
    let period = config.heartbeat_interval.max(Duration::from_millis(1));
    let mut heartbeat = interval_at(Instant::now() + config.heartbeat_warmup, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut pong_deadline: Option<Instant> = None;

    let exit = loop {
        tokio::select! {
            biased;

            // Commands from the public API
            command = command_rx.recv() => {
                match command {
                    Some(ClientCommand::Send(json)) => {
                        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                            break LoopExit::Failed(Error::WebSocket(e));
                        }
                    }

                    Some(ClientCommand::Shutdown) | None => {
                        let _ = ws_write.close().await;
                        break LoopExit::Requested;
                    }
                }
            }

            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let Some(inner) = inner.upgrade() else {
                            break LoopExit::Requested;
                        };
                        if inner.handle_text(&text) {
                            pong_deadline = None;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break LoopExit::RemoteClosed;
                    }

                    Some(Err(e)) => {
                        break LoopExit::Failed(Error::WebSocket(e));
                    }

                    None => {
                        break LoopExit::RemoteClosed;
                    }

                    // Binary, Ping, Pong
                    Some(Ok(_)) => {}
                }
            }

            // Heartbeat
            _ = heartbeat.tick(), if heartbeat_enabled => {
                let ping = Envelope::ping(now_ms());
                let json = match serde_json::to_string(&ping) {
                    Ok(json) => json,
                    Err(e) => break LoopExit::Failed(Error::Json(e)),
                };
                if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                    break LoopExit::Failed(Error::WebSocket(e));
                }
                trace!(epoch, "Heartbeat sent");

                if pong_deadline.is_none()
                    && let Some(pong_timeout) = config.pong_timeout
                {
                    pong_deadline = Some(Instant::now() + pong_timeout);
                }
            }

            // Liveness
            _ = sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                let waited = config.pong_timeout.unwrap_or_default();
                warn!(epoch, "No heartbeat reply, closing transport");
                let _ = ws_write.close().await;
                break LoopExit::HeartbeatTimeout(waited);
            }
        }
    };

    debug!(epoch, "Event loop terminated");

    if let Some(inner) = inner.upgrade() {
        inner.on_transport_closed(epoch, exit);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_new_client_is_disconnected() {
        let client = Client::new("PLAYER", EndpointConfig::new("ws://127.0.0.1:1/ws"));
        assert!(!client.is_connected());
        assert_eq!(client.name(), "PLAYER");
        assert_eq!(client.url(), "ws://127.0.0.1:1/ws");
        assert_eq!(client.state(), ConnectionState::default());
    }

    #[test]
    fn test_custom_client_name() {
        let client = Client::custom("ws://example.test/ws");
        assert_eq!(client.name(), "custom-ws://example.test/ws");
    }

    #[test]
    fn test_send_while_disconnected_returns_false() {
        let client = Client::new("LOGS", EndpointConfig::new("ws://127.0.0.1:1/ws/logs"));
        assert!(!client.send_message(&serde_json::json!({ "type": "hello" })));
        assert!(!client.subscribe(1000));
        assert!(!client.unsubscribe());
    }

    #[test]
    fn test_disconnect_when_never_connected_is_silent() {
        let client = Client::new("WORLD", EndpointConfig::new("ws://127.0.0.1:1/ws"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.add_connection_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.disconnect();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Client::new("STATUS", EndpointConfig::new("ws://127.0.0.1:1/ws/status"));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_handle_text_records_and_detects_pong() {
        let client = Client::new("GENERAL", EndpointConfig::new("ws://127.0.0.1:1/ws"));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        client.add_message_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(client.inner.handle_text(r#"{"type":"pong","timestamp":1}"#));
        assert!(!client.inner.handle_text(r#"{"type":"status"}"#));
        assert!(!client.inner.handle_text("not json"));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(
            client.last_message().unwrap()["type"],
            serde_json::json!("status")
        );
        assert!(client.last_update() > 0);
    }

    #[tokio::test]
    async fn test_close_after_disconnect_schedules_nothing() {
        let config = EndpointConfig::new("ws://127.0.0.1:1/ws")
            .with_reconnect_interval(Duration::from_millis(10));
        let client = Client::new("PLAYER", config);
        client.disconnect();

        // An event loop that closed while disconnect() ran ends up here.
        client.inner.schedule_reconnect();

        assert!(client.inner.reconnect_task.lock().is_none());
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_pending_reconnect_stands_down_when_stopped() {
        let config = EndpointConfig::new("ws://127.0.0.1:1/ws")
            .with_reconnect_interval(Duration::from_millis(10));
        let client = Client::new("WORLD", config);
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        client.add_error_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.inner.schedule_reconnect();
        let handle = client.inner.reconnect_task.lock().take().unwrap();

        // The timer escaped cancel_reconnect(); only the stop flag guards it.
        client.inner.stopped.store(true, Ordering::SeqCst);
        handle.await.unwrap();

        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert!(client.inner.reconnect_task.lock().is_none());
    }

    #[tokio::test]
    async fn test_connect_clears_stop_flag() {
        let config = EndpointConfig::new("ws://127.0.0.1:1/ws").with_auto_reconnect(false);
        let client = Client::new("STATUS", config);
        client.disconnect();
        assert!(client.inner.stopped.load(Ordering::SeqCst));

        assert!(client.connect().await.is_err());
        assert!(!client.inner.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_failure_records_error() {
        let config = EndpointConfig::new("ws://127.0.0.1:1/ws").with_auto_reconnect(false);
        let client = Client::new("MARKER", config);
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        client.add_error_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(client.connect().await.is_err());
        assert!(!client.is_connected());
        assert!(client.last_error().is_some());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
