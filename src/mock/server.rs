//! Local WebSocket server that imitates the Maicraft agent.
//!
//! # Feeds
//!
//! | Path | Pushes |
//! |------|--------|
//! | `/ws/game/player` | `player_update` every player interval |
//! | `/ws/game/world` | `world_update` every world interval |
//! | anything else | welcome log, then one shared log line per log interval |
//!
//! The shared log feed plays the scripted lines in order before falling
//! back to random ones. It only advances while at least one log client is
//! connected. Every client may send `subscribe` (acknowledged with a log
//! line) and `ping` (answered with `pong`).
//!
//! # Connection Flow
//!
//! 1. [`MockServer::bind`] binds `127.0.0.1` (port `0` for random)
//! 2. [`MockServer::spawn`] starts the accept loop
//! 3. Each client gets its own task with a transport-level heartbeat
//! 4. [`MockServerHandle::shutdown`] closes every client with code 1000

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at, sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Envelope, SubscribeRequest, message_type};
use crate::transport::now_ms;

use super::generators;

// ============================================================================
// Constants
// ============================================================================

/// Port the dashboard expects for the alternate log feed.
pub const DEFAULT_MOCK_PORT: u16 = 8000;

const PLAYER_PATH: &str = "/ws/game/player";
const WORLD_PATH: &str = "/ws/game/world";

/// `(level, module, message)` lines played before the random ones.
const SCRIPTED_LOGS: &[(&str, &str, &str)] = &[
    ("INFO", "MCPClient", "MCP client connected"),
    ("INFO", "MaiAgent", "Agent initialized"),
    ("WARNING", "System", "High memory usage detected"),
    ("ERROR", "TaskManager", "Task failed: target block not found"),
    ("SUCCESS", "MCPClient", "Mined a diamond ore"),
    ("INFO", "EventHandler", "Player EvilMai collected 1 diamond"),
    ("DEBUG", "MaiAgent", "Running path planning..."),
    ("INFO", "System", "System status check finished"),
];

const RANDOM_LEVELS: &[&str] = &[
    "TRACE", "DEBUG", "INFO", "SUCCESS", "WARNING", "ERROR", "CRITICAL",
];

const RANDOM_MODULES: &[&str] = &[
    "MCPClient",
    "MaiAgent",
    "System",
    "TaskManager",
    "EventHandler",
];

const RANDOM_MESSAGES: &[&str] = &[
    "Scanning surroundings...",
    "Decision loop running...",
    "Moving to (100, 64, 200)",
    "Collected 3 cobblestone",
    "Crafted a crafting table",
    "Health dropping",
    "Computing path...",
    "Task progress: 45%",
    "Inventory sorted",
    "Talking to the MCP server...",
    "Recovered from an unexpected state",
    "Resource monitor normal",
];

// ============================================================================
// MockConfig
// ============================================================================

/// Push and heartbeat periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockConfig {
    /// Delay before the second welcome line.
    pub welcome_delay: Duration,
    /// Shared log feed period.
    pub log_interval: Duration,
    /// `player_update` period.
    pub player_interval: Duration,
    /// `world_update` period.
    pub world_interval: Duration,
    /// Transport ping period; a client silent for a whole period is dropped.
    pub heartbeat_interval: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            welcome_delay: Duration::from_secs(1),
            log_interval: Duration::from_secs(2),
            player_interval: Duration::from_secs(1),
            world_interval: Duration::from_secs(2),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// MockServer
// ============================================================================

/// A bound mock server that has not started accepting yet.
///
/// # Example
///
/// ```ignore
/// use maicraft_link::mock::MockServer;
///
/// let server = MockServer::bind(0).await?;
/// let handle = server.spawn();
/// println!("{}", handle.ws_url("/ws/logs"));
/// handle.shutdown().await;
/// ```
pub struct MockServer {
    listener: TcpListener,
    addr: SocketAddr,
    config: MockConfig,
}

impl MockServer {
    /// Binds `127.0.0.1:port`. Use port `0` for a random port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        debug!(port = addr.port(), "Mock server bound");

        Ok(Self {
            listener,
            addr,
            config: MockConfig::default(),
        })
    }

    /// Replaces the push and heartbeat periods.
    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting clients in the background.
    #[must_use]
    pub fn spawn(self) -> MockServerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let addr = self.addr;
        let task = tokio::spawn(accept_loop(self.listener, self.config, shutdown_rx));

        info!(%addr, "Mock server listening");

        MockServerHandle {
            addr,
            shutdown_tx,
            task,
        }
    }
}

// ============================================================================
// MockServerHandle
// ============================================================================

/// Handle to a running mock server.
///
/// Dropping the handle leaves the server running until the runtime stops.
#[derive(Debug)]
pub struct MockServerHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MockServerHandle {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `ws://127.0.0.1:{port}{path}`.
    #[inline]
    #[must_use]
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    /// Closes every client with code 1000 and stops accepting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Mock server task failed");
        }
        info!(addr = %self.addr, "Mock server stopped");
    }
}

// ============================================================================
// Accept Loop
// ============================================================================

async fn accept_loop(
    listener: TcpListener,
    config: MockConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let (log_tx, _) = broadcast::channel::<String>(64);
    let mut clients = JoinSet::new();

    let ticker = tokio::spawn(log_ticker(log_tx.clone(), config.log_interval, shutdown.clone()));

    loop {
        tokio::select! {
            Ok(()) = shutdown.changed() => break,

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "TCP connection accepted");
                        clients.spawn(serve_client(stream, peer, config, log_tx.clone(), shutdown.clone()));
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                }
            }

            // Reap finished clients so the set does not grow.
            Some(_) = clients.join_next(), if !clients.is_empty() => {}
        }
    }

    while clients.join_next().await.is_some() {}
    let _ = ticker.await;
}

/// Produces the shared log line once per period while anyone listens.
async fn log_ticker(
    tx: broadcast::Sender<String>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut index = 0usize;

    loop {
        tokio::select! {
            Ok(()) = shutdown.changed() => break,
            _ = tick.tick() => {
                if tx.receiver_count() == 0 {
                    continue;
                }

                let line = scripted_or_random_log(index);
                index += 1;
                trace!(level = %line["level"], module = %line["module"], "Broadcasting log");
                let _ = tx.send(line.to_string());
            }
        }
    }
}

/// The `index`-th line of the shared log feed.
#[must_use]
pub fn scripted_or_random_log(index: usize) -> Value {
    match SCRIPTED_LOGS.get(index) {
        Some(&(level, module, message)) => log_line(level, module, message),
        None => {
            let mut rng = rand::rng();
            let level = RANDOM_LEVELS[rng.random_range(0..RANDOM_LEVELS.len())];
            let module = RANDOM_MODULES[rng.random_range(0..RANDOM_MODULES.len())];
            let message = RANDOM_MESSAGES[rng.random_range(0..RANDOM_MESSAGES.len())];
            log_line(level, module, message)
        }
    }
}

fn log_line(level: &str, module: &str, message: &str) -> Value {
    json!({
        "type": "log",
        "timestamp": now_ms(),
        "level": level,
        "module": module,
        "message": message,
    })
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Logs,
    Player,
    World,
}

impl Feed {
    fn from_path(path: &str) -> Self {
        match path {
            PLAYER_PATH => Self::Player,
            WORLD_PATH => Self::World,
            _ => Self::Logs,
        }
    }
}

/// Builds the reply to one client text frame, if any.
fn reply_to(text: &str) -> Option<Value> {
    let frame: Value = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Unparsable client frame");
            return None;
        }
    };

    match message_type(&frame) {
        Some("subscribe") => {
            let request: SubscribeRequest = serde_json::from_value(frame).unwrap_or_default();
            let levels = request.levels.map_or_else(|| "all".to_string(), |l| l.join(", "));
            let modules = request.modules.map_or_else(|| "all".to_string(), |m| m.join(", "));
            info!(%levels, %modules, "Client subscribed");
            Some(log_line(
                "INFO",
                "System",
                &format!("Subscribed. Levels: {levels}, modules: {modules}"),
            ))
        }
        Some("ping") => Some(Envelope::pong(now_ms()).into_value()),
        other => {
            debug!(kind = ?other, "Ignoring client frame");
            None
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    config: MockConfig,
    log_tx: broadcast::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut path = String::new();
    let record_path = |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };
    let ws_stream = match accept_hdr_async(stream, record_path)
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            let error = Error::connection(format!("WebSocket upgrade failed: {e}"));
            warn!(%peer, %error, "Handshake failed");
            return;
        }
    };

    let feed = Feed::from_path(&path);
    info!(%peer, %path, ?feed, "Client connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut log_rx = log_tx.subscribe();

    let push_period = match feed {
        Feed::Player => config.player_interval,
        Feed::World => config.world_interval,
        Feed::Logs => config.log_interval,
    };
    let mut push = interval(push_period);
    push.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut heartbeat = interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut alive = true;

    let welcome = sleep(config.welcome_delay);
    tokio::pin!(welcome);
    let mut welcomed = feed != Feed::Logs;

    if feed == Feed::Logs {
        let hello = log_line("INFO", "System", "Welcome to the Maicraft mock log server");
        if ws_write.send(Message::Text(hello.to_string().into())).await.is_err() {
            return;
        }
    }

    loop {
        let outgoing: Option<Value> = tokio::select! {
            Ok(()) = shutdown.changed() => {
                let close = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "server shutting down".into(),
                };
                let _ = ws_write.send(Message::Close(Some(close))).await;
                break;
            }

            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => reply_to(&text),
                    Some(Ok(Message::Pong(_))) => {
                        alive = true;
                        None
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(%peer, ?frame, "Client closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(%peer, error = %e, "Client transport error");
                        break;
                    }
                    None => break,
                    // Binary, Ping (answered by tungstenite), Frame
                    Some(Ok(_)) => None,
                }
            }

            () = &mut welcome, if !welcomed => {
                welcomed = true;
                Some(log_line("INFO", "System", "Log stream ready"))
            }

            line = log_rx.recv(), if feed == Feed::Logs => {
                match line {
                    Ok(line) => Some(Value::String(line)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(%peer, skipped, "Log client lagging");
                        None
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            _ = push.tick(), if feed != Feed::Logs => {
                let mut rng = rand::rng();
                Some(match feed {
                    Feed::Player => generators::player_frame(&mut rng),
                    _ => generators::world_frame(&mut rng),
                })
            }

            _ = heartbeat.tick() => {
                if !alive {
                    warn!(%peer, "Client missed a heartbeat, dropping");
                    break;
                }
                alive = false;
                if ws_write.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                None
            }
        };

        let Some(outgoing) = outgoing else {
            continue;
        };

        // Broadcast lines arrive pre-serialized.
        let text = match outgoing {
            Value::String(text) => text,
            other => other.to_string(),
        };
        if ws_write.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }

    info!(%peer, "Client disconnected");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_tungstenite::connect_async;

    fn fast() -> MockConfig {
        MockConfig {
            welcome_delay: Duration::from_millis(20),
            log_interval: Duration::from_millis(30),
            player_interval: Duration::from_millis(30),
            world_interval: Duration::from_millis(30),
            heartbeat_interval: Duration::from_secs(30),
        }
    }

    async fn next_json<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("frame within 5s")
                .expect("stream open")
                .expect("valid frame");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[test]
    fn test_scripted_then_random() {
        let first = scripted_or_random_log(0);
        assert_eq!(first["message"], "MCP client connected");
        assert_eq!(first["type"], "log");

        let random = scripted_or_random_log(SCRIPTED_LOGS.len());
        assert!(RANDOM_LEVELS.contains(&random["level"].as_str().unwrap()));
        assert!(RANDOM_MODULES.contains(&random["module"].as_str().unwrap()));
    }

    #[test]
    fn test_feed_from_path() {
        assert_eq!(Feed::from_path("/ws/game/player"), Feed::Player);
        assert_eq!(Feed::from_path("/ws/game/world"), Feed::World);
        assert_eq!(Feed::from_path("/ws/logs"), Feed::Logs);
        assert_eq!(Feed::from_path("/anything"), Feed::Logs);
    }

    #[test]
    fn test_replies() {
        let ack = reply_to(r#"{"type":"subscribe","levels":["INFO","ERROR"]}"#).unwrap();
        assert_eq!(ack["type"], "log");
        assert!(ack["message"].as_str().unwrap().contains("INFO, ERROR"));
        assert!(ack["message"].as_str().unwrap().contains("modules: all"));

        let pong = reply_to(r#"{"type":"ping","timestamp":1}"#).unwrap();
        assert_eq!(pong["type"], "pong");

        assert!(reply_to(r#"{"type":"other"}"#).is_none());
        assert!(reply_to("not json").is_none());
    }

    #[tokio::test]
    async fn test_log_feed() {
        let handle = MockServer::bind(0).await.unwrap().with_config(fast()).spawn();
        let (mut ws, _) = connect_async(handle.ws_url("/ws/logs")).await.unwrap();

        let welcome = next_json(&mut ws).await;
        assert!(welcome["message"].as_str().unwrap().starts_with("Welcome"));

        ws.send(Message::Text(r#"{"type":"ping","timestamp":5}"#.into()))
            .await
            .unwrap();

        let mut saw_pong = false;
        let mut saw_scripted = false;
        for _ in 0..10 {
            let frame = next_json(&mut ws).await;
            saw_pong |= frame["type"] == "pong";
            saw_scripted |= frame["message"] == "MCP client connected";
            if saw_pong && saw_scripted {
                break;
            }
        }
        assert!(saw_pong);
        assert!(saw_scripted);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_player_feed() {
        let handle = MockServer::bind(0).await.unwrap().with_config(fast()).spawn();
        let (mut ws, _) = connect_async(handle.ws_url("/ws/game/player")).await.unwrap();

        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "player_update");
        assert_eq!(frame["data"]["max_health"], 20);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_with_normal_code() {
        let handle = MockServer::bind(0).await.unwrap().with_config(fast()).spawn();
        let (mut ws, _) = connect_async(handle.ws_url("/ws/game/world")).await.unwrap();
        let _ = next_json(&mut ws).await;

        handle.shutdown().await;

        let mut code = None;
        while let Ok(Some(Ok(message))) =
            tokio::time::timeout(Duration::from_secs(5), ws.next()).await
        {
            if let Message::Close(frame) = message {
                code = frame.map(|f| f.code);
                break;
            }
        }
        assert_eq!(code, Some(CloseCode::Normal));
    }
}
