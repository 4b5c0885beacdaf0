//! Client behavior against an in-process WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use maicraft_link::{Client, EndpointConfig, Error, Registry, TaskManager};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Test Server
// ============================================================================

/// Records every text frame and answers `ping` with `pong`.
struct TestServer {
    addr: SocketAddr,
    frames: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    kick: broadcast::Sender<()>,
}

impl TestServer {
    async fn start(greeting: Option<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (kick, _) = broadcast::channel(4);

        let server = Self {
            addr,
            frames: Arc::clone(&frames),
            connections: Arc::clone(&connections),
            kick: kick.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                connections.fetch_add(1, Ordering::SeqCst);

                let frames = Arc::clone(&frames);
                let greeting = greeting.clone();
                let mut kicked = kick.subscribe();

                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    if let Some(greeting) = greeting {
                        let _ = write.send(Message::Text(greeting.to_string().into())).await;
                    }

                    loop {
                        tokio::select! {
                            _ = kicked.recv() => {
                                let _ = write.close().await;
                                break;
                            }
                            message = read.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    let frame: Value = serde_json::from_str(&text).unwrap();
                                    if frame["type"] == "ping" {
                                        let pong = json!({ "type": "pong", "timestamp": frame["timestamp"] });
                                        let _ = write.send(Message::Text(pong.to_string().into())).await;
                                    }
                                    frames.lock().push(frame);
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                });
            }
        });

        server
    }

    fn url(&self) -> String {
        format!("ws://{}/ws/test", self.addr)
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn count(&self, kind: &str) -> usize {
        self.frames.lock().iter().filter(|f| f["type"] == kind).count()
    }

    fn kick_all(&self) {
        let _ = self.kick.send(());
    }
}

/// Reads frames and never answers.
async fn mute_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    addr
}

/// Serves one connection, closes it, and stops listening.
async fn one_shot_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        drop(listener);

        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };
        sleep(Duration::from_millis(50)).await;
        let _ = ws.close(None).await;
    });

    addr
}

fn config(url: String) -> EndpointConfig {
    EndpointConfig::new(url)
        .with_heartbeat_interval(Duration::from_millis(50))
        .with_heartbeat_warmup(Duration::from_millis(10))
        .with_reconnect_interval(Duration::from_millis(50))
        .with_max_reconnect_attempts(5)
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_receives_frames_and_dispatches() {
    let server = TestServer::start(Some(json!({ "type": "player_update", "data": { "health": 18 } }))).await;
    let client = Client::new("PLAYER", config(server.url()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.add_message_handler(move |frame| sink.lock().push(frame.clone()));

    client.connect().await.expect("connect");
    assert!(client.is_connected());

    assert!(wait_until(Duration::from_secs(2), || !seen.lock().is_empty()).await);
    assert_eq!(seen.lock()[0]["data"]["health"], 18);
    assert_eq!(client.last_message().unwrap()["type"], "player_update");
    assert!(client.last_update() > 0);

    client.disconnect();
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = TestServer::start(None).await;
    let client = Client::new("WORLD", config(server.url()));

    let opened = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opened);
    client.add_connection_handler(move |connected| {
        if connected {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let (a, b) = tokio::join!(client.connect(), client.connect());
    a.expect("first connect");
    b.expect("second connect");
    client.connect().await.expect("third connect");

    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    client.disconnect();
}

#[tokio::test]
async fn test_registry_returns_same_client() {
    let registry = Registry::default();
    let a = registry.get_manager(maicraft_link::Endpoint::Player);
    let b = registry.get_manager(maicraft_link::Endpoint::Player);
    assert!(a.ptr_eq(&b));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_send_while_disconnected_is_dropped() {
    let server = TestServer::start(None).await;
    let client = Client::new("LOGS", config(server.url()));

    assert!(!client.send_message(&json!({ "type": "hello" })));
    assert!(!client.subscribe(500));

    client.connect().await.expect("connect");
    assert!(client.subscribe(500));
    assert!(wait_until(Duration::from_secs(2), || server.count("subscribe") == 1).await);

    client.disconnect();
    assert!(!client.send_message(&json!({ "type": "hello" })));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.count("hello"), 0);
}

#[tokio::test]
async fn test_heartbeat_stops_after_disconnect() {
    let server = TestServer::start(None).await;
    let client = Client::new("STATUS", config(server.url()));

    client.connect().await.expect("connect");
    assert!(wait_until(Duration::from_secs(2), || server.count("ping") >= 2).await);

    client.disconnect();
    sleep(Duration::from_millis(50)).await;
    let pings = server.count("ping");

    sleep(Duration::from_millis(300)).await;
    assert_eq!(server.count("ping"), pings);
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = TestServer::start(None).await;
    let client = Client::new("EVENTS", config(server.url()));

    let opened = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opened);
    client.add_connection_handler(move |connected| {
        if connected {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    client.connect().await.expect("connect");
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    server.kick_all();

    assert!(wait_until(Duration::from_secs(3), || server.connections() == 2).await);
    assert!(wait_until(Duration::from_secs(2), || client.is_connected()).await);
    assert_eq!(opened.load(Ordering::SeqCst), 2);

    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_does_not_reconnect() {
    let server = TestServer::start(None).await;
    let client = Client::new("GENERAL", config(server.url()));

    let closes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closes);
    client.add_close_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect().await.expect("connect");
    client.disconnect();
    client.disconnect();

    sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connections(), 1);
    assert!(!client.is_connected());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connect_failure_reports_error() {
    // Nothing listens on port 1.
    let client = Client::new("MARKER", config("ws://127.0.0.1:1/ws".to_string()).with_auto_reconnect(false));

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

#[tokio::test]
async fn test_missing_pong_closes_transport() {
    let addr = mute_server().await;
    let config = config(format!("ws://{addr}/ws/status"))
        .with_pong_timeout(Some(Duration::from_millis(100)))
        .with_auto_reconnect(false);
    let client = Client::new("STATUS", config);

    let timed_out = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&timed_out);
    client.add_error_handler(move |error| {
        if matches!(error, Error::HeartbeatTimeout { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    client.connect().await.expect("connect");
    assert!(wait_until(Duration::from_secs(2), || !client.is_connected()).await);
    assert_eq!(timed_out.load(Ordering::SeqCst), 1);
    assert!(client.last_error().unwrap().contains("No heartbeat reply from STATUS"));
}

#[tokio::test]
async fn test_pong_keeps_transport_open() {
    let server = TestServer::start(None).await;
    let config = config(server.url()).with_pong_timeout(Some(Duration::from_millis(100)));
    let client = Client::new("STATUS", config);

    client.connect().await.expect("connect");
    sleep(Duration::from_millis(400)).await;
    assert!(client.is_connected());
    assert_eq!(server.connections(), 1);

    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    let addr = one_shot_server().await;
    let config = EndpointConfig::new(format!("ws://{addr}/ws/world"))
        .with_heartbeat(false)
        .with_reconnect_interval(Duration::from_millis(20))
        .with_max_reconnect_attempts(2);
    let client = Client::new("WORLD", config);

    let exhausted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exhausted);
    client.add_error_handler(move |error| {
        if matches!(error, Error::ReconnectExhausted { attempts: 2, .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    client.connect().await.expect("connect");
    assert!(wait_until(Duration::from_secs(3), || exhausted.load(Ordering::SeqCst) == 1).await);

    sleep(Duration::from_millis(200)).await;
    assert!(!client.is_connected());
    assert_eq!(exhausted.load(Ordering::SeqCst), 1);
    assert_eq!(client.last_error().unwrap(), "Reconnect to WORLD gave up after 2 attempts");
}

#[tokio::test]
async fn test_task_commands_reach_the_server() {
    let server = TestServer::start(None).await;
    let tasks = TaskManager::new(Client::new("TASK_MANAGER", config(server.url())));

    assert!(matches!(tasks.get_tasks(), Err(Error::Connection { .. })));

    tasks.client().connect().await.expect("connect");
    tasks.get_tasks().unwrap();
    tasks.add_task("collect wood", "16 oak logs", Some("")).unwrap();
    tasks.update_task_progress("t-1", "8 logs").unwrap();
    tasks.mark_task_done("t-1").unwrap();
    tasks.delete_task("t-1").unwrap();

    assert!(wait_until(Duration::from_secs(2), || server.count("delete_task") == 1).await);

    let sent: Vec<Value> = server
        .frames
        .lock()
        .iter()
        .filter(|f| f["type"] != "ping")
        .cloned()
        .collect();
    assert_eq!(
        sent,
        vec![
            json!({ "type": "get_tasks" }),
            json!({ "type": "add_task", "details": "collect wood", "done_criteria": "16 oak logs" }),
            json!({ "type": "update_task", "task_id": "t-1", "progress": "8 logs" }),
            json!({ "type": "mark_done", "task_id": "t-1" }),
            json!({ "type": "delete_task", "task_id": "t-1" }),
        ]
    );

    tasks.client().disconnect();
    assert!(matches!(tasks.mark_task_done("t-1"), Err(Error::Connection { .. })));
}
