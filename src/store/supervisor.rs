//! Connection supervisor.
//!
//! The [`Hub`] ties the registry to the data store: it connects every
//! dashboard endpoint in parallel, attaches one set of bookkeeping handlers
//! per endpoint, and sends each endpoint's default subscription shortly
//! after it opens.
//!
//! # Default Subscriptions
//!
//! | Endpoint | Envelope |
//! |----------|----------|
//! | `PLAYER` | `update_interval: 500` |
//! | `WORLD` | `update_interval: 2000` |
//! | `MARKER` | `update_interval: 0` |
//! | `LOGS`, `LOGS_ALT`, `MCP_LOGS` | `levels: [INFO, WARN, ERROR, DEBUG]` |
//! | `TOKEN_USAGE` | `update_interval: 0, model_filter: null` |
//! | `EVENTS` | `event_types: [all], timestamp` |
//! | `TASK_MANAGER` | `update_interval: 5000` |
//! | `GENERAL` | `update_interval: 10000` |
//! | `STATUS` | `update_interval: 3000` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, LinkConfig};
use crate::error::{Error, Result};
use crate::protocol::SubscribeRequest;
use crate::transport::{Registry, TaskManager, now_ms};

use super::data::DataStore;
use super::status::GlobalStatus;

// ============================================================================
// Constants
// ============================================================================

/// Endpoints the hub connects by default, in table order.
pub const HUB_ENDPOINTS: [Endpoint; 10] = [
    Endpoint::Player,
    Endpoint::World,
    Endpoint::Marker,
    Endpoint::Logs,
    Endpoint::LogsAlt,
    Endpoint::TokenUsage,
    Endpoint::Events,
    Endpoint::TaskManager,
    Endpoint::General,
    Endpoint::Status,
];

/// Delay between an open and the automatic subscription.
pub const SUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// SubscriptionPlan
// ============================================================================

/// Default subscription envelope per endpoint, with per-endpoint enable flags.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPlan {
    disabled: FxHashSet<Endpoint>,
}

impl SubscriptionPlan {
    /// Creates a plan with every endpoint enabled.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the automatic subscription for `endpoint`.
    pub fn set_enabled(&mut self, endpoint: Endpoint, enabled: bool) {
        if enabled {
            self.disabled.remove(&endpoint);
        } else {
            self.disabled.insert(endpoint);
        }
    }

    /// Returns `true` if `endpoint` subscribes automatically.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, endpoint: Endpoint) -> bool {
        !self.disabled.contains(&endpoint)
    }

    /// Builds the envelope for `endpoint`, or `None` if disabled.
    #[must_use]
    pub fn request(&self, endpoint: Endpoint) -> Option<SubscribeRequest> {
        if !self.is_enabled(endpoint) {
            return None;
        }

        let request = match endpoint {
            Endpoint::Player => SubscribeRequest::interval(500),
            Endpoint::World => SubscribeRequest::interval(2000),
            Endpoint::Marker => SubscribeRequest::interval(0),
            Endpoint::Logs | Endpoint::LogsAlt | Endpoint::McpLogs => SubscribeRequest::logs(),
            Endpoint::TokenUsage => SubscribeRequest::interval(0).with_model_filter(None),
            Endpoint::Events => SubscribeRequest::new()
                .with_event_types(["all"])
                .with_timestamp(now_ms()),
            Endpoint::TaskManager => SubscribeRequest::interval(5000),
            Endpoint::General => SubscribeRequest::interval(10_000),
            Endpoint::Status => SubscribeRequest::interval(3000),
        };

        Some(request)
    }
}

// ============================================================================
// Hub
// ============================================================================

/// Connects endpoints and mirrors their frames into a [`DataStore`].
///
/// # Example
///
/// ```ignore
/// use maicraft_link::{Hub, LinkConfig};
///
/// let hub = Hub::new(LinkConfig::from_env())?;
/// let connected = hub.connect_all().await?;
/// println!("{connected}/{} endpoints up", hub.status().total_endpoints);
/// ```
#[derive(Debug)]
pub struct Hub {
    registry: Arc<Registry>,
    store: Arc<DataStore>,
    status: Arc<RwLock<GlobalStatus>>,
    plan: Arc<RwLock<SubscriptionPlan>>,
    attached: Mutex<FxHashSet<Endpoint>>,
    connecting: AtomicBool,
    subscribe_delay: Duration,
}

// ============================================================================
// Hub - Constructor
// ============================================================================

impl Hub {
    /// Creates a hub over the endpoint table derived from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_registry(Arc::new(Registry::new(
            config.endpoint_table(),
        ))))
    }

    /// Creates a hub over an existing registry.
    #[must_use]
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            store: Arc::new(DataStore::new()),
            status: Arc::new(RwLock::new(GlobalStatus::new(&HUB_ENDPOINTS))),
            plan: Arc::new(RwLock::new(SubscriptionPlan::new())),
            attached: Mutex::new(FxHashSet::default()),
            connecting: AtomicBool::new(false),
            subscribe_delay: SUBSCRIBE_DELAY,
        }
    }

    /// Sets the delay before the automatic subscription.
    #[inline]
    #[must_use]
    pub fn with_subscribe_delay(mut self, delay: Duration) -> Self {
        self.subscribe_delay = delay;
        self
    }
}

// ============================================================================
// Hub - Connection
// ============================================================================

impl Hub {
    /// Connects every endpoint in [`HUB_ENDPOINTS`] in parallel.
    ///
    /// Individual failures are recorded in the status and do not abort the
    /// rest. Returns the number of connected endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if another `connect_all()` is running.
    pub async fn connect_all(&self) -> Result<usize> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            warn!("connect_all already in progress");
            return Err(Error::connection("connect_all already in progress"));
        }
        let _connecting = ConnectingGuard {
            connecting: &self.connecting,
            status: &self.status,
        };
        self.status.write().is_connecting = true;

        info!(endpoints = HUB_ENDPOINTS.len(), "Connecting all endpoints");

        let results = join_all(HUB_ENDPOINTS.iter().map(|e| self.connect_endpoint(*e))).await;
        let failed = results.iter().filter(|r| r.is_err()).count();

        let connected = {
            let mut status = self.status.write();
            status.recount();
            status.connection_count
        };

        info!(connected, failed, total = HUB_ENDPOINTS.len(), "Connect all finished");
        Ok(connected)
    }

    /// Connects one endpoint, attaching the hub's handlers on first use.
    ///
    /// # Errors
    ///
    /// Propagates the client's connect error. The error is also recorded in
    /// the status by the attached error handler.
    pub async fn connect_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        self.attach(endpoint);
        let client = self.registry.get_manager(endpoint);

        match client.connect().await {
            Ok(()) => {
                debug!(endpoint = %endpoint, "Endpoint connected");
                Ok(())
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Endpoint connect failed");
                Err(e)
            }
        }
    }

    /// Disconnects every hub endpoint. Returns how many were connected.
    ///
    /// Endpoints waiting on a reconnect timer are disconnected too, which
    /// cancels the timer.
    pub fn disconnect_all(&self) -> usize {
        let mut disconnected = 0;

        for endpoint in HUB_ENDPOINTS {
            let client = self.registry.get_manager(endpoint);
            if client.is_connected() {
                disconnected += 1;
            }
            client.disconnect();
            self.status.write().record_connection(endpoint, false);
        }

        info!(disconnected, "Disconnected all endpoints");
        disconnected
    }

    /// Disconnects one endpoint.
    pub fn disconnect_endpoint(&self, endpoint: Endpoint) {
        self.registry.get_manager(endpoint).disconnect();
        self.status.write().record_connection(endpoint, false);
    }

    /// Sends the planned subscription for `endpoint` now.
    ///
    /// Returns `false` if disabled or not connected.
    pub fn subscribe_endpoint(&self, endpoint: Endpoint) -> bool {
        send_planned_subscription(&self.registry, &self.plan, endpoint)
    }
}

/// Clears the in-progress flags when `connect_all` returns or is dropped.
struct ConnectingGuard<'a> {
    connecting: &'a AtomicBool,
    status: &'a RwLock<GlobalStatus>,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.status.write().is_connecting = false;
        self.connecting.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Hub - Handlers
// ============================================================================

impl Hub {
    /// Attaches status and store handlers once per endpoint.
    fn attach(&self, endpoint: Endpoint) {
        if !self.attached.lock().insert(endpoint) {
            return;
        }

        let client = self.registry.get_manager(endpoint);

        let status = Arc::clone(&self.status);
        let registry: Weak<Registry> = Arc::downgrade(&self.registry);
        let plan = Arc::clone(&self.plan);
        let delay = self.subscribe_delay;
        client.add_connection_handler(move |connected| {
            status.write().record_connection(endpoint, connected);
            if connected {
                spawn_delayed_subscription(registry.clone(), Arc::clone(&plan), endpoint, delay);
            }
        });

        let status = Arc::clone(&self.status);
        let store = Arc::clone(&self.store);
        client.add_message_handler(move |frame| {
            status.write().record_message(endpoint);
            store.update_endpoint_data(endpoint, frame);
        });

        let status = Arc::clone(&self.status);
        client.add_error_handler(move |error| {
            status.write().record_error(endpoint, error);
        });

        debug!(endpoint = %endpoint, "Hub handlers attached");
    }
}

fn spawn_delayed_subscription(
    registry: Weak<Registry>,
    plan: Arc<RwLock<SubscriptionPlan>>,
    endpoint: Endpoint,
    delay: Duration,
) {
    let Ok(runtime) = Handle::try_current() else {
        warn!(endpoint = %endpoint, "No runtime, skipping automatic subscription");
        return;
    };

    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(registry) = registry.upgrade() else {
            return;
        };
        let sent = send_planned_subscription(&registry, &plan, endpoint);
        debug!(endpoint = %endpoint, sent, "Automatic subscription");
    });
}

fn send_planned_subscription(
    registry: &Registry,
    plan: &RwLock<SubscriptionPlan>,
    endpoint: Endpoint,
) -> bool {
    let Some(request) = plan.read().request(endpoint) else {
        return false;
    };
    registry.get_manager(endpoint).send_subscription(&request)
}

// ============================================================================
// Hub - Accessors
// ============================================================================

impl Hub {
    /// Returns a status snapshot.
    #[must_use]
    pub fn status(&self) -> GlobalStatus {
        self.status.read().clone()
    }

    /// Returns `true` if `endpoint` is connected according to the status.
    #[must_use]
    pub fn endpoint_status(&self, endpoint: Endpoint) -> bool {
        self.status.read().is_connected(endpoint)
    }

    /// Returns the shared data store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Returns the registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns typed senders for the `TASK_MANAGER` endpoint.
    #[must_use]
    pub fn tasks(&self) -> TaskManager {
        TaskManager::from_registry(&self.registry)
    }

    /// Enables or disables the automatic subscription for `endpoint`.
    pub fn set_subscription_enabled(&self, endpoint: Endpoint, enabled: bool) {
        self.plan.write().set_enabled(endpoint, enabled);
    }

    /// Returns a copy of the subscription plan.
    #[must_use]
    pub fn plan(&self) -> SubscriptionPlan {
        self.plan.read().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
