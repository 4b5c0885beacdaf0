//! One client per endpoint name.
//!
//! The registry is an explicit context object: whoever owns it decides the
//! lifetime of every client in it. Clients are created lazily from the
//! endpoint table and cached for the registry's lifetime; only
//! [`Registry::cleanup`] evicts, and only names that were retired and are
//! disconnected.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Registry                  │
//! │  ┌─────────────────────────────────┐    │
//! │  │ PLAYER  → Client (1 transport)  │    │
//! │  │ WORLD   → Client (1 transport)  │    │
//! │  │ LOGS    → Client (1 transport)  │    │
//! │  └─────────────────────────────────┘    │
//! │  active: { PLAYER, WORLD, LOGS }        │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Endpoint, EndpointTable};
use crate::error::Result;

use super::Client;

// ============================================================================
// Registry
// ============================================================================

/// Endpoint name → client cache.
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Debug)]
pub struct Registry {
    /// Static endpoint table.
    table: EndpointTable,

    /// Cached clients.
    clients: RwLock<FxHashMap<Endpoint, Client>>,

    /// Names still in use. Only these survive `cleanup()` while disconnected.
    active: RwLock<FxHashSet<Endpoint>>,
}

// ============================================================================
// Registry - Constructor
// ============================================================================

impl Registry {
    /// Creates an empty registry over `table`.
    #[must_use]
    pub fn new(table: EndpointTable) -> Self {
        Self {
            table,
            clients: RwLock::new(FxHashMap::default()),
            active: RwLock::new(FxHashSet::default()),
        }
    }

    /// Returns the endpoint table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &EndpointTable {
        &self.table
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(EndpointTable::default())
    }
}

// ============================================================================
// Registry - Lookup
// ============================================================================

impl Registry {
    /// Returns the client for `endpoint`, creating it on first use.
    ///
    /// Every call for the same name returns a handle to the same client.
    pub fn get_manager(&self, endpoint: Endpoint) -> Client {
        if let Some(client) = self.clients.read().get(&endpoint) {
            return client.clone();
        }

        let mut clients = self.clients.write();
        let client = clients
            .entry(endpoint)
            .or_insert_with(|| {
                debug!(endpoint = %endpoint, "Creating client");
                Client::new(endpoint.as_str(), self.table.get(endpoint))
            })
            .clone();
        drop(clients);

        self.active.write().insert(endpoint);
        client
    }

    /// Looks up a client by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownEndpoint`] if `name` is not in the table.
    pub fn get_manager_by_name(&self, name: &str) -> Result<Client> {
        let endpoint: Endpoint = name.parse()?;
        Ok(self.get_manager(endpoint))
    }

    /// Returns every cached client in table order.
    #[must_use]
    pub fn get_all_managers(&self) -> Vec<Client> {
        let clients = self.clients.read();
        Endpoint::ALL
            .iter()
            .filter_map(|e| clients.get(e).cloned())
            .collect()
    }

    /// Returns the names that have been created and not retired.
    #[must_use]
    pub fn initialized_names(&self) -> Vec<Endpoint> {
        let active = self.active.read();
        Endpoint::ALL
            .into_iter()
            .filter(|e| active.contains(e))
            .collect()
    }

    /// Returns `true` if a client exists for `endpoint`.
    #[inline]
    #[must_use]
    pub fn contains(&self, endpoint: Endpoint) -> bool {
        self.clients.read().contains_key(&endpoint)
    }

    /// Returns the number of cached clients.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns `true` if no clients are cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

// ============================================================================
// Registry - Lifecycle
// ============================================================================

impl Registry {
    /// Disconnects every cached client.
    pub fn disconnect_all(&self) {
        for client in self.get_all_managers() {
            client.disconnect();
        }
        info!("Disconnected all WebSocket clients");
    }

    /// Returns name → connected for every active name.
    #[must_use]
    pub fn connection_status(&self) -> BTreeMap<Endpoint, bool> {
        let clients = self.clients.read();
        self.initialized_names()
            .into_iter()
            .map(|e| (e, clients.get(&e).is_some_and(Client::is_connected)))
            .collect()
    }

    /// Marks `endpoint` as no longer in use.
    ///
    /// Returns `true` if it was active.
    pub fn retire(&self, endpoint: Endpoint) -> bool {
        self.active.write().remove(&endpoint)
    }

    /// Evicts clients that are retired and disconnected.
    ///
    /// Returns the evicted names.
    pub fn cleanup(&self) -> Vec<Endpoint> {
        let active = self.active.read().clone();
        let mut clients = self.clients.write();

        let evicted: Vec<Endpoint> = clients
            .iter()
            .filter(|(e, client)| !active.contains(*e) && !client.is_connected())
            .map(|(e, _)| *e)
            .collect();

        for endpoint in &evicted {
            clients.remove(endpoint);
            debug!(endpoint = %endpoint, "Evicted client");
        }

        evicted
    }
}

// ============================================================================
// Registry - Convenience
// ============================================================================

impl Registry {
    /// Connects the client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Propagates the client's connect error.
    pub async fn connect(&self, endpoint: Endpoint) -> Result<()> {
        self.get_manager(endpoint).connect().await
    }

    /// Disconnects the client for `endpoint`.
    pub fn disconnect(&self, endpoint: Endpoint) {
        self.get_manager(endpoint).disconnect();
    }

    /// Sends an interval subscription on `endpoint`.
    pub fn subscribe(&self, endpoint: Endpoint, update_interval_ms: u64) -> bool {
        self.get_manager(endpoint).subscribe(update_interval_ms)
    }

    /// Sends an unsubscribe on `endpoint`.
    pub fn unsubscribe(&self, endpoint: Endpoint) -> bool {
        self.get_manager(endpoint).unsubscribe()
    }

    /// Sends an arbitrary payload on `endpoint`.
    pub fn send_message<T: Serialize + ?Sized>(&self, endpoint: Endpoint, payload: &T) -> bool {
        self.get_manager(endpoint).send_message(payload)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_manager_returns_same_client() {
        let registry = Registry::default();
        let a = registry.get_manager(Endpoint::Player);
        let b = registry.get_manager(Endpoint::Player);

        assert!(a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
        assert_eq!(a.url(), "ws://localhost:20914/ws/game/player");
    }

    #[test]
    fn test_get_manager_by_name() {
        let registry = Registry::default();
        let client = registry.get_manager_by_name("token_usage").unwrap();
        assert_eq!(client.name(), "TOKEN_USAGE");
        assert!(registry.get_manager_by_name("BOGUS").is_err());
    }

    #[test]
    fn test_connection_status_lists_initialized() {
        let registry = Registry::default();
        registry.get_manager(Endpoint::Logs);
        registry.get_manager(Endpoint::World);

        let status = registry.connection_status();
        assert_eq!(status.len(), 2);
        assert_eq!(status.get(&Endpoint::World), Some(&false));
        assert_eq!(
            registry.initialized_names(),
            vec![Endpoint::World, Endpoint::Logs]
        );
    }

    #[test]
    fn test_cleanup_only_evicts_retired() {
        let registry = Registry::default();
        registry.get_manager(Endpoint::Events);
        registry.get_manager(Endpoint::Status);

        assert!(registry.cleanup().is_empty());

        assert!(registry.retire(Endpoint::Events));
        assert_eq!(registry.cleanup(), vec![Endpoint::Events]);
        assert!(!registry.contains(Endpoint::Events));
        assert!(registry.contains(Endpoint::Status));
    }

    #[test]
    fn test_send_through_registry_while_disconnected() {
        let registry = Registry::default();
        assert!(!registry.subscribe(Endpoint::Player, 500));
        assert!(!registry.send_message(Endpoint::Player, &serde_json::json!({ "type": "x" })));
    }
}
