//! Handler lists for client callbacks.
//!
//! Handlers are stored with a stable [`HandlerId`] so they can be removed
//! without comparing closures. Invocation always works on a snapshot taken
//! outside the lock, which lets a handler add or remove handlers (including
//! itself) while it runs.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Error;
use crate::identifiers::HandlerId;

// ============================================================================
// Handler Types
// ============================================================================

/// Called with every parsed inbound frame.
pub type MessageHandler = dyn Fn(&Value) + Send + Sync;

/// Called with `true` after open and `false` after close.
pub type ConnectionHandler = dyn Fn(bool) + Send + Sync;

/// Called with transport and liveness errors.
pub type ErrorHandler = dyn Fn(&Error) + Send + Sync;

/// Called after the transport closes.
pub type CloseHandler = dyn Fn() + Send + Sync;

// ============================================================================
// HandlerList
// ============================================================================

/// Ordered list of handlers keyed by [`HandlerId`].
pub struct HandlerList<F: ?Sized> {
    entries: Mutex<Vec<(HandlerId, Arc<F>)>>,
}

impl<F: ?Sized> Default for HandlerList<F> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> HandlerList<F> {
    /// Appends a handler and returns its ID.
    pub fn add(&self, handler: Arc<F>) -> HandlerId {
        let id = HandlerId::next();
        self.entries.lock().push((id, handler));
        id
    }

    /// Removes a handler by ID.
    ///
    /// Returns `true` if a handler was removed.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Returns the handlers in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no handlers are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// The four handler lists owned by a client.
#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) message: HandlerList<MessageHandler>,
    pub(crate) connection: HandlerList<ConnectionHandler>,
    pub(crate) error: HandlerList<ErrorHandler>,
    pub(crate) close: HandlerList<CloseHandler>,
}

impl Handlers {
    pub(crate) fn emit_message(&self, frame: &Value) {
        for handler in self.message.snapshot() {
            handler(frame);
        }
    }

    pub(crate) fn emit_connection(&self, connected: bool) {
        for handler in self.connection.snapshot() {
            handler(connected);
        }
    }

    pub(crate) fn emit_error(&self, error: &Error) {
        for handler in self.error.snapshot() {
            handler(error);
        }
    }

    pub(crate) fn emit_close(&self) {
        for handler in self.close.snapshot() {
            handler();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_add_remove() {
        let list: HandlerList<ConnectionHandler> = HandlerList::default();
        let a = list.add(Arc::new(|_| {}));
        let b = list.add(Arc::new(|_| {}));

        assert_eq!(list.len(), 2);
        assert!(list.remove(a));
        assert!(!list.remove(a));
        assert_eq!(list.len(), 1);
        assert!(list.remove(b));
        assert!(list.is_empty());
    }

    #[test]
    fn test_emit_in_registration_order() {
        let handlers = Handlers::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let order = Arc::clone(&order);
            handlers.connection.add(Arc::new(move |connected| {
                order.lock().push((tag, connected));
            }));
        }

        handlers.emit_connection(true);
        assert_eq!(*order.lock(), vec![(0, true), (1, true), (2, true)]);
    }

    #[test]
    fn test_handler_can_remove_itself() {
        let handlers = Arc::new(Handlers::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));

        let id = {
            let inner = Arc::clone(&handlers);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            handlers.close.add(Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let id = *slot.lock();
                if let Some(id) = id {
                    inner.close.remove(id);
                }
            }))
        };
        *slot.lock() = Some(id);

        handlers.emit_close();
        handlers.emit_close();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
