//! Type-safe identifier wrappers.
//!
//! Newtypes keep handler, interceptor and error-record IDs from being mixed
//! up. Handler and interceptor IDs come from process-wide monotonic counters,
//! so an ID is never reused after its entry is removed.
//!
//! | Type | Backing | Used by |
//! |------|---------|---------|
//! | [`HandlerId`] | `u64` counter | [`crate::transport::Client`] handler lists |
//! | [`InterceptorId`] | `u64` counter | [`crate::http::InterceptorChain`] |
//! | [`ErrorId`] | UUID v4 | [`crate::http::ErrorReporter`] records |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Counters
// ============================================================================

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_INTERCEPTOR_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// HandlerId
// ============================================================================

/// Identifies a registered client handler.
///
/// Returned by `add_*_handler` and accepted by the matching `remove_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates the next handler ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

// ============================================================================
// InterceptorId
// ============================================================================

/// Identifies a registered HTTP interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(u64);

impl InterceptorId {
    /// Allocates the next interceptor ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_INTERCEPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interceptor-{}", self.0)
    }
}

// ============================================================================
// ErrorId
// ============================================================================

/// Identifies a record in the error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorId(Uuid);

impl ErrorId {
    /// Generates a new random error ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_ids_are_unique() {
        let a = HandlerId::next();
        let b = HandlerId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_interceptor_id_display() {
        let id = InterceptorId::next();
        assert!(id.to_string().starts_with("interceptor-"));
    }

    #[test]
    fn test_error_id_serializes_as_plain_uuid() {
        let id = ErrorId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
