//! Operation kind to transport mapping.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::OperationKind;

// ============================================================================
// Transport
// ============================================================================

/// Transport an operation is sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Single request/response over HTTP POST.
    Http,
    /// Multiplexed `graphql-ws` session.
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}

// ============================================================================
// route
// ============================================================================

/// Selects the transport for an operation kind.
///
/// Subscriptions go over WebSocket; queries, mutations and documents of
/// indeterminate kind go over HTTP.
#[inline]
#[must_use]
pub const fn route(kind: Option<OperationKind>) -> Transport {
    match kind {
        Some(OperationKind::Subscription) => Transport::WebSocket,
        Some(OperationKind::Query | OperationKind::Mutation) | None => Transport::Http,
    }
}

// ============================================================================
// Tests
// ============================================================================
