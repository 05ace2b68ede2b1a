//! WebSocket transport for subscriptions.
//!
//! One [`Session`] per client multiplexes every subscription over a single
//! `graphql-ws` connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  GraphQL server │
//! │                 │   WebSocket (graphql-ws)     │                 │
//! │  Session        │◄────────────────────────────►│                 │
//! │  → supervisor   │   init / ack / start / data  │                 │
//! │  → registry     │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Session::connect` - Open the socket and send `connection_init`
//! 2. `connection_ack` - Queued `start` frames are flushed
//! 3. `Session::subscribe` - Register callbacks, send `start`
//! 4. `SubscriptionHandle::stop` - Send `stop`; `complete` unregisters
//! 5. `Session::close` - Send `connection_terminate`, no reconnect
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `registry` | Operation ID to callback mapping |
//! | `session` | Session state machine and supervisor task |

// ============================================================================
// Submodules
// ============================================================================

/// Operation ID to callback mapping.
pub mod registry;

/// Session state machine and supervisor task.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::{SubscriptionCallbacks, SubscriptionRegistry};
pub use session::{
    ConnectionHooks, Session, SessionConfig, SessionState, SubscriptionHandle,
};
