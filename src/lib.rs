//! graphqurl - GraphQL client for queries, mutations and subscriptions.
//!
//! One client dispatches every operation over the right transport:
//! queries and mutations as HTTP POST requests, subscriptions over a
//! single multiplexed WebSocket connection speaking `graphql-ws`.
//!
//! # Architecture
//!
//! ```text
//! document ─► classify ─► route ─┬─► HttpExecutor ─► POST endpoint
//!                                 │
//!                                 └─► Session ─► graphql-ws socket
//!                                        │
//!                                        └─► SubscriptionRegistry ─► callbacks
//! ```
//!
//! Key design principles:
//!
//! - Each [`Client`] owns its headers, HTTP pool and WebSocket session
//! - One socket carries every subscription, correlated by [`OperationId`]
//! - `start` frames never precede the connection's `connection_ack`
//! - Execution errors and transport errors stay distinct ([`Error`])
//!
//! # Quick Start
//!
//! ```no_run
//! use graphqurl::{Client, QueryOptions, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .endpoint("http://localhost:8080/v1/graphql")
//!         .header("x-hasura-admin-secret", "secret")
//!         .build()?;
//!
//!     let response = client
//!         .query(
//!             QueryOptions::new("query ($id: Int!) { user(id: $id) { name } }")
//!                 .with_variables(json!({ "id": 1 })),
//!         )
//!         .await?;
//!
//!     println!("{:?}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] facade, options and callback adapters |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | HTTP transport |
//! | [`identifiers`] | Operation IDs |
//! | [`operation`] | Document classification and transport routing |
//! | [`protocol`] | Request/response bodies and `graphql-ws` frames |
//! | [`transport`] | WebSocket session and subscription registry |

// ============================================================================
// Modules
// ============================================================================

/// Client facade and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// HTTP transport for queries and mutations.
pub mod http;

/// Operation IDs.
pub mod identifiers;

/// Document classification and transport routing.
pub mod operation;

/// Wire formats.
pub mod protocol;

/// WebSocket transport for subscriptions.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Client, ClientBuilder, ClientOptions, Execution, Handlers, QueryOptions, SubscribeOptions,
    SubscriptionEvent, SubscriptionStream, WebSocketOptions,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::OperationId;

// Operation types
pub use operation::{OperationKind, ParsedOperation, Transport, classify, route};

// Protocol types
pub use protocol::{GraphQLError, GraphQLRequest, GraphQLResponse};

// Transport types
pub use transport::{ConnectionHooks, Session, SessionConfig, SessionState, SubscriptionHandle};
