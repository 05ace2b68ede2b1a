//! Wire formats.
//!
//! This module defines the GraphQL request/response bodies shared by both
//! transports and the frames of the `graphql-ws` WebSocket sub-protocol.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `GraphQLRequest` | Local → Remote | HTTP body / `start` payload |
//! | `GraphQLResponse` | Remote → Local | HTTP body / `data` payload |
//! | `ClientMessage` | Local → Remote | `graphql-ws` client frame |
//! | `ServerMessage` | Remote → Local | `graphql-ws` server frame |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | `graphql-ws` frame types |
//! | `response` | Request and response bodies |

// ============================================================================
// Submodules
// ============================================================================

/// `graphql-ws` frame types.
pub mod message;

/// Request and response bodies.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{ClientMessage, GRAPHQL_WS_PROTOCOL, ServerMessage};
pub use response::{GraphQLError, GraphQLLocation, GraphQLRequest, GraphQLResponse};
