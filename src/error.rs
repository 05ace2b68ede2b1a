//! Error types for the GraphQL client.
//!
//! Failures are grouped by where they arise: the document, the server, the
//! network, or the session.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use graphqurl::{Client, QueryOptions, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let response = client.query(QueryOptions::new("query { a }")).await?;
//!     println!("{:?}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Document | [`Error::Parse`], [`Error::NamedOperationNotFound`], [`Error::UnsupportedOperation`] |
//! | Execution | [`Error::GraphQL`], [`Error::ServerErrorFrame`] |
//! | Transport | [`Error::Transport`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`], [`Error::ConnectionErrorFrame`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::result::Result as StdResult;

use serde_json::{Value, json};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::OperationId;
use crate::operation::OperationKind;
use crate::protocol::GraphQLResponse;

// ============================================================================
// Constants
// ============================================================================

/// Stable message reported for every transport-level failure.
pub const FAILED_TO_FETCH: &str = "failed to fetch";

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// Shorthand used by every fallible client call.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Every failure a client operation can report.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Document Errors
    // ========================================================================
    /// Malformed GraphQL document text.
    ///
    /// Fatal to the single operation, never retried.
    #[error("GraphQL parse error: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// No operation in the document matches the requested name.
    ///
    /// Also returned when a document holds several operations and no
    /// name was given.
    #[error("{}", named_operation_message(.name.as_deref()))]
    NamedOperationNotFound {
        /// The requested operation name, if any.
        name: Option<String>,
        /// The full original document, for diagnostic display.
        document: String,
    },

    /// The operation kind cannot be sent through the requested entry point.
    #[error("{kind} operations are not supported here: {message}")]
    UnsupportedOperation {
        /// Classified kind of the operation.
        kind: OperationKind,
        /// What to use instead.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Well-formed response carrying a top-level `errors` array.
    #[error("GraphQL error: {}", .response.error_message().unwrap_or_default())]
    GraphQL {
        /// The full response body.
        response: GraphQLResponse,
    },

    /// An `error` frame delivered for one subscription.
    #[error("Subscription {id} failed: {payload}")]
    ServerErrorFrame {
        /// Operation the error belongs to.
        id: OperationId,
        /// Raw frame payload.
        payload: Value,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network or HTTP-layer failure.
    ///
    /// The display text is always `failed to fetch`; the original cause
    /// is kept as the error source.
    #[error("{}", FAILED_TO_FETCH)]
    Transport {
        /// Underlying failure (network, TLS, non-JSON body, ...).
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Socket-level failure from tungstenite.
    #[error("Connection failed: {message}")]
    Connection {
        /// What went wrong while connecting.
        message: String,
    },

    /// WebSocket connection was not established within the timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// How long the handshake was given, in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Subscribe attempted without a live connection.
    #[error("Not connected")]
    NotConnected,

    /// A `connection_error` frame sent by the server.
    #[error("Connection rejected by server: {payload}")]
    ConnectionErrorFrame {
        /// Raw frame payload.
        payload: Value,
    },

    /// Protocol violation or unexpected frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// The unexpected frame or field.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Client configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Which option is invalid and why.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

fn named_operation_message(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("query with name '{name}' not found in input"),
        None => "document contains multiple operations; an operation name is required".to_string(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a parse error.
    #[inline]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a named operation not found error.
    #[inline]
    pub fn named_operation_not_found(name: Option<&str>, document: impl Into<String>) -> Self {
        Self::NamedOperationNotFound {
            name: name.map(str::to_string),
            document: document.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[inline]
    pub fn unsupported_operation(kind: OperationKind, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            kind,
            message: message.into(),
        }
    }

    /// Creates a GraphQL execution error.
    #[inline]
    pub fn graphql(response: GraphQLResponse) -> Self {
        Self::GraphQL { response }
    }

    /// Creates a transport error wrapping its cause.
    #[inline]
    pub fn transport(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the server executed the operation and reported errors.
    #[inline]
    #[must_use]
    pub fn is_graphql_error(&self) -> bool {
        matches!(self, Self::GraphQL { .. } | Self::ServerErrorFrame { .. })
    }

    /// Returns `true` if this is a transport-level failure.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this is a document error (parse or name lookup).
    #[inline]
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::NamedOperationNotFound { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::ConnectionErrorFrame { .. }
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Display Payload
// ============================================================================

impl Error {
    /// Renders the error in the `{"errors": [...]}` response shape.
    ///
    /// Execution errors return the server's own body; everything else is
    /// reduced to a single `message` entry.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        match self {
            Self::GraphQL { response } => {
                serde_json::to_value(response).unwrap_or_else(|_| message_payload(&self.to_string()))
            }
            Self::ServerErrorFrame { payload, .. } => match payload {
                Value::Array(_) => json!({ "errors": payload }),
                Value::Object(map) if map.contains_key("errors") => payload.clone(),
                _ => json!({ "errors": [payload] }),
            },
            _ => message_payload(&self.to_string()),
        }
    }
}

fn message_payload(message: &str) -> Value {
    json!({ "errors": [{ "message": message }] })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let cause = IoError::new(ErrorKind::ConnectionRefused, "connection refused");
        let err = Error::transport(cause);

        assert_eq!(err.to_string(), "failed to fetch");
        let source = err.source().expect("source kept");
        assert_eq!(source.to_string(), "connection refused");
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_named_operation_message() {
        let err = Error::named_operation_not_found(Some("Missing"), "query A { a }");
        assert_eq!(err.to_string(), "query with name 'Missing' not found in input");
        assert!(err.is_document_error());

        let err = Error::named_operation_not_found(None, "query A { a } query B { b }");
        assert!(err.to_string().contains("operation name is required"));
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::connection_timeout(10).is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_transport_payload_shape() {
        let err = Error::transport("dns failure");
        assert_eq!(
            err.to_payload(),
            json!({ "errors": [{ "message": "failed to fetch" }] })
        );
    }

    #[test]
    fn test_graphql_payload_is_response_body() {
        let response: GraphQLResponse =
            serde_json::from_value(json!({ "errors": [{ "message": "boom" }] })).expect("parse");
        let err = Error::graphql(response);

        assert!(err.is_graphql_error());
        assert_eq!(err.to_string(), "GraphQL error: boom");
        assert_eq!(err.to_payload(), json!({ "errors": [{ "message": "boom" }] }));
    }

    #[test]
    fn test_error_frame_payload_wrapped() {
        let err = Error::ServerErrorFrame {
            id: OperationId::from("abcde0"),
            payload: json!({ "message": "denied" }),
        };
        assert_eq!(err.to_payload(), json!({ "errors": [{ "message": "denied" }] }));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
