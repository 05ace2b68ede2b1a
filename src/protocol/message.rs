//! `graphql-ws` frame types.
//!
//! Every frame is a JSON object with a `type` discriminator, an optional
//! operation `id` and an optional `payload`.
//!
//! # Frames
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `connection_init` | Client → Server | Open the session, carries connection params and headers |
//! | `start` | Client → Server | Start an operation under a fresh ID |
//! | `stop` | Client → Server | Ask the server to end an operation |
//! | `connection_terminate` | Client → Server | Close the session |
//! | `connection_ack` | Server → Client | Session accepted |
//! | `connection_error` | Server → Client | Session rejected |
//! | `ka` | Server → Client | Keep-alive |
//! | `data` | Server → Client | Result for an operation |
//! | `error` | Server → Client | Operation failed before execution |
//! | `complete` | Server → Client | Operation finished |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::OperationId;

use super::{GraphQLRequest, GraphQLResponse};

// ============================================================================
// Constants
// ============================================================================

/// WebSocket sub-protocol negotiated on connect.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

// ============================================================================
// ClientMessage
// ============================================================================

/// A frame sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Session handshake.
    ConnectionInit {
        /// Connection params merged with the current headers.
        payload: Map<String, Value>,
    },

    /// Start an operation.
    Start {
        /// Fresh operation ID.
        id: OperationId,
        /// Operation to run.
        payload: GraphQLRequest,
    },

    /// Stop an operation.
    Stop {
        /// Operation to stop.
        id: OperationId,
    },

    /// Terminate the session.
    ConnectionTerminate,
}

impl ClientMessage {
    /// Returns the frame's `type` string.
    #[must_use]
    pub const fn frame_type(&self) -> &'static str {
        match self {
            Self::ConnectionInit { .. } => "connection_init",
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
            Self::ConnectionTerminate => "connection_terminate",
        }
    }

    /// Returns `true` for `start` frames.
    #[inline]
    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self, Self::Start { .. })
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted.
    ConnectionAck {
        /// Optional server payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Handshake rejected or session-level failure.
    ConnectionError {
        /// Server-provided reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Keep-alive.
    #[serde(rename = "ka")]
    KeepAlive,

    /// Result for an operation.
    Data {
        /// Operation the result belongs to.
        id: OperationId,
        /// Result body.
        payload: GraphQLResponse,
    },

    /// Operation failed.
    Error {
        /// Operation the error belongs to.
        id: OperationId,
        /// Server-provided error.
        #[serde(default)]
        payload: Value,
    },

    /// Operation finished.
    Complete {
        /// Operation that finished.
        id: OperationId,
    },

    /// Any frame type this client does not handle.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parses a frame from JSON text.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not JSON
    /// - [`Error::Protocol`] if the JSON is not a well-formed frame
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let frame_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<untyped>")
            .to_string();

        serde_json::from_value(value)
            .map_err(|e| Error::protocol(format!("malformed '{frame_type}' frame: {e}")))
    }

    /// Returns the operation ID carried by the frame, if any.
    #[must_use]
    pub fn id(&self) -> Option<&OperationId> {
        match self {
            Self::Data { id, .. } | Self::Error { id, .. } | Self::Complete { id } => Some(id),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
