//! Option structs for the client and its operations.
//!
//! # Example
//!
//! ```ignore
//! use graphqurl::{ClientOptions, WebSocketOptions};
//!
//! let options = ClientOptions::new("https://example.com/v1/graphql")
//!     .with_header("x-hasura-admin-secret", "secret")
//!     .with_websocket(WebSocketOptions::new().with_should_retry(true));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::transport::ConnectionHooks;
use crate::transport::session::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the default endpoint.
pub const ENDPOINT_ENV_VAR: &str = "GRAPHQURL_ENDPOINT";

// ============================================================================
// ClientOptions
// ============================================================================

/// Client-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// GraphQL HTTP endpoint.
    pub endpoint: String,

    /// Headers sent with every request and in `connection_init`.
    pub headers: FxHashMap<String, String>,

    /// WebSocket settings. When set, the connection is opened eagerly by
    /// [`Client::connect`](super::Client::connect).
    pub websocket: Option<WebSocketOptions>,

    /// Timeout applied to each HTTP request.
    pub request_timeout: Option<Duration>,
}

impl ClientOptions {
    /// Creates options for `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Creates options with the endpoint read from `GRAPHQURL_ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match env::var(ENDPOINT_ENV_VAR) {
            Ok(endpoint) if !endpoint.trim().is_empty() => Ok(Self::new(endpoint.trim())),
            _ => Err(Error::config(format!(
                "no endpoint given and {ENDPOINT_ENV_VAR} is not set"
            ))),
        }
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds several headers.
    #[must_use]
    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the WebSocket options.
    #[inline]
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebSocketOptions) -> Self {
        self.websocket = Some(websocket);
        self
    }

    /// Sets the HTTP request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// QueryOptions
// ============================================================================

/// One query or mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// GraphQL document text.
    pub query: String,

    /// Variables, sent as `{}` when absent.
    pub variables: Option<Value>,

    /// Per-call headers; they win over client headers on collision.
    pub headers: FxHashMap<String, String>,

    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
}

impl QueryOptions {
    /// Creates options for `query`.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Sets the variables.
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Adds a per-call header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Selects the operation by name.
    #[inline]
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

// ============================================================================
// SubscribeOptions
// ============================================================================

/// One subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscribeOptions {
    /// GraphQL document text.
    pub subscription: String,

    /// Variables, sent as `{}` when absent.
    pub variables: Option<Value>,

    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
}

impl SubscribeOptions {
    /// Creates options for `subscription`.
    #[must_use]
    pub fn new(subscription: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
            ..Default::default()
        }
    }

    /// Sets the variables.
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Selects the operation by name.
    #[inline]
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

impl From<QueryOptions> for SubscribeOptions {
    fn from(options: QueryOptions) -> Self {
        Self {
            subscription: options.query,
            variables: options.variables,
            operation_name: options.operation_name,
        }
    }
}

// ============================================================================
// WebSocketOptions
// ============================================================================

/// WebSocket session settings.
#[derive(Debug, Clone)]
pub struct WebSocketOptions {
    /// Explicit `ws://`/`wss://` URL; derived from the endpoint when unset.
    pub url: Option<String>,

    /// Extra `connection_init` payload fields. The client headers are added
    /// under `headers`.
    pub connection_params: Map<String, Value>,

    /// Reconnect with a fresh socket when the connection closes.
    pub should_retry: bool,

    /// Also retry a failed first connect.
    pub retry_initial_connect: bool,

    /// Wait between failed reconnect attempts.
    pub reconnect_delay: Duration,

    /// Timeout for opening the socket.
    pub connect_timeout: Duration,

    /// Connection-level callbacks.
    pub hooks: ConnectionHooks,
}

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self {
            url: None,
            connection_params: Map::new(),
            should_retry: false,
            retry_initial_connect: false,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            hooks: ConnectionHooks::default(),
        }
    }
}

impl WebSocketOptions {
    /// Creates default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit WebSocket URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Adds a `connection_init` payload field.
    #[inline]
    #[must_use]
    pub fn with_connection_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.connection_params.insert(key.into(), value.into());
        self
    }

    /// Replaces the `connection_init` payload fields.
    #[inline]
    #[must_use]
    pub fn with_connection_params(mut self, params: Map<String, Value>) -> Self {
        self.connection_params = params;
        self
    }

    /// Enables reconnection on close.
    #[inline]
    #[must_use]
    pub fn with_should_retry(mut self, should_retry: bool) -> Self {
        self.should_retry = should_retry;
        self
    }

    /// Enables retrying the first connect.
    #[inline]
    #[must_use]
    pub fn with_retry_initial_connect(mut self, retry: bool) -> Self {
        self.retry_initial_connect = retry;
        self
    }

    /// Sets the wait between failed reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the acknowledgement hook.
    #[must_use]
    pub fn on_connection_success(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.on_connection_success(hook);
        self
    }

    /// Sets the `connection_error` hook.
    #[must_use]
    pub fn on_connection_error(mut self, hook: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.on_connection_error(hook);
        self
    }

    /// Sets the keep-alive hook.
    #[must_use]
    pub fn on_keep_alive(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks = self.hooks.on_keep_alive(hook);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
