//! Per-client endpoint, header and connection-param state.
//!
//! Headers travel two ways:
//!
//! | Transport | Where headers go |
//! |-----------|------------------|
//! | HTTP | Request headers, merged with per-call overrides |
//! | WebSocket | `headers` key of the `connection_init` payload |
//!
//! WebSocket headers can only change by re-running the handshake, which
//! is why [`Client::update_headers`](super::Client::update_headers)
//! reconnects a live session.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::transport::SessionConfig;

use super::options::{ClientOptions, WebSocketOptions};

// ============================================================================
// Constants
// ============================================================================

/// `connection_init` payload key carrying the headers.
const HEADERS_KEY: &str = "headers";

// ============================================================================
// WebSocketContext
// ============================================================================

/// Resolved WebSocket settings.
#[derive(Debug, Clone)]
pub struct WebSocketContext {
    /// `ws://` or `wss://` URL.
    url: String,
    /// Options the session is created from.
    options: WebSocketOptions,
    /// Whether the caller asked for an eager connection.
    eager: bool,
}

impl WebSocketContext {
    /// Returns the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &WebSocketOptions {
        &self.options
    }

    /// Returns `true` if the session should open at client construction.
    #[inline]
    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.eager
    }
}

// ============================================================================
// ClientContext
// ============================================================================

/// Endpoint, headers and WebSocket settings of one client.
#[derive(Debug, Clone)]
pub struct ClientContext {
    endpoint: String,
    headers: FxHashMap<String, String>,
    websocket: WebSocketContext,
}

impl ClientContext {
    /// Validates `options` and resolves the WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not an absolute
    /// `http`/`https`/`ws`/`wss` URL.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let endpoint = options.endpoint.trim();
        if endpoint.is_empty() {
            return Err(Error::config("endpoint is required"));
        }

        let eager = options.websocket.is_some();
        let websocket_options = options.websocket.clone().unwrap_or_default();

        let derived = ws_url_from(endpoint)?;
        let url = match websocket_options.url {
            Some(ref url) => ws_url_from(url)?,
            None => derived,
        };

        Ok(Self {
            endpoint: endpoint.to_string(),
            headers: options.headers.clone(),
            websocket: WebSocketContext {
                url,
                options: websocket_options,
                eager,
            },
        })
    }

    /// Returns the HTTP endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the current headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &FxHashMap<String, String> {
        &self.headers
    }

    /// Returns the WebSocket settings.
    #[inline]
    #[must_use]
    pub fn websocket(&self) -> &WebSocketContext {
        &self.websocket
    }

    /// Replaces the headers wholesale.
    pub fn replace_headers(&mut self, headers: FxHashMap<String, String>) {
        self.headers = headers;
    }

    /// Returns client headers overlaid with `overrides`.
    ///
    /// Names are compared case-insensitively and come back lowercased, so
    /// an override always replaces a client header that differs only in
    /// case.
    #[must_use]
    pub fn merged_headers(&self, overrides: &FxHashMap<String, String>) -> FxHashMap<String, String> {
        let mut merged: FxHashMap<String, String> =
            self.headers.iter().map(lowercase_name).collect();
        merged.extend(overrides.iter().map(lowercase_name));
        merged
    }

    /// Builds the `connection_init` payload: connection params plus headers.
    #[must_use]
    pub fn init_payload(&self) -> Map<String, Value> {
        let mut payload = self.websocket.options.connection_params.clone();

        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        payload.insert(HEADERS_KEY.to_string(), Value::Object(headers));

        payload
    }

    /// Builds the configuration for a new session.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let options = &self.websocket.options;

        SessionConfig::new(self.websocket.url.clone())
            .with_init_payload(self.init_payload())
            .with_should_retry(options.should_retry)
            .with_retry_initial_connect(options.retry_initial_connect)
            .with_reconnect_delay(options.reconnect_delay)
            .with_connect_timeout(options.connect_timeout)
            .with_hooks(options.hooks.clone())
    }
}

fn lowercase_name((name, value): (&String, &String)) -> (String, String) {
    (name.to_ascii_lowercase(), value.clone())
}

// ============================================================================
// URL Derivation
// ============================================================================

/// Derives the WebSocket URL for `endpoint`.
///
/// `http` becomes `ws` and `https` becomes `wss`; `ws`/`wss` URLs are kept.
///
/// # Errors
///
/// Returns [`Error::Config`] for unparseable URLs and other schemes.
pub fn ws_url_from(endpoint: &str) -> Result<String> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| Error::config(format!("invalid endpoint '{endpoint}': {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "unsupported endpoint scheme '{other}'"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("cannot derive WebSocket URL from '{endpoint}'")))?;

    Ok(url.into())
}

// ============================================================================
// Tests
// ============================================================================
