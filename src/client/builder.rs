//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use graphqurl::Client;
//!
//! # async fn example() -> graphqurl::Result<()> {
//! let client = Client::builder()
//!     .endpoint("https://example.com/v1/graphql")
//!     .header("x-hasura-admin-secret", "secret")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

use super::core::Client;
use super::options::{ClientOptions, WebSocketOptions};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Accumulated options.
    options: ClientOptions,
    /// Preconfigured HTTP client.
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with the endpoint read from `GRAPHQURL_ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is unset.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            options: ClientOptions::from_env()?,
            http_client: None,
        })
    }

    /// Sets the GraphQL endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Adds several headers.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options = self.options.with_headers(headers);
        self
    }

    /// Enables an eagerly opened WebSocket session.
    #[inline]
    #[must_use]
    pub fn websocket(mut self, websocket: WebSocketOptions) -> Self {
        self.options.websocket = Some(websocket);
        self
    }

    /// Sets the HTTP request timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Uses an existing HTTP client. Overrides `request_timeout`.
    #[inline]
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the client without opening any connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is missing or invalid.
    pub fn build(self) -> Result<Client> {
        self.validate()?;
        Client::from_parts(self.options, self.http_client)
    }

    /// Builds the client and, if WebSocket options were given, opens the
    /// session before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or invalid
    /// - Connection errors from opening the session
    pub async fn connect(self) -> Result<Client> {
        let client = self.build()?;
        client.open_eager_session().await?;
        Ok(client)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate(&self) -> Result<()> {
        if self.options.endpoint.trim().is_empty() {
            return Err(Error::config(
                "GraphQL endpoint is required. Use .endpoint() to set it.\n\
                 Example: Client::builder().endpoint(\"http://localhost:8080/v1/graphql\")",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_endpoint() {
        let err = ClientBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(".endpoint()"));
    }

    #[test]
    fn test_builder_rejects_bad_scheme() {
        let err = ClientBuilder::new()
            .endpoint("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_builder_collects_options() {
        let client = ClientBuilder::new()
            .endpoint("https://example.com/graphql")
            .header("a", "1")
            .headers([("b", "2")])
            .request_timeout(Duration::from_secs(3))
            .build()
            .expect("valid");

        assert_eq!(client.endpoint(), "https://example.com/graphql");
        assert_eq!(client.websocket_url(), "wss://example.com/graphql");
        assert_eq!(client.headers().len(), 2);
    }
}
