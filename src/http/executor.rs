//! Request execution over HTTP POST.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{GraphQLRequest, GraphQLResponse};

// ============================================================================
// Constants
// ============================================================================

/// Content type of every request body.
const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// HttpExecutor
// ============================================================================

/// Executes GraphQL operations with one POST request each.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    /// Pooled HTTP client.
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Creates an executor with an optional per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Creates an executor around an existing client.
    #[inline]
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Sends `request` to `endpoint` with the given headers.
    ///
    /// `content-type: application/json` always replaces a caller-supplied
    /// content type.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a header name or value is invalid
    /// - [`Error::Transport`] on network failure, a non-JSON body, or a
    ///   non-success status without GraphQL errors
    /// - [`Error::GraphQL`] if the body carries an `errors` array
    pub async fn execute(
        &self,
        endpoint: &str,
        headers: &FxHashMap<String, String>,
        request: &GraphQLRequest,
    ) -> Result<GraphQLResponse> {
        let header_map = build_header_map(headers)?;
        let body = serde_json::to_vec(request)?;

        debug!(
            endpoint,
            operation = request.operation_name.as_deref().unwrap_or_default(),
            "Sending GraphQL request"
        );
        trace!(bytes = body.len(), "Request body serialized");

        let response = self
            .client
            .post(endpoint)
            .headers(header_map)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint, error = %e, "GraphQL request failed");
                Error::transport(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(Error::transport)?;
        debug!(status = %status, bytes = text.len(), "Response received");

        let body: GraphQLResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(status = %status, error = %e, "Response body is not a GraphQL response");
            Error::transport(e)
        })?;

        if body.has_errors() {
            debug!(
                errors = body.errors().len(),
                "GraphQL execution returned errors"
            );
            return Err(Error::graphql(body));
        }

        if !status.is_success() {
            warn!(status = %status, "Non-success status without GraphQL errors");
            return Err(Error::transport(format!("unexpected HTTP status {status}")));
        }

        Ok(body)
    }
}

/// Builds the outgoing header map, forcing the JSON content type.
fn build_header_map(headers: &FxHashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::config(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::config(format!("invalid value for header '{name}'")))?;
        map.insert(header_name, header_value);
    }

    map.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Ok(map)
}

// ============================================================================
// Tests
// ============================================================================
