//! Client facade: classify, route, execute.
//!
//! # Dispatch
//!
//! | Entry point | Query / mutation | Subscription |
//! |-------------|------------------|--------------|
//! | `query` / `query_with` | HTTP POST | [`Error::UnsupportedOperation`] |
//! | `subscribe` / `subscribe_stream` | sent as `start` | sent as `start` |
//! | `execute` | HTTP POST | `start` on the WebSocket session |
//!
//! The WebSocket session is created on first use (or at construction with
//! [`Client::connect`]) and shared by every subscription of the client.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::http::HttpExecutor;
use crate::identifiers::OperationId;
use crate::operation::{OperationKind, ParsedOperation, Transport, classify, route};
use crate::protocol::{GraphQLRequest, GraphQLResponse};
use crate::transport::{Session, SessionState, SubscriptionHandle};

use super::builder::ClientBuilder;
use super::context::ClientContext;
use super::handlers::{Execution, Handlers, SubscriptionStream};
use super::options::{ClientOptions, QueryOptions, SubscribeOptions};

// ============================================================================
// Client
// ============================================================================

/// GraphQL client dispatching over HTTP and `graphql-ws`.
///
/// Cloning is cheap; clones share headers, the HTTP pool and the
/// WebSocket session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Shared client state.
struct ClientInner {
    /// HTTP transport.
    http: HttpExecutor,
    /// Endpoint, headers and WebSocket settings.
    context: RwLock<ClientContext>,
    /// Current WebSocket session, if any.
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Client {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client without opening any connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is invalid.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::from_parts(options, None)
    }

    /// Creates a client and, if `options.websocket` is set, opens the
    /// WebSocket session before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is invalid
    /// - Connection errors from opening the session
    pub async fn connect(options: ClientOptions) -> Result<Self> {
        let client = Self::new(options)?;
        client.open_eager_session().await?;
        Ok(client)
    }

    pub(crate) fn from_parts(
        options: ClientOptions,
        http_client: Option<reqwest::Client>,
    ) -> Result<Self> {
        let context = ClientContext::new(&options)?;
        let http = match http_client {
            Some(client) => HttpExecutor::with_client(client),
            None => HttpExecutor::new(options.request_timeout)?,
        };

        debug!(
            endpoint = context.endpoint(),
            websocket = context.websocket().url(),
            "Client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                context: RwLock::new(context),
                session: Mutex::new(None),
            }),
        })
    }

    pub(crate) async fn open_eager_session(&self) -> Result<()> {
        let eager = self.inner.context.read().websocket().is_eager();
        if eager {
            self.ensure_session().await?;
        }
        Ok(())
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Client {
    /// Runs a query or mutation over HTTP.
    ///
    /// Per-call headers override client headers.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] / [`Error::NamedOperationNotFound`] for bad documents
    /// - [`Error::UnsupportedOperation`] for subscriptions
    /// - [`Error::GraphQL`] if the response carries `errors`
    /// - [`Error::Transport`] on network failure
    pub async fn query(&self, options: QueryOptions) -> Result<GraphQLResponse> {
        let operation = classify(&options.query, options.operation_name.as_deref())?;
        self.query_parsed(&options, &operation).await
    }

    /// Like [`query`](Self::query), also reporting the outcome to `handlers`.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query); the error is passed to
    /// `handlers` before being returned.
    pub async fn query_with(
        &self,
        options: QueryOptions,
        handlers: &Handlers,
    ) -> Result<GraphQLResponse> {
        let operation = match classify(&options.query, options.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(e) => {
                handlers.error(&e, None);
                return Err(e);
            }
        };

        let result = self.query_parsed(&options, &operation).await;
        handlers.report(result, Some(&operation))
    }

    /// Classifies and routes: HTTP for queries and mutations, the
    /// WebSocket session for subscriptions.
    ///
    /// Per-call headers are not sent for subscriptions; WebSocket headers
    /// only travel in `connection_init`.
    ///
    /// # Errors
    ///
    /// Any error of [`query`](Self::query) or [`subscribe`](Self::subscribe),
    /// passed to `handlers` before being returned.
    pub async fn execute(&self, options: QueryOptions, handlers: Handlers) -> Result<Execution> {
        let operation = match classify(&options.query, options.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(e) => {
                handlers.error(&e, None);
                return Err(e);
            }
        };

        match route(operation.kind()) {
            Transport::Http => {
                let result = self.query_parsed(&options, &operation).await;
                handlers
                    .report(result, Some(&operation))
                    .map(Execution::Response)
            }
            Transport::WebSocket => {
                let request = build_request(&options.query, options.variables, options.operation_name);
                self.subscribe_parsed(request, Arc::new(operation), handlers)
                    .await
                    .map(Execution::Subscription)
            }
        }
    }

    async fn query_parsed(
        &self,
        options: &QueryOptions,
        operation: &ParsedOperation,
    ) -> Result<GraphQLResponse> {
        if route(operation.kind()) == Transport::WebSocket {
            return Err(Error::unsupported_operation(
                OperationKind::Subscription,
                "use subscribe() or execute()",
            ));
        }

        let (endpoint, headers) = {
            let context = self.inner.context.read();
            (
                context.endpoint().to_string(),
                context.merged_headers(&options.headers),
            )
        };

        let request = build_request(
            &options.query,
            options.variables.clone(),
            options.operation_name.clone(),
        );

        self.inner.http.execute(&endpoint, &headers, &request).await
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

impl Client {
    /// Starts a subscription on the WebSocket session, creating the session
    /// if none is live.
    ///
    /// The `start` frame is held back until the server acknowledges the
    /// connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] / [`Error::NamedOperationNotFound`] for bad documents
    /// - Connection errors if the session cannot be opened
    pub async fn subscribe(
        &self,
        options: SubscribeOptions,
        handlers: Handlers,
    ) -> Result<SubscriptionHandle> {
        let operation = match classify(&options.subscription, options.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(e) => {
                handlers.error(&e, None);
                return Err(e);
            }
        };

        let request = build_request(
            &options.subscription,
            options.variables,
            options.operation_name,
        );
        self.subscribe_parsed(request, Arc::new(operation), handlers)
            .await
    }

    /// Starts a subscription and returns its events as a stream.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub async fn subscribe_stream(&self, options: SubscribeOptions) -> Result<SubscriptionStream> {
        classify(&options.subscription, options.operation_name.as_deref())?;

        let request = build_request(
            &options.subscription,
            options.variables,
            options.operation_name,
        );
        let session = self.ensure_session().await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle =
            session.subscribe_with(request, |id| SubscriptionStream::callbacks(id, sender))?;

        Ok(SubscriptionStream::new(handle, receiver))
    }

    async fn subscribe_parsed(
        &self,
        request: GraphQLRequest,
        operation: Arc<ParsedOperation>,
        handlers: Handlers,
    ) -> Result<SubscriptionHandle> {
        let session = match self.ensure_session().await {
            Ok(session) => session,
            Err(e) => {
                handlers.error(&e, Some(operation.as_ref()));
                return Err(e);
            }
        };

        let reporter = handlers.clone();
        session
            .subscribe_with(request, |id| {
                handlers.subscription_callbacks(id, Arc::clone(&operation))
            })
            .inspect_err(|e| reporter.error(e, Some(operation.as_ref())))
    }

    /// Returns the live session, opening a new one if needed.
    async fn ensure_session(&self) -> Result<Session> {
        let mut slot = self.inner.session.lock().await;

        if let Some(ref session) = *slot
            && !session.is_closed()
        {
            return Ok(session.clone());
        }

        let config = self.inner.context.read().session_config();
        let session = Session::connect(config).await?;
        *slot = Some(session.clone());

        Ok(session)
    }
}

// ============================================================================
// Headers and Lifecycle
// ============================================================================

impl Client {
    /// Replaces the client headers wholesale.
    ///
    /// A live WebSocket session is closed and reopened so the new headers
    /// reach the server in a fresh `connection_init`. Subscriptions of the
    /// old session end and their `on_complete` handlers run.
    ///
    /// # Errors
    ///
    /// Returns connection errors if the session cannot be reopened.
    pub async fn update_headers<K, V>(
        &self,
        headers: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let headers: FxHashMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        self.inner.context.write().replace_headers(headers);

        let mut slot = self.inner.session.lock().await;
        let live = slot.as_ref().is_some_and(|session| !session.is_closed());
        if !live {
            return Ok(());
        }

        if let Some(old) = slot.take() {
            old.close();
        }

        info!("Headers replaced, re-establishing WebSocket session");
        let config = self.inner.context.read().session_config();
        *slot = Some(Session::connect(config).await?);

        Ok(())
    }

    /// Closes the WebSocket session, if any.
    pub async fn close(&self) {
        if let Some(session) = self.inner.session.lock().await.take() {
            session.close();
        }
    }

    /// Returns the state of the WebSocket session.
    pub async fn connection_state(&self) -> SessionState {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map_or(SessionState::Disconnected, Session::state)
    }

    /// Returns the IDs of the registered subscriptions.
    pub async fn active_subscriptions(&self) -> Vec<OperationId> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(Session::active_subscriptions)
            .unwrap_or_default()
    }

    /// Returns the current session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.inner.session.lock().await.clone()
    }

    /// Returns the HTTP endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.inner.context.read().endpoint().to_string()
    }

    /// Returns the WebSocket URL.
    #[must_use]
    pub fn websocket_url(&self) -> String {
        self.inner.context.read().websocket().url().to_string()
    }

    /// Returns the current headers.
    #[must_use]
    pub fn headers(&self) -> FxHashMap<String, String> {
        self.inner.context.read().headers().clone()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the request body: original document text, `{}` for no variables.
fn build_request(
    query: &str,
    variables: Option<Value>,
    operation_name: Option<String>,
) -> GraphQLRequest {
    let request = GraphQLRequest::new(query).with_operation_name(operation_name);
    match variables {
        Some(variables) => request.with_variables(variables),
        None => request,
    }
}

// ============================================================================
// Tests
// ============================================================================
