//! `graphql-ws` session and its supervisor task.
//!
//! A [`Session`] owns one logical WebSocket connection carrying many
//! subscriptions. The socket itself is driven by a spawned supervisor task
//! that also performs reconnection when enabled.
//!
//! # States
//!
//! ```text
//! Disconnected → Connecting → ConnectedUnacked → ConnectedAcked → Closed
//!                     ▲                                 │
//!                     └──────── socket closed, retry ───┘
//! ```
//!
//! # Event Loop
//!
//! The supervisor `select!`s over:
//!
//! - Inbound frames (ack, errors, keep-alive, data, complete)
//! - Outbound commands from [`Session`] and [`SubscriptionHandle`]
//!
//! `start` frames requested before the current connection is acknowledged
//! are queued and flushed, in request order, right after `connection_ack`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::OperationId;
use crate::protocol::{ClientMessage, GRAPHQL_WS_PROTOCOL, GraphQLRequest, ServerMessage};

use super::registry::{SubscriptionCallbacks, SubscriptionRegistry};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for opening the socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait between failed reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Attempts made on first connect when `retry_initial_connect` is set.
pub const INITIAL_CONNECT_ATTEMPTS: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of [`WsStream`].
type WsWrite = SplitSink<WsStream, Message>;

/// Called when the server acknowledges the connection.
pub type ConnectionSuccessHook = Arc<dyn Fn() + Send + Sync>;

/// Called with the payload of a `connection_error` frame.
pub type ConnectionErrorHook = Arc<dyn Fn(&Value) + Send + Sync>;

/// Called for each keep-alive frame.
pub type KeepAliveHook = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No socket.
    Disconnected,
    /// Socket being opened.
    Connecting,
    /// `connection_init` sent, waiting for `connection_ack`.
    ConnectedUnacked,
    /// Acknowledged; `start` frames go out immediately.
    ConnectedAcked,
    /// Closed for good.
    Closed,
}

impl SessionState {
    /// Returns `true` once the server has acknowledged the connection.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::ConnectedAcked)
    }

    /// Returns `true` if subscriptions can be requested in this state.
    #[inline]
    #[must_use]
    pub const fn accepts_subscriptions(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::ConnectedUnacked | Self::ConnectedAcked
        )
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::ConnectedUnacked => "connected_unacked",
            Self::ConnectedAcked => "connected_acked",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionHooks
// ============================================================================

/// Connection-level callbacks.
#[derive(Clone, Default)]
pub struct ConnectionHooks {
    on_connection_success: Option<ConnectionSuccessHook>,
    on_connection_error: Option<ConnectionErrorHook>,
    on_keep_alive: Option<KeepAliveHook>,
}

impl ConnectionHooks {
    /// Creates an empty hook set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acknowledgement hook.
    #[must_use]
    pub fn on_connection_success(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connection_success = Some(Arc::new(hook));
        self
    }

    /// Sets the `connection_error` hook.
    #[must_use]
    pub fn on_connection_error(mut self, hook: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_connection_error = Some(Arc::new(hook));
        self
    }

    /// Sets the keep-alive hook.
    #[must_use]
    pub fn on_keep_alive(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_keep_alive = Some(Arc::new(hook));
        self
    }

    fn connection_success(&self) {
        if let Some(ref hook) = self.on_connection_success {
            hook();
        }
    }

    fn connection_error(&self, payload: &Value) {
        if let Some(ref hook) = self.on_connection_error {
            hook(payload);
        }
    }

    fn keep_alive(&self) {
        if let Some(ref hook) = self.on_keep_alive {
            hook();
        }
    }
}

impl fmt::Debug for ConnectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHooks")
            .field("on_connection_success", &self.on_connection_success.is_some())
            .field("on_connection_error", &self.on_connection_error.is_some())
            .field("on_keep_alive", &self.on_keep_alive.is_some())
            .finish()
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Everything needed to open (and reopen) a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `ws://` or `wss://` URL.
    pub url: String,
    /// `connection_init` payload.
    pub init_payload: Map<String, Value>,
    /// Reconnect with a fresh socket when the connection closes.
    pub should_retry: bool,
    /// Retry a failed first connect up to [`INITIAL_CONNECT_ATTEMPTS`] times.
    pub retry_initial_connect: bool,
    /// Wait between failed reconnect attempts.
    pub reconnect_delay: Duration,
    /// Timeout for opening the socket.
    pub connect_timeout: Duration,
    /// Connection-level callbacks.
    pub hooks: ConnectionHooks,
}

impl SessionConfig {
    /// Creates a config with default timeouts and no retry.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            init_payload: Map::new(),
            should_retry: false,
            retry_initial_connect: false,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            hooks: ConnectionHooks::default(),
        }
    }

    /// Sets the `connection_init` payload.
    #[must_use]
    pub fn with_init_payload(mut self, payload: Map<String, Value>) -> Self {
        self.init_payload = payload;
        self
    }

    /// Enables reconnection on close.
    #[must_use]
    pub fn with_should_retry(mut self, should_retry: bool) -> Self {
        self.should_retry = should_retry;
        self
    }

    /// Enables retrying the first connect.
    #[must_use]
    pub fn with_retry_initial_connect(mut self, retry: bool) -> Self {
        self.retry_initial_connect = retry;
        self
    }

    /// Sets the wait between failed reconnect attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the connection hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: ConnectionHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// Lifecycle state plus the `start` frames waiting for an ack.
#[derive(Debug)]
struct SessionStatus {
    state: SessionState,
    pending: Vec<(OperationId, GraphQLRequest)>,
}

/// State shared between [`Session`] handles and the supervisor.
#[derive(Debug)]
struct SessionShared {
    config: SessionConfig,
    registry: Mutex<SubscriptionRegistry>,
    status: Mutex<SessionStatus>,
}

impl SessionShared {
    fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(SubscriptionRegistry::new()),
            status: Mutex::new(SessionStatus {
                state: SessionState::Disconnected,
                pending: Vec::new(),
            }),
        }
    }

    fn state(&self) -> SessionState {
        self.status.lock().state
    }

    /// Moves to `next` unless the session is already closed.
    fn transition(&self, next: SessionState) {
        let mut status = self.status.lock();
        if status.state == SessionState::Closed || status.state == next {
            return;
        }
        debug!(from = %status.state, to = %next, "Session state changed");
        status.state = next;
    }

    /// Marks the session acknowledged and drains queued starts in order.
    fn acknowledge(&self) -> Vec<ClientMessage> {
        let mut status = self.status.lock();
        if status.state != SessionState::Closed {
            status.state = SessionState::ConnectedAcked;
        }

        status
            .pending
            .drain(..)
            .map(|(id, payload)| ClientMessage::Start { id, payload })
            .collect()
    }

    /// Queues `start` frames that cannot be written yet; drops anything else.
    fn defer(&self, frame: ClientMessage) {
        match frame {
            ClientMessage::Start { id, .. } if !self.registry.lock().contains(&id) => {
                trace!(id = %id, "Start for released subscription dropped");
            }
            ClientMessage::Start { id, payload } => {
                trace!(id = %id, "Start deferred until acknowledged");
                self.status.lock().pending.push((id, payload));
            }
            other => {
                debug!(frame = other.frame_type(), "Dropping frame for unacknowledged connection");
            }
        }
    }

    /// Removes a not-yet-sent subscription. Returns `true` if it was pending.
    fn cancel_pending(&self, id: &OperationId) -> bool {
        let removed = {
            let mut status = self.status.lock();
            let before = status.pending.len();
            status.pending.retain(|(pending_id, _)| pending_id != id);
            status.pending.len() != before
        };

        if removed {
            self.registry.lock().remove(id);
        }
        removed
    }

    /// Unregisters subscriptions and runs their `complete` callbacks.
    ///
    /// With `include_pending` unset, subscriptions whose `start` is still
    /// queued stay registered; they are sent on the next acknowledged
    /// connection.
    fn release_subscriptions(&self, include_pending: bool) -> usize {
        let released: Vec<Arc<SubscriptionCallbacks>> = {
            let status = self.status.lock();
            let mut registry = self.registry.lock();
            registry
                .ids()
                .into_iter()
                .filter(|id| include_pending || !status.pending.iter().any(|(queued, _)| queued == id))
                .filter_map(|id| registry.remove(&id))
                .collect()
        };

        let count = released.len();
        for callbacks in released {
            callbacks.complete();
        }
        count
    }

    /// Closes for good and completes every subscription.
    fn finish(&self) {
        {
            let mut status = self.status.lock();
            status.state = SessionState::Closed;
            status.pending.clear();
        }

        let released = self.release_subscriptions(true);
        if released > 0 {
            debug!(count = released, "Subscriptions completed on session close");
        }
    }
}

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the supervisor.
enum SessionCommand {
    /// Write a frame.
    Send(ClientMessage),
    /// Terminate the session.
    Shutdown,
}

/// Why a socket stopped being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveOutcome {
    /// The socket closed or failed.
    SocketClosed,
    /// Shutdown was requested.
    Shutdown,
}

// ============================================================================
// Session
// ============================================================================

/// One `graphql-ws` connection multiplexing many subscriptions.
///
/// Cloning is cheap; clones control the same connection.
#[derive(Clone)]
pub struct Session {
    /// State shared with the supervisor.
    shared: Arc<SessionShared>,
    /// Channel to the supervisor.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.shared.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens the socket, sends `connection_init` and spawns the supervisor.
    ///
    /// Returns as soon as the socket is open; acknowledgement arrives
    /// asynchronously. A failed first connect is not retried unless
    /// `retry_initial_connect` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the socket does not open in time
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let shared = Arc::new(SessionShared::new(config));
        shared.transition(SessionState::Connecting);

        let socket = match connect_initial(&shared).await {
            Ok(socket) => socket,
            Err(e) => {
                shared.transition(SessionState::Disconnected);
                return Err(e);
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_supervisor(socket, command_rx, Arc::clone(&shared)));

        Ok(Self { shared, command_tx })
    }

    /// Requests a subscription.
    ///
    /// The `start` frame is written immediately when the connection is
    /// acknowledged and queued until `connection_ack` otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is closed
    /// - [`Error::ConnectionClosed`] if the supervisor has exited
    pub fn subscribe(
        &self,
        request: GraphQLRequest,
        callbacks: SubscriptionCallbacks,
    ) -> Result<SubscriptionHandle> {
        self.subscribe_with(request, |_| callbacks)
    }

    /// Like [`subscribe`](Self::subscribe), building the callbacks from
    /// the generated operation ID.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub fn subscribe_with(
        &self,
        request: GraphQLRequest,
        make_callbacks: impl FnOnce(&OperationId) -> SubscriptionCallbacks,
    ) -> Result<SubscriptionHandle> {
        let state = self.state();
        if !state.accepts_subscriptions() {
            warn!(state = %state, "Subscribe called without a live connection");
            return Err(Error::NotConnected);
        }

        // Both locks: a release must never see a registered but unqueued entry.
        let (id, queued) = {
            let mut status = self.shared.status.lock();
            let mut registry = self.shared.registry.lock();
            let id = registry.next_id();
            registry.register(id.clone(), make_callbacks(&id));

            if status.state.is_open() {
                (id, None)
            } else {
                status.pending.push((id.clone(), request.clone()));
                (id, Some(status.pending.len()))
            }
        };

        match queued {
            Some(position) => {
                debug!(id = %id, position, "Subscription queued until acknowledged");
            }
            None => {
                let frame = ClientMessage::Start {
                    id: id.clone(),
                    payload: request,
                };
                if self.command_tx.send(SessionCommand::Send(frame)).is_err() {
                    self.shared.registry.lock().remove(&id);
                    return Err(Error::ConnectionClosed);
                }
                debug!(id = %id, "Subscription started");
            }
        }

        Ok(SubscriptionHandle {
            id,
            shared: Arc::clone(&self.shared),
            command_tx: self.command_tx.clone(),
        })
    }

    /// Sends `connection_terminate`, closes the socket and disables reconnect.
    pub fn close(&self) {
        self.shared.transition(SessionState::Closed);
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Returns `true` once the connection is acknowledged.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Returns `true` if the session has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn is_active(&self, id: &OperationId) -> bool {
        self.shared.registry.lock().contains(id)
    }

    /// Returns the registered operation IDs.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<OperationId> {
        self.shared.registry.lock().ids()
    }

    /// Returns the number of `start` frames waiting for an ack.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.status.lock().pending.len()
    }

    /// Returns the WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.shared.config.url
    }
}

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// Handle to one subscription.
///
/// Dropping the handle does not stop the subscription.
///
/// A subscription ends, and its `complete` callback runs, when the server
/// completes it, when the connection carrying it is lost, or when the
/// session closes. Reconnecting does not restart it; subscriptions still
/// waiting for an ack are the exception and carry over to the next
/// connection.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: OperationId,
    shared: Arc<SessionShared>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl SubscriptionHandle {
    /// Returns the operation ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    /// Returns `true` until the subscription ends.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.registry.lock().contains(&self.id)
    }

    /// Asks the server to stop the subscription.
    ///
    /// The registry entry is removed when the server answers with
    /// `complete`. A subscription whose `start` was never sent is removed
    /// immediately and no frame is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the supervisor has exited.
    pub fn stop(&self) -> Result<()> {
        if self.shared.cancel_pending(&self.id) {
            debug!(id = %self.id, "Pending subscription cancelled");
            return Ok(());
        }

        if !self.is_active() {
            trace!(id = %self.id, "Stop for inactive subscription ignored");
            return Ok(());
        }

        self.command_tx
            .send(SessionCommand::Send(ClientMessage::Stop {
                id: self.id.clone(),
            }))
            .map_err(|_| Error::ConnectionClosed)?;

        debug!(id = %self.id, "Stop requested");
        Ok(())
    }
}

// ============================================================================
// Connecting
// ============================================================================

/// Opens the socket and sends `connection_init`.
async fn open_socket(shared: &SessionShared) -> Result<WsStream> {
    let config = &shared.config;

    let mut request = config.url.as_str().into_client_request()?;
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(GRAPHQL_WS_PROTOCOL),
    );

    let (mut socket, response) = timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| Error::connection_timeout(config.connect_timeout.as_millis() as u64))?
        .map_err(|e| Error::connection(format!("failed to connect to {}: {e}", config.url)))?;

    debug!(status = %response.status(), "WebSocket handshake completed");

    let init = ClientMessage::ConnectionInit {
        payload: config.init_payload.clone(),
    };
    socket.send(Message::Text(init.to_text()?.into())).await?;

    shared.transition(SessionState::ConnectedUnacked);
    info!(url = %config.url, "WebSocket connected, waiting for ack");

    Ok(socket)
}

/// First connect, with optional bounded retry.
async fn connect_initial(shared: &SessionShared) -> Result<WsStream> {
    let attempts = if shared.config.retry_initial_connect {
        INITIAL_CONNECT_ATTEMPTS
    } else {
        1
    };

    let mut attempt = 1;
    loop {
        match open_socket(shared).await {
            Ok(socket) => return Ok(socket),
            Err(e) if attempt < attempts => {
                warn!(attempt, max = attempts, error = %e, "Initial connect failed, retrying");
                attempt += 1;
                sleep(shared.config.reconnect_delay).await;
            }
            Err(e) => {
                warn!(url = %shared.config.url, error = %e, "Initial connect failed");
                return Err(e);
            }
        }
    }
}

/// Reopens the socket after a close, serving commands while waiting.
///
/// Returns `None` if the session is shut down first.
async fn reconnect(
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    shared: &SessionShared,
) -> Option<WsStream> {
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = sleep(shared.config.reconnect_delay);
            tokio::pin!(delay);

            loop {
                tokio::select! {
                    () = &mut delay => break,
                    command = command_rx.recv() => match command {
                        Some(SessionCommand::Send(frame)) => shared.defer(frame),
                        Some(SessionCommand::Shutdown) | None => return None,
                    }
                }
            }
        }

        if shared.state() == SessionState::Closed {
            return None;
        }

        attempt += 1;
        warn!(attempt, url = %shared.config.url, "Reconnecting");

        match open_socket(shared).await {
            Ok(socket) => return Some(socket),
            Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Drives sockets until shutdown, reconnecting when enabled.
async fn run_supervisor(
    socket: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    shared: Arc<SessionShared>,
) {
    let mut socket = socket;

    loop {
        let outcome = drive(socket, &mut command_rx, &shared).await;
        if outcome == DriveOutcome::Shutdown {
            break;
        }

        if !shared.config.should_retry || shared.state() == SessionState::Closed {
            break;
        }

        shared.transition(SessionState::Connecting);
        let released = shared.release_subscriptions(false);
        if released > 0 {
            warn!(count = released, "Subscriptions on the lost connection completed");
        }

        match reconnect(&mut command_rx, &shared).await {
            Some(next) => socket = next,
            None => break,
        }
    }

    shared.finish();
    debug!("Session supervisor terminated");
}

/// Event loop for one socket.
async fn drive(
    socket: WsStream,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    shared: &SessionShared,
) -> DriveOutcome {
    let (mut ws_write, mut ws_read) = socket.split();
    let mut acked = false;

    loop {
        tokio::select! {
            // Inbound frames
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let outgoing = handle_incoming_message(&text, shared, &mut acked);
                        for frame in outgoing {
                            write_or_defer(&mut ws_write, frame, shared).await;
                        }
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        return DriveOutcome::SocketClosed;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        return DriveOutcome::SocketClosed;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        return DriveOutcome::SocketClosed;
                    }

                    // Binary, Ping, Pong
                    _ => {}
                }
            }

            // Outbound commands
            command = command_rx.recv() => {
                match command {
                    Some(SessionCommand::Send(frame)) => {
                        if frame.is_start() && !acked {
                            shared.defer(frame);
                        } else {
                            write_or_defer(&mut ws_write, frame, shared).await;
                        }
                    }

                    Some(SessionCommand::Shutdown) | None => {
                        debug!("Session shutdown requested");
                        if let Err(e) = write_frame(&mut ws_write, &ClientMessage::ConnectionTerminate).await {
                            trace!(error = %e, "connection_terminate not delivered");
                        }
                        let _ = ws_write.close().await;
                        return DriveOutcome::Shutdown;
                    }
                }
            }
        }
    }
}

/// Dispatches one inbound frame. Returns frames to write.
fn handle_incoming_message(
    text: &str,
    shared: &SessionShared,
    acked: &mut bool,
) -> Vec<ClientMessage> {
    let message = match ServerMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(text = %text, error = %e, "Failed to parse incoming frame");
            return Vec::new();
        }
    };

    trace!(?message, "Frame received");

    match message {
        ServerMessage::ConnectionAck { .. } => {
            *acked = true;
            let flushed = shared.acknowledge();
            info!(flushed = flushed.len(), "Connection acknowledged");
            shared.config.hooks.connection_success();
            return flushed;
        }

        ServerMessage::ConnectionError { payload } => {
            let payload = payload.unwrap_or(Value::Null);
            warn!(payload = %payload, "Connection error frame received");
            shared.config.hooks.connection_error(&payload);
        }

        ServerMessage::KeepAlive => {
            shared.config.hooks.keep_alive();
        }

        ServerMessage::Data { id, payload } => {
            let callbacks = shared.registry.lock().lookup(&id);
            match callbacks {
                Some(callbacks) => callbacks.data(payload),
                None => trace!(id = %id, "Data for unknown operation ignored"),
            }
        }

        ServerMessage::Error { id, payload } => {
            let callbacks = shared.registry.lock().lookup(&id);
            match callbacks {
                Some(callbacks) => callbacks.error(payload),
                None => trace!(id = %id, "Error for unknown operation ignored"),
            }
        }

        ServerMessage::Complete { id } => {
            let callbacks = shared.registry.lock().remove(&id);
            match callbacks {
                Some(callbacks) => {
                    debug!(id = %id, "Subscription completed");
                    callbacks.complete();
                }
                None => trace!(id = %id, "Complete for unknown operation ignored"),
            }
        }

        ServerMessage::Unknown => {
            trace!("Unrecognized frame ignored");
        }
    }

    Vec::new()
}

/// Serializes and writes one frame.
async fn write_frame(ws_write: &mut WsWrite, frame: &ClientMessage) -> Result<()> {
    let text = frame.to_text()?;
    ws_write.send(Message::Text(text.into())).await?;
    trace!(frame = frame.frame_type(), "Frame sent");
    Ok(())
}

/// Writes a frame; a failed `start` goes back to the queue.
async fn write_or_defer(ws_write: &mut WsWrite, frame: ClientMessage, shared: &SessionShared) {
    if let Err(e) = write_frame(ws_write, &frame).await {
        warn!(frame = frame.frame_type(), error = %e, "Failed to send frame");
        if frame.is_start() {
            shared.defer(frame);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
