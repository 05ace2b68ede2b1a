//! Callback and stream adapters over the client's futures.
//!
//! Every operation has one canonical async form returning a [`Result`].
//! [`Handlers`] attach callbacks to that same result: success and error
//! callbacks receive the payload, the operation kind and the parsed
//! document, whatever the transport.
//!
//! | Adapter | Used by |
//! |---------|---------|
//! | [`Handlers`] | `query_with`, `subscribe`, `execute` |
//! | [`SubscriptionStream`] | `subscribe_stream` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::identifiers::OperationId;
use crate::operation::{OperationKind, ParsedOperation};
use crate::protocol::GraphQLResponse;
use crate::transport::{SubscriptionCallbacks, SubscriptionHandle};

// ============================================================================
// Types
// ============================================================================

/// Receives a successful payload.
pub type SuccessHandler =
    Arc<dyn Fn(&GraphQLResponse, Option<OperationKind>, &ParsedOperation) + Send + Sync>;

/// Receives a failure. The parsed document is absent when parsing failed.
pub type ErrorHandler =
    Arc<dyn Fn(&Error, Option<OperationKind>, Option<&ParsedOperation>) + Send + Sync>;

/// Called when a subscription completes.
pub type CompleteHandler = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Handlers
// ============================================================================

/// Optional callbacks for one operation.
///
/// An error with no `on_error` handler is logged at `warn` level.
#[derive(Clone, Default)]
pub struct Handlers {
    on_success: Option<SuccessHandler>,
    on_error: Option<ErrorHandler>,
    on_complete: Option<CompleteHandler>,
}

impl Handlers {
    /// Creates an empty handler set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the success handler.
    #[must_use]
    pub fn on_success(
        mut self,
        handler: impl Fn(&GraphQLResponse, Option<OperationKind>, &ParsedOperation)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(handler));
        self
    }

    /// Sets the error handler.
    #[must_use]
    pub fn on_error(
        mut self,
        handler: impl Fn(&Error, Option<OperationKind>, Option<&ParsedOperation>)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Sets the completion handler (subscriptions only).
    #[must_use]
    pub fn on_complete(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(handler));
        self
    }

    pub(crate) fn success(&self, response: &GraphQLResponse, operation: &ParsedOperation) {
        if let Some(ref handler) = self.on_success {
            handler(response, operation.kind(), operation);
        }
    }

    pub(crate) fn error(&self, error: &Error, operation: Option<&ParsedOperation>) {
        let kind = operation.and_then(ParsedOperation::kind);
        match self.on_error {
            Some(ref handler) => handler(error, kind, operation),
            None => warn!(kind = ?kind, error = %error, "Unhandled operation error"),
        }
    }

    pub(crate) fn complete(&self) {
        if let Some(ref handler) = self.on_complete {
            handler();
        }
    }

    /// Reports `result` to the handlers and hands it back unchanged.
    pub(crate) fn report(
        &self,
        result: Result<GraphQLResponse>,
        operation: Option<&ParsedOperation>,
    ) -> Result<GraphQLResponse> {
        match (&result, operation) {
            (Ok(response), Some(operation)) => self.success(response, operation),
            (Err(error), operation) => self.error(error, operation),
            (Ok(_), None) => {}
        }
        result
    }

    /// Adapts the handlers to registry callbacks for subscription `id`.
    pub(crate) fn subscription_callbacks(
        self,
        id: &OperationId,
        operation: Arc<ParsedOperation>,
    ) -> SubscriptionCallbacks {
        let on_data = {
            let handlers = self.clone();
            let operation = Arc::clone(&operation);
            move |response: GraphQLResponse| handlers.success(&response, &operation)
        };

        let on_error = {
            let handlers = self.clone();
            let id = id.clone();
            move |payload| {
                let error = Error::ServerErrorFrame {
                    id: id.clone(),
                    payload,
                };
                handlers.error(&error, Some(operation.as_ref()));
            }
        };

        SubscriptionCallbacks::new()
            .on_data(on_data)
            .on_error(on_error)
            .on_complete(move || self.complete())
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Outcome of [`Client::execute`](super::Client::execute).
#[derive(Debug)]
pub enum Execution {
    /// A query or mutation answered over HTTP.
    Response(GraphQLResponse),
    /// A subscription running over the WebSocket session.
    Subscription(SubscriptionHandle),
}

impl Execution {
    /// Returns `true` for subscriptions.
    #[inline]
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscription(_))
    }

    /// Returns the HTTP response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<GraphQLResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Subscription(_) => None,
        }
    }

    /// Returns the subscription handle, if any.
    #[must_use]
    pub fn into_subscription(self) -> Option<SubscriptionHandle> {
        match self {
            Self::Subscription(handle) => Some(handle),
            Self::Response(_) => None,
        }
    }
}

// ============================================================================
// SubscriptionStream
// ============================================================================

/// One event of a subscription.
#[derive(Debug)]
pub enum SubscriptionEvent {
    /// A `data` payload.
    Data(GraphQLResponse),
    /// An `error` frame.
    Error(Error),
    /// The server completed the subscription.
    Complete,
}

/// Subscription events as an async stream.
///
/// The stream ends after [`SubscriptionEvent::Complete`] or when the
/// session closes.
#[derive(Debug)]
pub struct SubscriptionStream {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
}

impl SubscriptionStream {
    pub(crate) fn new(
        handle: SubscriptionHandle,
        receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
    ) -> Self {
        Self { handle, receiver }
    }

    /// Builds registry callbacks feeding `sender`.
    pub(crate) fn callbacks(
        id: &OperationId,
        sender: mpsc::UnboundedSender<SubscriptionEvent>,
    ) -> SubscriptionCallbacks {
        let data_tx = sender.clone();
        let error_tx = sender.clone();
        let id = id.clone();

        SubscriptionCallbacks::new()
            .on_data(move |response| {
                let _ = data_tx.send(SubscriptionEvent::Data(response));
            })
            .on_error(move |payload| {
                let _ = error_tx.send(SubscriptionEvent::Error(Error::ServerErrorFrame {
                    id: id.clone(),
                    payload,
                }));
            })
            .on_complete(move || {
                let _ = sender.send(SubscriptionEvent::Complete);
            })
    }

    /// Waits for the next event. Returns `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.receiver.recv().await
    }

    /// Returns the subscription handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Asks the server to stop the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session has ended.
    pub fn stop(&self) -> Result<()> {
        self.handle.stop()
    }
}

impl Stream for SubscriptionStream {
    type Item = SubscriptionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::operation::classify;

    #[test]
    fn test_report_success_invokes_success_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handlers = Handlers::new().on_success({
            let calls = Arc::clone(&calls);
            move |response, kind, _| calls.lock().push((response.data.clone(), kind))
        });
        let operation = classify("query { a }", None).expect("valid");
        let response = GraphQLResponse {
            data: Some(json!({ "a": 1 })),
            ..Default::default()
        };

        let result = handlers.report(Ok(response.clone()), Some(&operation));

        assert_eq!(result.expect("ok"), response);
        assert_eq!(
            *calls.lock(),
            vec![(Some(json!({ "a": 1 })), Some(OperationKind::Query))]
        );
    }

    #[test]
    fn test_report_error_invokes_error_handler_and_returns_error() {
        let errors = Arc::new(AtomicUsize::new(0));
        let handlers = Handlers::new().on_error({
            let errors = Arc::clone(&errors);
            move |error, kind, operation| {
                assert!(error.is_transport_error());
                assert_eq!(kind, Some(OperationKind::Mutation));
                assert!(operation.is_some());
                errors.fetch_add(1, Ordering::SeqCst);
            }
        });
        let operation = classify("mutation { m }", None).expect("valid");

        let result = handlers.report(Err(Error::transport("down")), Some(&operation));

        assert!(result.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_error_handler_does_not_panic() {
        let handlers = Handlers::new();
        let result = handlers.report(Err(Error::parse("bad")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_subscription_callbacks_wrap_error_frames() {
        let seen = Arc::new(Mutex::new(None));
        let completes = Arc::new(AtomicUsize::new(0));
        let handlers = Handlers::new()
            .on_error({
                let seen = Arc::clone(&seen);
                move |error, kind, _| {
                    *seen.lock() = Some((error.to_string(), kind));
                }
            })
            .on_complete({
                let completes = Arc::clone(&completes);
                move || {
                    completes.fetch_add(1, Ordering::SeqCst);
                }
            });
        let operation = Arc::new(classify("subscription { s }", None).expect("valid"));
        let id = OperationId::from("abcde0");

        let callbacks = handlers.subscription_callbacks(&id, operation);
        callbacks.error(json!({ "message": "denied" }));
        callbacks.complete();

        let (message, kind) = seen.lock().clone().expect("error reported");
        assert!(message.contains("abcde0"));
        assert_eq!(kind, Some(OperationKind::Subscription));
        assert_eq!(completes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_callbacks_forward_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callbacks = SubscriptionStream::callbacks(&OperationId::from("abcde0"), tx);

        callbacks.data(GraphQLResponse::default());
        callbacks.error(json!("oops"));
        callbacks.complete();
        drop(callbacks);

        assert!(matches!(rx.recv().await, Some(SubscriptionEvent::Data(_))));
        assert!(matches!(
            rx.recv().await,
            Some(SubscriptionEvent::Error(Error::ServerErrorFrame { .. }))
        ));
        assert!(matches!(rx.recv().await, Some(SubscriptionEvent::Complete)));
        assert!(rx.recv().await.is_none());
    }
}
