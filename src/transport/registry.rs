//! Operation ID to callback mapping.
//!
//! An entry lives from the moment a subscription is requested until the
//! server sends `complete` for it (or a never-started subscription is
//! stopped). `data` and `error` frames leave the entry in place.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::identifiers::OperationId;
use crate::protocol::GraphQLResponse;

// ============================================================================
// Types
// ============================================================================

/// Called with each `data` payload.
pub type DataCallback = Box<dyn Fn(GraphQLResponse) + Send + Sync>;

/// Called with each `error` payload.
pub type ErrorCallback = Box<dyn Fn(Value) + Send + Sync>;

/// Called once when the server completes the operation.
pub type CompleteCallback = Box<dyn Fn() + Send + Sync>;

// ============================================================================
// SubscriptionCallbacks
// ============================================================================

/// The callback triple of one subscription.
///
/// Every callback is optional; missing ones are no-ops.
#[derive(Default)]
pub struct SubscriptionCallbacks {
    on_data: Option<DataCallback>,
    on_error: Option<ErrorCallback>,
    on_complete: Option<CompleteCallback>,
}

impl SubscriptionCallbacks {
    /// Creates an empty callback set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data callback.
    #[must_use]
    pub fn on_data(mut self, callback: impl Fn(GraphQLResponse) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Box::new(callback));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Sets the completion callback.
    #[must_use]
    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub(crate) fn data(&self, payload: GraphQLResponse) {
        if let Some(ref callback) = self.on_data {
            callback(payload);
        }
    }

    pub(crate) fn error(&self, payload: Value) {
        if let Some(ref callback) = self.on_error {
            callback(payload);
        }
    }

    pub(crate) fn complete(&self) {
        if let Some(ref callback) = self.on_complete {
            callback();
        }
    }
}

impl fmt::Debug for SubscriptionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionCallbacks")
            .field("on_data", &self.on_data.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Live subscriptions of one session.
///
/// Callbacks are handed out as `Arc` so they can run after the registry
/// lock is released.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: FxHashMap<OperationId, Arc<SubscriptionCallbacks>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates an ID not currently registered.
    #[must_use]
    pub fn next_id(&self) -> OperationId {
        loop {
            let id = OperationId::generate(self.entries.len());
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Registers callbacks under `id`, replacing nothing.
    ///
    /// Returns `false` if `id` is already live.
    pub fn register(&mut self, id: OperationId, callbacks: SubscriptionCallbacks) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, Arc::new(callbacks));
        true
    }

    /// Looks up the callbacks for `id`.
    #[must_use]
    pub fn lookup(&self, id: &OperationId) -> Option<Arc<SubscriptionCallbacks>> {
        self.entries.get(id).cloned()
    }

    /// Removes `id`, returning its callbacks.
    pub fn remove(&mut self, id: &OperationId) -> Option<Arc<SubscriptionCallbacks>> {
        self.entries.remove(id)
    }

    /// Returns `true` if `id` is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &OperationId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns the number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no subscription is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the live IDs, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<OperationId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

// ============================================================================
// Tests
// ============================================================================
