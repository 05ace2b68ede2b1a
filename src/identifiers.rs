//! Type-safe identifiers.
//!
//! An [`OperationId`] correlates a `start` frame with the `data`, `error`
//! and `complete` frames the server sends back for it.
//!
//! # Format
//!
//! A random 5-character alphanumeric prefix followed by the number of
//! subscriptions registered when the ID was generated:
//!
//! ```text
//! aZ3kQ0, Lm9xP1, 7hTqe2, ...
//! ```
//!
//! IDs only need to be unique among the subscriptions that are live on
//! one connection at the same time; the registry re-rolls on collision.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Length of the random prefix.
const RANDOM_PREFIX_LEN: usize = 5;

// ============================================================================
// OperationId
// ============================================================================

/// Identifier of one logical subscription on a WebSocket session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Generates a fresh ID from a random prefix and the live subscription count.
    #[must_use]
    pub fn generate(live_count: usize) -> Self {
        let prefix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_PREFIX_LEN)
            .map(char::from)
            .collect();

        Self(format!("{prefix}{live_count}"))
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
