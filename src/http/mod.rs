//! HTTP transport for queries and mutations.
//!
//! One POST per operation, JSON in and JSON out. Requests are independent
//! of each other and carry no ordering guarantee.
//!
//! # Outcome Mapping
//!
//! | Server behaviour | Result |
//! |------------------|--------|
//! | JSON body without `errors` | `Ok(GraphQLResponse)` |
//! | JSON body with `errors` | [`Error::GraphQL`](crate::Error::GraphQL) carrying the full body |
//! | Network failure, non-JSON body | [`Error::Transport`](crate::Error::Transport) (`failed to fetch`) |

// ============================================================================
// Submodules
// ============================================================================

/// Request execution.
pub mod executor;

// ============================================================================
// Re-exports
// ============================================================================

pub use executor::HttpExecutor;
