//! GraphQL operation classification and transport routing.
//!
//! Every document passes through here before anything touches the network:
//!
//! 1. [`classify`] parses the text, picks the operation to run and
//!    reports its [`OperationKind`]
//! 2. [`route`] maps that kind onto a [`Transport`]
//!
//! Both steps are pure functions over their inputs.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `classify` | Document parsing and named-operation selection |
//! | `route` | Operation kind to transport mapping |

// ============================================================================
// Submodules
// ============================================================================

/// Document parsing and named-operation selection.
pub mod classify;

/// Operation kind to transport mapping.
pub mod route;

// ============================================================================
// Re-exports
// ============================================================================

pub use classify::{OperationKind, ParsedOperation, classify};
pub use route::{Transport, route};
