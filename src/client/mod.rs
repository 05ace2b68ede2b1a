//! Client facade and its configuration.
//!
//! # Example
//!
//! ```no_run
//! use graphqurl::{Client, Handlers, QueryOptions, SubscribeOptions};
//!
//! # async fn example() -> graphqurl::Result<()> {
//! let client = Client::builder()
//!     .endpoint("http://localhost:8080/v1/graphql")
//!     .build()?;
//!
//! let response = client.query(QueryOptions::new("query { users { id } }")).await?;
//! println!("{:?}", response.data);
//!
//! let handle = client
//!     .subscribe(
//!         SubscribeOptions::new("subscription { users { id } }"),
//!         Handlers::new().on_success(|response, _, _| println!("{:?}", response.data)),
//!     )
//!     .await?;
//! handle.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent [`ClientBuilder`] |
//! | `context` | Endpoint, headers and connection params |
//! | `core` | The [`Client`] facade |
//! | `handlers` | Callback and stream adapters |
//! | `options` | Per-client and per-operation options |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent client builder.
pub mod builder;

/// Endpoint, headers and connection params.
pub mod context;

/// The client facade.
pub mod core;

/// Callback and stream adapters.
pub mod handlers;

/// Per-client and per-operation options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use context::{ClientContext, WebSocketContext, ws_url_from};
pub use core::Client;
pub use handlers::{Execution, Handlers, SubscriptionEvent, SubscriptionStream};
pub use options::{
    ClientOptions, ENDPOINT_ENV_VAR, QueryOptions, SubscribeOptions, WebSocketOptions,
};
