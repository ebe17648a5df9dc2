//! Client connection controller.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] fluent configuration |
//! | `core` | [`Client`] lifecycle, messaging and accessors |
//! | `state` | [`ConnectionState`] and call parameters |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Lifecycle states and call parameters.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{Client, LifecycleFuture};
pub use state::{ConnectParams, ConnectionState, ReconnectParams};
