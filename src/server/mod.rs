//! Server controller.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Server`] start / shutdown and the accept loop |
//! | `session` | [`ServerSession`], [`SessionId`], [`SessionIdGenerator`] |

// ============================================================================
// Submodules
// ============================================================================

/// Core server implementation.
pub mod core;

/// Accepted connections and their identifiers.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{Server, ServerState};
pub use session::{ServerSession, SessionId, SessionIdGenerator};
