//! Message and event types shared by client and server.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`Payload`] | Caller ↔ Controller | Application data (structured or raw) |
//! | [`Frame`] | Controller ↔ Transport | Wire-ready text or binary message |
//! | [`SocketEvent`] | Controller → Sink | Semantic lifecycle and message events |
//!
//! Structured payloads are turned into text frames by the configured
//! [`Serializer`]. Inbound text frames are parsed with the same serializer;
//! anything it rejects is passed through as raw text.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Semantic events and the [`EventSink`] capability |
//! | `payload` | [`Payload`] and [`Frame`] |
//! | `serializer` | [`Serializer`] trait and [`JsonSerializer`] |

// ============================================================================
// Submodules
// ============================================================================

/// Semantic socket events.
pub mod event;

/// Payload and frame types.
pub mod payload;

/// Pluggable payload codec.
pub mod serializer;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{EventSink, NullSink, SocketEvent};
pub use payload::{Frame, Payload};
pub use serializer::{JsonSerializer, Serializer};
