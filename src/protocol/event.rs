//! Semantic socket events.
//!
//! Controllers translate raw transport callbacks into [`SocketEvent`]s and
//! publish them through an injected [`EventSink`].
//!
//! # Event Names
//!
//! | Event | Name | Emitted by |
//! |-------|------|------------|
//! | [`SocketEvent::Open`] | `socket:open` | client |
//! | [`SocketEvent::Close`] | `socket:close` | client |
//! | [`SocketEvent::Error`] | `socket:error` | client |
//! | [`SocketEvent::MessageIn`] | `socket:message:in` | client |
//! | [`SocketEvent::Connection`] | `socket:connection` | server |
//! | [`SocketEvent::Listening`] | `socket:listening` | server |

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::trace;

use crate::server::ServerSession;

use super::Payload;

// ============================================================================
// Constants
// ============================================================================

/// Name of the open event.
pub const EVENT_OPEN: &str = "socket:open";

/// Name of the close event.
pub const EVENT_CLOSE: &str = "socket:close";

/// Name of the error event.
pub const EVENT_ERROR: &str = "socket:error";

/// Name of the inbound message event.
pub const EVENT_MESSAGE_IN: &str = "socket:message:in";

/// Name of the inbound connection event.
pub const EVENT_CONNECTION: &str = "socket:connection";

/// Name of the listening event.
pub const EVENT_LISTENING: &str = "socket:listening";

// ============================================================================
// SocketEvent
// ============================================================================

/// A semantic event published by a controller.
#[derive(Debug)]
pub enum SocketEvent {
    /// The client transport opened.
    Open,

    /// The client transport closed.
    Close {
        /// Close code reported by the peer, if any.
        code: Option<u16>,
        /// Close reason reported by the peer.
        reason: String,
    },

    /// The client transport reported an error.
    Error {
        /// Raw error description from the transport.
        message: String,
    },

    /// A message arrived on the client transport.
    MessageIn(Payload),

    /// The server accepted an inbound connection.
    Connection(ServerSession),

    /// The server started listening.
    Listening {
        /// Address the server is bound to.
        local_addr: SocketAddr,
    },
}

impl SocketEvent {
    /// Returns the event name (e.g. `socket:open`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => EVENT_OPEN,
            Self::Close { .. } => EVENT_CLOSE,
            Self::Error { .. } => EVENT_ERROR,
            Self::MessageIn(_) => EVENT_MESSAGE_IN,
            Self::Connection(_) => EVENT_CONNECTION,
            Self::Listening { .. } => EVENT_LISTENING,
        }
    }
}

// ============================================================================
// EventSink
// ============================================================================

/// Publish capability injected into controllers at construction.
///
/// Controllers never call the sink while holding internal locks, so a sink
/// may call back into the controller that emitted the event.
pub trait EventSink: Send + Sync {
    /// Publishes one event.
    fn trigger(&self, event: SocketEvent);
}

/// Forwards events into a tokio channel. Events are dropped once the
/// receiver is gone.
impl EventSink for mpsc::UnboundedSender<SocketEvent> {
    fn trigger(&self, event: SocketEvent) {
        let _ = self.send(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn trigger(&self, event: SocketEvent) {
        trace!(event = event.name(), "Event discarded");
    }
}

// ============================================================================
// Tests
// ============================================================================
