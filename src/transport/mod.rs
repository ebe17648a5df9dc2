//! Transport contract and the default WebSocket implementation.
//!
//! Controllers never speak the wire protocol themselves. They ask a
//! [`Connector`] for a fresh [`Transport`] per connect attempt and consume
//! its [`TransportEvent`]s in the order the transport produced them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  open(request)   ┌──────────────┐
//! │    Client    │─────────────────►│  Connector   │
//! │              │                  └──────┬───────┘
//! │              │◄── TransportEvent ──────┤ spawns
//! │              │                  ┌──────▼───────┐        ┌────────┐
//! │              │── send / close ─►│  Transport   │◄──────►│  Peer  │
//! └──────────────┘                  └──────────────┘   ws   └────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite backed [`WsConnector`] |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::Result;
use crate::options::BinaryType;
use crate::protocol::Frame;

// ============================================================================
// Submodules
// ============================================================================

/// tokio-tungstenite transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::{WsConnector, WsTransport};

// ============================================================================
// Types
// ============================================================================

/// Receiving half of a transport's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// ReadyState
// ============================================================================

/// Four-value connection phase indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Open and able to send.
    Open = 1,
    /// Close handshake in progress.
    Closing = 2,
    /// Closed or never opened.
    Closed = 3,
}

impl ReadyState {
    /// Returns the numeric form (0-3).
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts the numeric form back. Out-of-range values map to `Closed`.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Raw callback from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Open,
    /// A frame arrived.
    Message(Frame),
    /// The transport reported an error. A close usually follows.
    Error(String),
    /// The transport closed. Always the last event.
    Close {
        /// Close code, if one was exchanged.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

// ============================================================================
// TransportRequest
// ============================================================================

/// Everything a connector needs to create one transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Canonical URL.
    pub url: String,
    /// Requested subprotocols.
    pub protocols: Vec<String>,
    /// Binary message representation.
    pub binary_type: BinaryType,
    /// Implementation-specific options.
    pub config: Option<WebSocketConfig>,
}

// ============================================================================
// Transport
// ============================================================================

/// One bidirectional message connection.
///
/// A transport is created per connect attempt and never reused.
pub trait Transport: Send + Sync {
    /// Returns the URL this transport was created for.
    fn url(&self) -> &str;

    /// Returns the negotiated subprotocol (empty if none).
    fn protocol(&self) -> String;

    /// Returns the negotiated extensions (empty if none).
    fn extensions(&self) -> String;

    /// Returns the current phase.
    fn ready_state(&self) -> ReadyState;

    /// Returns bytes queued for sending but not yet written.
    fn buffered_amount(&self) -> usize;

    /// Returns the binary message representation.
    fn binary_type(&self) -> BinaryType;

    /// Queues a frame for sending.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not open.
    fn send(&self, frame: Frame) -> Result<()>;

    /// Requests the close handshake. A `Close` event follows.
    fn close(&self, code: Option<u16>, reason: Option<&str>);
}

// ============================================================================
// Connector
// ============================================================================

/// Factory for transports.
pub trait Connector: Send + Sync {
    /// Creates a transport and starts connecting.
    ///
    /// Never fails synchronously: failures arrive as `Error` followed by
    /// `Close` on the returned receiver.
    fn open(&self, request: TransportRequest) -> (Arc<dyn Transport>, EventReceiver);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_numeric_form() {
        for state in [
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closing,
            ReadyState::Closed,
        ] {
            assert_eq!(ReadyState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ReadyState::Open.as_u8(), 1);
        assert_eq!(ReadyState::from_u8(42), ReadyState::Closed);
    }
}
