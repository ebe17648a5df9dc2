//! wsbus - WebSocket connection lifecycle management.
//!
//! This library drives message-oriented WebSocket connections through their
//! lifecycle: it validates configuration, connects with a timeout, reconnects
//! automatically, queues outbound messages until the socket is open and
//! publishes semantic `socket:*` events to an injected sink.
//!
//! # Architecture
//!
//! ```text
//! RawOptions ──normalize──► ClientOptions ──► Client ──► Connector ──► Transport
//!                                               │  ▲
//!                                   SocketEvent │  │ MessageQueue
//!                                               ▼  │
//!                                           EventSink
//! ```
//!
//! Key design principles:
//!
//! - Canonical options are immutable; reconfiguration builds a new record
//! - One transport per connect attempt, never reused
//! - Sinks and queue consumers are never called with a lock held
//! - The wire protocol lives behind the [`Connector`] / [`Transport`] traits
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio::sync::mpsc;
//! use wsbus::{Client, RawOptions, Result, SocketEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (events, mut rx) = mpsc::unbounded_channel::<SocketEvent>();
//!
//!     let client = Client::builder()
//!         .options(RawOptions::new().port(8001).auto_reconnect(true))
//!         .event_sink(Arc::new(events))
//!         .build()?;
//!
//!     client.connect().await?;
//!     client.queue().push(serde_json::json!({ "type": "hello" }).into());
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{}: {:?}", event.name(), event);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client controller: [`Client`], [`ClientBuilder`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`options`] | Option normalization |
//! | [`protocol`] | Payloads, serializers and events |
//! | [`queue`] | Ack-driven outbound [`MessageQueue`] |
//! | [`server`] | Server controller: [`Server`] |
//! | [`transport`] | Transport contract and tokio-tungstenite implementation |

// ============================================================================
// Modules
// ============================================================================

/// Client connection controller.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Option normalization.
///
/// Turns [`RawOptions`] into validated, immutable canonical records.
pub mod options;

/// Message payloads, serializers and semantic events.
pub mod protocol;

/// Single-consumer outbound message queue.
pub mod queue;

/// Server controller.
pub mod server;

/// Transport contract and the default WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Client, ClientBuilder, ConnectParams, ConnectionState, LifecycleFuture, ReconnectParams,
};

// Error types
pub use error::{Error, Result};

// Option types
pub use options::{
    BinaryType, ClientOptions, RawOptions, ReconnectPolicy, ServerOptions, SocketOptions,
};

// Protocol types
pub use protocol::{EventSink, Frame, JsonSerializer, NullSink, Payload, Serializer, SocketEvent};

// Queue types
pub use queue::MessageQueue;

// Server types
pub use server::{Server, ServerSession, ServerState, SessionId, SessionIdGenerator};

// Transport types
pub use transport::{
    Connector, ReadyState, Transport, TransportEvent, TransportRequest, WsConnector,
};
