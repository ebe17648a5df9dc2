//! Accepted connections and their identifiers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;

// ============================================================================
// SessionId
// ============================================================================

/// Identifier for one accepted connection. Never reused by its server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates an id from its numeric form.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric form.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SessionIdGenerator
// ============================================================================

/// Monotonic id source owned by one server. Starts at 0.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    next: AtomicU64,
}

impl SessionIdGenerator {
    /// Creates a generator starting at 0.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Returns the next id.
    #[inline]
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// ServerSession
// ============================================================================

/// One accepted inbound WebSocket connection.
///
/// Published with `socket:connection`; the receiver owns the stream from
/// then on.
pub struct ServerSession {
    id: SessionId,
    peer_addr: SocketAddr,
    stream: WebSocketStream<TcpStream>,
}

impl ServerSession {
    pub(crate) fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        stream: WebSocketStream<TcpStream>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            stream,
        }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the remote address.
    #[inline]
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the stream for reading and writing in place.
    #[inline]
    pub fn stream_mut(&mut self) -> &mut WebSocketStream<TcpStream> {
        &mut self.stream
    }

    /// Consumes the session, returning the stream.
    #[inline]
    #[must_use]
    pub fn into_stream(self) -> WebSocketStream<TcpStream> {
        self.stream
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_monotonic_from_zero() {
        let ids = SessionIdGenerator::new();
        assert_eq!(ids.next_id(), SessionId::new(0));
        assert_eq!(ids.next_id().get(), 1);
        assert_eq!(ids.next_id().get(), 2);
    }

    #[test]
    fn test_generators_are_independent() {
        let a = SessionIdGenerator::new();
        let b = SessionIdGenerator::default();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id().get(), 0);
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId::new(42).to_string(), "42");
    }
}
