//! Canonical generic socket options.
//!
//! The generic variant predates URL input: it always takes discrete parts,
//! keeps `path` exactly as given (default empty) and waits longer between
//! reconnects. [`SocketOptions::into_client_options`] lifts it into a
//! [`ClientOptions`] record.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Serializer;

use super::{
    BinaryType, ClientOptions, DEFAULT_AUTO_CONNECT, DEFAULT_AUTO_RECONNECT, DEFAULT_HOST,
    DEFAULT_MESSAGE_TIMEOUT_MS, DEFAULT_SSL, DEFAULT_TRIGGER, RawOptions,
};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before an auto-reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 10_000;

// ============================================================================
// SocketOptions
// ============================================================================

/// Validated, immutable generic socket configuration.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    host: String,
    port: u16,
    ssl: bool,
    path: String,
    binary_type: BinaryType,
    serializer: Arc<dyn Serializer>,
    auto_connect: bool,
    auto_reconnect: bool,
    message_timeout_ms: u64,
    reconnect_interval_ms: u64,
    protocols: Option<Vec<String>>,
    trigger_events: bool,
}

impl SocketOptions {
    /// Validates `raw` into a canonical record. `port` is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) naming the first
    /// offending field.
    pub fn normalize(raw: &RawOptions) -> Result<Self> {
        let port = raw.require_port("port")?;
        let host = raw
            .read_string("host")?
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .to_string();
        let ssl = raw.read_bool("ssl", DEFAULT_SSL)?;
        let path = raw.read_string("path")?.unwrap_or_default().to_string();
        let binary_type = raw.read_binary_type(BinaryType::default())?;
        let serializer = raw.read_serializer()?;
        let auto_connect = raw.read_bool("autoConnect", DEFAULT_AUTO_CONNECT)?;
        let auto_reconnect = raw.read_bool("autoReconnect", DEFAULT_AUTO_RECONNECT)?;
        let message_timeout_ms = raw.read_duration_ms("messageTimeout", DEFAULT_MESSAGE_TIMEOUT_MS)?;
        let reconnect_interval_ms =
            raw.read_duration_ms("reconnectInterval", DEFAULT_RECONNECT_INTERVAL_MS)?;
        let trigger_events = raw.read_bool("trigger", DEFAULT_TRIGGER)?;
        let protocols = raw.read_protocols()?.filter(|p| !p.is_empty());

        Ok(Self {
            host,
            port,
            ssl,
            path,
            binary_type,
            serializer,
            auto_connect,
            auto_reconnect,
            message_timeout_ms,
            reconnect_interval_ms,
            protocols,
            trigger_events,
        })
    }

    /// Lifts this record into client options. The connect timeout takes the
    /// client default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the parts do not
    /// form a valid URL.
    pub fn into_client_options(self) -> Result<ClientOptions> {
        let raw = RawOptions::new()
            .host(self.host)
            .port(self.port)
            .ssl(self.ssl)
            .path(self.path)
            .binary_type(self.binary_type)
            .auto_connect(self.auto_connect)
            .auto_reconnect(self.auto_reconnect)
            .message_timeout(self.message_timeout_ms)
            .reconnect_interval(self.reconnect_interval_ms)
            .protocol(self.protocols.unwrap_or_default())
            .trigger(self.trigger_events)
            .serializer(self.serializer);

        ClientOptions::normalize(&raw)
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` for `wss`.
    #[inline]
    #[must_use]
    pub const fn ssl(&self) -> bool {
        self.ssl
    }

    /// Returns the path as supplied.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the binary type.
    #[inline]
    #[must_use]
    pub const fn binary_type(&self) -> BinaryType {
        self.binary_type
    }

    /// Returns the serializer.
    #[inline]
    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    /// Returns `true` if the socket connects on construction.
    #[inline]
    #[must_use]
    pub const fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    /// Returns `true` if the socket reconnects after close.
    #[inline]
    #[must_use]
    pub const fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Returns the message timeout in milliseconds.
    #[inline]
    #[must_use]
    pub const fn message_timeout_ms(&self) -> u64 {
        self.message_timeout_ms
    }

    /// Returns the auto-reconnect delay in milliseconds.
    #[inline]
    #[must_use]
    pub const fn reconnect_interval_ms(&self) -> u64 {
        self.reconnect_interval_ms
    }

    /// Returns the requested subprotocols, if any.
    #[inline]
    #[must_use]
    pub fn protocols(&self) -> Option<&[String]> {
        self.protocols.as_deref()
    }

    /// Returns `true` if events are published.
    #[inline]
    #[must_use]
    pub const fn trigger_events(&self) -> bool {
        self.trigger_events
    }
}

// ============================================================================
// Tests
// ============================================================================
