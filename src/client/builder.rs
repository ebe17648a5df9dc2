//! Builder pattern for client configuration.
//!
//! Provides a fluent API for wiring a [`Client`] to its options, transport
//! factory and event sink.
//!
//! # Example
//!
//! ```no_run
//! use wsbus::{Client, RawOptions};
//!
//! # async fn example() -> wsbus::Result<()> {
//! let client = Client::builder()
//!     .options(RawOptions::new().url("ws://localhost:8001/feed"))
//!     .build()?;
//!
//! client.connect().await?;
//! client.send(serde_json::json!({ "kind": "hello" }));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::Result;
use crate::options::RawOptions;
use crate::protocol::{EventSink, NullSink};
use crate::transport::{Connector, WsConnector};

use super::core::Client;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Initial options; a client without them must receive options on connect.
    options: Option<RawOptions>,
    /// Transport factory; defaults to [`WsConnector`].
    connector: Option<Arc<dyn Connector>>,
    /// Event destination; defaults to [`NullSink`].
    sink: Option<Arc<dyn EventSink>>,
    /// tungstenite tuning passed to every transport.
    ws_config: Option<WebSocketConfig>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial options. They are validated by [`build`](Self::build).
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RawOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the transport factory.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the event sink.
    ///
    /// # Arguments
    ///
    /// * `sink` - Receives `socket:*` events; called without internal locks held
    #[inline]
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets tungstenite options (frame and message size limits).
    #[inline]
    #[must_use]
    pub fn ws_config(mut self, config: WebSocketConfig) -> Self {
        self.ws_config = Some(config);
        self
    }

    /// Builds the client.
    ///
    /// Starts connecting on the next tick when the options enable
    /// `autoConnect` and a tokio runtime is running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options are
    /// invalid.
    pub fn build(self) -> Result<Client> {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::default()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));

        Client::new(self.options.as_ref(), connector, sink, self.ws_config)
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .field("custom_sink", &self.sink.is_some())
            .field("ws_config", &self.ws_config)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::ConnectionState;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.options.is_none());
        assert!(builder.connector.is_none());
        assert!(builder.sink.is_none());
        assert!(builder.ws_config.is_none());
    }

    #[test]
    fn test_build_without_options() {
        let client = ClientBuilder::new().build().expect("client");
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(client.options().is_none());
    }

    #[test]
    fn test_build_validates_options() {
        let err = ClientBuilder::new()
            .options(RawOptions::new().with("connectTimeout", "soon"))
            .build()
            .unwrap_err();
        assert_eq!(err.config_field(), Some("connectTimeout"));
    }

    #[test]
    fn test_auto_connect_without_runtime_stays_idle() {
        let client = ClientBuilder::new()
            .options(RawOptions::new().port(8001).auto_connect(true))
            .build()
            .expect("client");
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_debug_hides_trait_objects() {
        let rendered = format!("{:?}", ClientBuilder::new().event_sink(Arc::new(NullSink)));
        assert!(rendered.contains("custom_sink: true"));
    }
}
