//! Canonical server options.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::protocol::Serializer;

use super::{DEFAULT_HOST, DEFAULT_SSL, DEFAULT_TRIGGER, RawOptions};

// ============================================================================
// ServerOptions
// ============================================================================

/// Validated, immutable server configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOptions {
    host: String,
    port: u16,
    ssl: bool,
    #[serde(skip)]
    serializer: Arc<dyn Serializer>,
    #[serde(rename = "trigger")]
    trigger_events: bool,
}

impl PartialEq for ServerOptions {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.ssl == other.ssl
            && self.trigger_events == other.trigger_events
    }
}

impl ServerOptions {
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
        let serializer = raw.read_serializer()?;
        let trigger_events = raw.read_bool("trigger", DEFAULT_TRIGGER)?;

        Ok(Self {
            host,
            port,
            ssl,
            serializer,
            trigger_events,
        })
    }

    /// Returns the bind host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the bind port (0 lets the OS choose).
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the ssl flag.
    ///
    /// TLS termination is not performed by the server itself.
    #[inline]
    #[must_use]
    pub const fn ssl(&self) -> bool {
        self.ssl
    }

    /// Returns the serializer sessions should use.
    #[inline]
    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
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

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_defaults() {
        let opts = ServerOptions::normalize(&RawOptions::new().port(8001)).expect("valid");
        assert_eq!(opts.host(), "localhost");
        assert_eq!(opts.port(), 8001);
        assert!(!opts.ssl());
        assert!(opts.trigger_events());
    }

    #[test]
    fn test_port_required() {
        let err = ServerOptions::normalize(&RawOptions::new().host("0.0.0.0")).unwrap_err();
        assert_eq!(err.config_field(), Some("port"));
    }

    #[test]
    fn test_url_is_not_a_server_option() {
        let raw = RawOptions::new().url("ws://localhost:8001/");
        let err = ServerOptions::normalize(&raw).unwrap_err();
        assert_eq!(err.config_field(), Some("port"));
    }

    #[test]
    fn test_wrong_typed_fields_named() {
        for (field, value) in [("host", json!(1)), ("ssl", json!(1)), ("trigger", json!("no"))] {
            let raw = RawOptions::new().port(8001).with(field, value);
            let err = ServerOptions::normalize(&raw).unwrap_err();
            assert_eq!(err.config_field(), Some(field));
        }
    }
}
