//! Canonical client options.
//!
//! A client record is created from exactly one authoritative shape:
//!
//! - a `ws`/`wss` URL, from which host, port, path and ssl are derived
//!   (overriding any supplied parts), or
//! - discrete parts `{port, host?, ssl?, path?}`, from which the URL
//!   `{ws|wss}://{host}:{port}{path}` is synthesized.
//!
//! Either way the parts are re-derived from the parsed URL, so the two views
//! always agree.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Serializer;

use super::{
    BinaryType, DEFAULT_AUTO_CONNECT, DEFAULT_AUTO_RECONNECT, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_HOST, DEFAULT_MESSAGE_TIMEOUT_MS, DEFAULT_SSL, DEFAULT_TRIGGER, RawOptions,
    ReconnectPolicy,
};

// ============================================================================
// Constants
// ============================================================================

/// Default path when none is supplied.
const DEFAULT_PATH: &str = "/";

/// Default delay before an auto-reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 2000;

// ============================================================================
// ClientOptions
// ============================================================================

/// Validated, immutable client configuration.
///
/// Equality compares the configuration fields; the serializer is not part
/// of equality.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    url: String,
    host: String,
    port: u16,
    ssl: bool,
    path: String,
    binary_type: BinaryType,
    #[serde(skip)]
    serializer: Arc<dyn Serializer>,
    auto_connect: bool,
    auto_reconnect: bool,
    #[serde(rename = "connectTimeout")]
    connect_timeout_ms: u64,
    #[serde(rename = "messageTimeout")]
    message_timeout_ms: u64,
    #[serde(rename = "reconnectInterval")]
    reconnect_interval_ms: u64,
    reconnect_policy: ReconnectPolicy,
    #[serde(rename = "protocol")]
    protocols: Vec<String>,
    #[serde(rename = "trigger")]
    trigger_events: bool,
}

impl PartialEq for ClientOptions {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.host == other.host
            && self.port == other.port
            && self.ssl == other.ssl
            && self.path == other.path
            && self.binary_type == other.binary_type
            && self.auto_connect == other.auto_connect
            && self.auto_reconnect == other.auto_reconnect
            && self.connect_timeout_ms == other.connect_timeout_ms
            && self.message_timeout_ms == other.message_timeout_ms
            && self.reconnect_interval_ms == other.reconnect_interval_ms
            && self.reconnect_policy == other.reconnect_policy
            && self.protocols == other.protocols
            && self.trigger_events == other.trigger_events
    }
}

// ============================================================================
// Normalization
// ============================================================================

impl ClientOptions {
    /// Validates `raw` into a canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn normalize(raw: &RawOptions) -> Result<Self> {
        let url = raw.read_url()?;
        let port = raw.read_port("port")?;

        if url.is_none() && port.is_none() {
            return Err(Error::config("port", "is not an integer between [0-65535]"));
        }

        let host = raw
            .read_string("host")?
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .to_string();
        let ssl = raw.read_bool("ssl", DEFAULT_SSL)?;
        let path = leading_slash(raw.read_string("path")?.unwrap_or(DEFAULT_PATH));
        let binary_type = raw.read_binary_type(BinaryType::default())?;
        let serializer = raw.read_serializer()?;
        let auto_connect = raw.read_bool("autoConnect", DEFAULT_AUTO_CONNECT)?;
        let auto_reconnect = raw.read_bool("autoReconnect", DEFAULT_AUTO_RECONNECT)?;
        let connect_timeout_ms = raw.read_duration_ms("connectTimeout", DEFAULT_CONNECT_TIMEOUT_MS)?;
        let message_timeout_ms = raw.read_duration_ms("messageTimeout", DEFAULT_MESSAGE_TIMEOUT_MS)?;
        let reconnect_interval_ms =
            raw.read_duration_ms("reconnectInterval", DEFAULT_RECONNECT_INTERVAL_MS)?;
        let reconnect_policy = raw.read_reconnect_policy(ReconnectPolicy::default())?;
        let trigger_events = raw.read_bool("trigger", DEFAULT_TRIGGER)?;
        let protocols = raw.read_protocols()?.unwrap_or_default();

        let url = match url {
            Some(url) => url,
            None => synthesize_url(ssl, &host, port.unwrap_or_default(), &path)?,
        };
        let parts = UrlParts::derive(&url)?;

        Ok(Self {
            url: url.to_string(),
            host: parts.host,
            port: parts.port,
            ssl: parts.ssl,
            path: parts.path,
            binary_type,
            serializer,
            auto_connect,
            auto_reconnect,
            connect_timeout_ms,
            message_timeout_ms,
            reconnect_interval_ms,
            reconnect_policy,
            protocols,
            trigger_events,
        })
    }

    /// Converts the record back into raw input that normalizes to an equal
    /// record. The serializer is carried over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_raw(&self) -> Result<RawOptions> {
        let raw = RawOptions::from_value(serde_json::to_value(self)?)?;
        Ok(raw.serializer(Arc::clone(&self.serializer)))
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientOptions {
    /// Returns the canonical URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
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

    /// Returns the path (always starts with `/`).
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

    /// Returns `true` if the client connects on construction.
    #[inline]
    #[must_use]
    pub const fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    /// Returns `true` if the client reconnects after close.
    #[inline]
    #[must_use]
    pub const fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Returns the connect timeout in milliseconds.
    #[inline]
    #[must_use]
    pub const fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms
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

    /// Returns the auto-reconnect policy.
    #[inline]
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect_policy
    }

    /// Returns the requested subprotocols.
    #[inline]
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Returns `true` if events are published.
    #[inline]
    #[must_use]
    pub const fn trigger_events(&self) -> bool {
        self.trigger_events
    }
}

// ============================================================================
// URL Helpers
// ============================================================================

/// Discrete parts derived from a parsed URL.
struct UrlParts {
    host: String,
    port: u16,
    ssl: bool,
    path: String,
}

impl UrlParts {
    fn derive(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::config("url", "has no host"))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::config("url", "has no port"))?;

        Ok(Self {
            host,
            port,
            ssl: url.scheme() == "wss",
            path: url.path().to_string(),
        })
    }
}

/// Characters that would move part of the host into another URL component.
const HOST_DELIMITERS: &[char] = &['/', '?', '#', '@', '\\'];

/// Builds `{ws|wss}://{host}:{port}{path}`.
///
/// The parsed URL must carry exactly the given host and port, and the path
/// must not spill into a query or fragment.
fn synthesize_url(ssl: bool, host: &str, port: u16, path: &str) -> Result<Url> {
    if host.contains(HOST_DELIMITERS) {
        return Err(Error::config("host", "is not a valid host name"));
    }
    if path.contains(['?', '#']) {
        return Err(Error::config("path", "must not contain '?' or '#'"));
    }

    let scheme = if ssl { "wss" } else { "ws" };
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };

    let url = Url::parse(&format!("{scheme}://{host}:{port}{path}"))
        .map_err(|e| Error::config("host", format!("does not form a valid WebSocket URL: {e}")))?;

    let intact = url.username().is_empty()
        && url.password().is_none()
        && url.host_str().is_some()
        && url.port_or_known_default() == Some(port);
    if !intact {
        return Err(Error::config("host", "is not a valid host name"));
    }

    Ok(url)
}

fn leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn normalize(value: serde_json::Value) -> Result<ClientOptions> {
        ClientOptions::normalize(&RawOptions::from_value(value)?)
    }

    #[test]
    fn test_defaults_from_port_only() {
        let opts = normalize(json!({ "port": 8001 })).expect("valid");

        assert_eq!(opts.url(), "ws://localhost:8001/");
        assert_eq!(opts.host(), "localhost");
        assert_eq!(opts.port(), 8001);
        assert!(!opts.ssl());
        assert_eq!(opts.path(), "/");
        assert_eq!(opts.binary_type(), BinaryType::Blob);
        assert!(!opts.auto_connect());
        assert!(!opts.auto_reconnect());
        assert_eq!(opts.connect_timeout_ms(), 5000);
        assert_eq!(opts.message_timeout_ms(), 10_000);
        assert_eq!(opts.reconnect_interval_ms(), DEFAULT_RECONNECT_INTERVAL_MS);
        assert_eq!(opts.reconnect_policy(), ReconnectPolicy::Always);
        assert!(opts.protocols().is_empty());
        assert!(opts.trigger_events());
    }

    #[test]
    fn test_parts_synthesize_url() {
        let opts = normalize(json!({
            "host": "example.com",
            "port": 9000,
            "ssl": true,
            "path": "chat"
        }))
        .expect("valid");

        assert_eq!(opts.url(), "wss://example.com:9000/chat");
        assert_eq!(opts.path(), "/chat");
    }

    #[test]
    fn test_url_overrides_parts() {
        let opts = normalize(json!({
            "url": "wss://Example.COM:7000/Feed",
            "host": "ignored",
            "port": 1,
            "ssl": false,
            "path": "/ignored"
        }))
        .expect("valid");

        assert_eq!(opts.host(), "example.com");
        assert_eq!(opts.port(), 7000);
        assert!(opts.ssl());
        assert_eq!(opts.path(), "/Feed");
    }

    #[test]
    fn test_url_without_port_uses_scheme_default() {
        let plain = normalize(json!({ "url": "ws://example.com/" })).expect("valid");
        assert_eq!(plain.port(), 80);

        let secure = normalize(json!({ "url": "wss://example.com/" })).expect("valid");
        assert_eq!(secure.port(), 443);
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let opts = normalize(json!({ "host": "::1", "port": 8001 })).expect("valid");
        assert_eq!(opts.url(), "ws://[::1]:8001/");
        assert_eq!(opts.host(), "[::1]");
    }

    #[test]
    fn test_host_with_url_delimiters_rejected() {
        for host in ["example.com/x", "example.com?q", "example.com#f", "user@example.com"] {
            let err = normalize(json!({ "host": host, "port": 8001 })).unwrap_err();
            assert_eq!(err.config_field(), Some("host"), "host {host:?}");
        }
    }

    #[test]
    fn test_path_with_query_or_fragment_rejected() {
        for path in ["/feed?x=1", "feed#top"] {
            let err = normalize(json!({ "port": 8001, "path": path })).unwrap_err();
            assert_eq!(err.config_field(), Some("path"), "path {path:?}");
        }
    }

    #[test]
    fn test_parts_keep_requested_host_and_port() {
        let opts = normalize(json!({ "host": "Example.COM", "port": 8001, "path": "x:1" }))
            .expect("valid");
        assert_eq!(opts.host(), "example.com");
        assert_eq!(opts.port(), 8001);
        assert_eq!(opts.path(), "/x:1");
    }

    #[test]
    fn test_missing_port_without_url() {
        let err = normalize(json!({ "host": "localhost" })).unwrap_err();
        assert_eq!(err.config_field(), Some("port"));
    }

    #[test]
    fn test_non_ws_scheme_rejected() {
        let err = normalize(json!({ "url": "https://example.com/" })).unwrap_err();
        assert_eq!(err.config_field(), Some("url"));
    }

    #[test]
    fn test_wrong_typed_fields_named() {
        let cases = [
            ("host", json!(5)),
            ("ssl", json!("yes")),
            ("path", json!(1)),
            ("binaryType", json!("buffer")),
            ("autoConnect", json!(1)),
            ("autoReconnect", json!("true")),
            ("connectTimeout", json!(-1)),
            ("messageTimeout", json!(1.5)),
            ("reconnectInterval", json!("100")),
            ("trigger", json!(0)),
            ("protocol", json!(3)),
            ("reconnectPolicy", json!("sometimes")),
        ];

        for (field, value) in cases {
            let mut doc = json!({ "port": 8001 });
            doc[field] = value;
            let err = normalize(doc).unwrap_err();
            assert_eq!(err.config_field(), Some(field), "field {field}");
        }
    }

    #[test]
    fn test_zero_durations_kept() {
        let opts = normalize(json!({ "port": 1, "reconnectInterval": 0 })).expect("valid");
        assert_eq!(opts.reconnect_interval_ms(), 0);
    }

    #[test]
    fn test_to_raw_renormalizes_equal() {
        let opts = normalize(json!({
            "port": 8001,
            "protocol": ["a", "b"],
            "binaryType": "arraybuffer",
            "reconnectPolicy": "afterOpen"
        }))
        .expect("valid");

        let again = ClientOptions::normalize(&opts.to_raw().expect("raw")).expect("valid");
        assert_eq!(opts, again);
        assert!(Arc::ptr_eq(opts.serializer(), again.serializer()));
    }

    #[test]
    fn test_caller_input_untouched() {
        let raw = RawOptions::new().port(8001).path("chat");
        let _ = ClientOptions::normalize(&raw).expect("valid");
        assert_eq!(raw.get("path"), Some(&json!("chat")));
        assert!(!raw.contains("url"));
    }
}
