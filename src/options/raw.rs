//! Raw, unvalidated option input.
//!
//! [`RawOptions`] holds JSON-shaped fields exactly as the caller supplied them,
//! so wrong-typed values stay representable until a normalizer rejects them.
//!
//! # Example
//!
//! ```ignore
//! use wsbus::RawOptions;
//!
//! let raw = RawOptions::new()
//!     .port(8001)
//!     .auto_reconnect(true)
//!     .reconnect_interval(100);
//!
//! // Or straight from a config document
//! let raw = RawOptions::from_value(serde_json::json!({ "url": "ws://localhost:8001/" }))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{JsonSerializer, Serializer};

use super::{BinaryType, ReconnectPolicy};

// ============================================================================
// Constants
// ============================================================================

const EXPECTED_OBJECT: &str = "is not an object";
const EXPECTED_BOOL: &str = "is not a boolean";
const EXPECTED_STRING: &str = "is not a string";
const EXPECTED_PORT: &str = "is not an integer between [0-65535]";
const EXPECTED_DURATION: &str = "is not an integer or < 0";
const EXPECTED_BINARY_TYPE: &str = "must be 'blob' or 'arraybuffer'";
const EXPECTED_PROTOCOL: &str = "is not a string or string[]";
const EXPECTED_POLICY: &str = "must be 'always' or 'afterOpen'";
const EXPECTED_WS_URL: &str = "is not a WebSocket URL";
const EXPECTED_SERIALIZER: &str =
    "must be supplied as a Serializer implementation, not an inline value";

/// Largest float that still represents an exact integer.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_991.0;

// ============================================================================
// RawOptions
// ============================================================================

/// Unvalidated option fields plus an optional out-of-band serializer.
///
/// `null` fields are treated as absent. Unknown keys are ignored by the
/// normalizers.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    /// Caller-supplied fields keyed by option name.
    fields: Map<String, Value>,
    /// Custom serializer, if any.
    serializer: Option<Arc<dyn Serializer>>,
}

// ============================================================================
// Constructors
// ============================================================================

impl RawOptions {
    /// Creates an empty option set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an option set from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming `options` if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::from(fields)),
            _ => Err(Error::config("options", EXPECTED_OBJECT)),
        }
    }
}

impl From<Map<String, Value>> for RawOptions {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            serializer: None,
        }
    }
}

impl TryFrom<Value> for RawOptions {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RawOptions {
    /// Sets an arbitrary field.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets the WebSocket URL. Overrides any discrete parts.
    #[inline]
    #[must_use]
    pub fn url(self, url: impl Into<String>) -> Self {
        self.with("url", url.into())
    }

    /// Sets the host.
    #[inline]
    #[must_use]
    pub fn host(self, host: impl Into<String>) -> Self {
        self.with("host", host.into())
    }

    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn port(self, port: u16) -> Self {
        self.with("port", port)
    }

    /// Selects `wss` (true) or `ws` (false).
    #[inline]
    #[must_use]
    pub fn ssl(self, ssl: bool) -> Self {
        self.with("ssl", ssl)
    }

    /// Sets the URL path.
    #[inline]
    #[must_use]
    pub fn path(self, path: impl Into<String>) -> Self {
        self.with("path", path.into())
    }

    /// Sets the binary type.
    #[inline]
    #[must_use]
    pub fn binary_type(self, binary_type: BinaryType) -> Self {
        self.with("binaryType", binary_type.as_str())
    }

    /// Enables connecting on construction.
    #[inline]
    #[must_use]
    pub fn auto_connect(self, enabled: bool) -> Self {
        self.with("autoConnect", enabled)
    }

    /// Enables reconnecting after close.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(self, enabled: bool) -> Self {
        self.with("autoReconnect", enabled)
    }

    /// Sets the connect timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn connect_timeout(self, ms: u64) -> Self {
        self.with("connectTimeout", ms)
    }

    /// Sets the message timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn message_timeout(self, ms: u64) -> Self {
        self.with("messageTimeout", ms)
    }

    /// Sets the auto-reconnect delay in milliseconds.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(self, ms: u64) -> Self {
        self.with("reconnectInterval", ms)
    }

    /// Sets when auto-reconnect applies.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(self, policy: ReconnectPolicy) -> Self {
        self.with("reconnectPolicy", policy.as_str())
    }

    /// Sets the requested subprotocols.
    #[inline]
    #[must_use]
    pub fn protocol(self, protocols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let list: Vec<Value> = protocols
            .into_iter()
            .map(|p| Value::String(p.into()))
            .collect();
        self.with("protocol", list)
    }

    /// Enables or disables event emission.
    #[inline]
    #[must_use]
    pub fn trigger(self, enabled: bool) -> Self {
        self.with("trigger", enabled)
    }

    /// Sets a custom serializer.
    #[inline]
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RawOptions {
    /// Returns a field, treating `null` as absent.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Returns `true` if the field is present and not `null`.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns all raw fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

// ============================================================================
// Typed Readers
// ============================================================================

impl RawOptions {
    pub(crate) fn read_bool(&self, field: &str, default: bool) -> Result<bool> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(Error::config(field, EXPECTED_BOOL)),
        }
    }

    pub(crate) fn read_string(&self, field: &str) -> Result<Option<&str>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(Error::config(field, EXPECTED_STRING)),
        }
    }

    pub(crate) fn read_port(&self, field: &str) -> Result<Option<u16>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => integer(value)
                .and_then(|n| u16::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| Error::config(field, EXPECTED_PORT)),
        }
    }

    pub(crate) fn require_port(&self, field: &str) -> Result<u16> {
        self.read_port(field)?
            .ok_or_else(|| Error::config(field, EXPECTED_PORT))
    }

    pub(crate) fn read_duration_ms(&self, field: &str, default: u64) -> Result<u64> {
        match self.get(field) {
            None => Ok(default),
            Some(value) => integer(value)
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| Error::config(field, EXPECTED_DURATION)),
        }
    }

    pub(crate) fn read_binary_type(&self, default: BinaryType) -> Result<BinaryType> {
        match self.get("binaryType") {
            None => Ok(default),
            Some(Value::String(s)) => {
                BinaryType::parse(s).ok_or_else(|| Error::config("binaryType", EXPECTED_BINARY_TYPE))
            }
            Some(_) => Err(Error::config("binaryType", EXPECTED_BINARY_TYPE)),
        }
    }

    pub(crate) fn read_reconnect_policy(&self, default: ReconnectPolicy) -> Result<ReconnectPolicy> {
        match self.get("reconnectPolicy") {
            None => Ok(default),
            Some(Value::String(s)) => ReconnectPolicy::parse(s)
                .ok_or_else(|| Error::config("reconnectPolicy", EXPECTED_POLICY)),
            Some(_) => Err(Error::config("reconnectPolicy", EXPECTED_POLICY)),
        }
    }

    /// Reads `protocol`; an empty string means no subprotocols.
    pub(crate) fn read_protocols(&self) -> Result<Option<Vec<String>>> {
        match self.get("protocol") {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(Some(Vec::new())),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(Error::config("protocol", EXPECTED_PROTOCOL)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(Error::config("protocol", EXPECTED_PROTOCOL)),
        }
    }

    pub(crate) fn read_serializer(&self) -> Result<Arc<dyn Serializer>> {
        if self.contains("serializer") {
            return Err(Error::config("serializer", EXPECTED_SERIALIZER));
        }

        Ok(self
            .serializer
            .clone()
            .unwrap_or_else(JsonSerializer::shared))
    }

    /// Reads and validates `url`, which must use the `ws` or `wss` scheme.
    pub(crate) fn read_url(&self) -> Result<Option<Url>> {
        let Some(text) = self.read_string("url")? else {
            return Ok(None);
        };

        let url = Url::parse(text)
            .map_err(|e| Error::config("url", format!("is not a valid URL: {e}")))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config("url", EXPECTED_WS_URL));
        }

        Ok(Some(url))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns the value as an integer, accepting whole floats.
fn integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };

    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT)
            .map(|f| f as i64)
    })
}

// ============================================================================
// Tests
// ============================================================================
