//! Pluggable payload codec.
//!
//! The serializer turns structured payloads into text frames and parses
//! inbound text frames back. [`JsonSerializer`] is the default.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Serializer
// ============================================================================

/// Text codec for structured payloads.
///
/// Implementations must be cheap to share; controllers hold them as
/// `Arc<dyn Serializer>` inside their canonical options.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Parses a text frame into a structured value.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid for this codec.
    fn parse(&self, text: &str) -> Result<Value>;

    /// Encodes a structured value as text.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented by this codec.
    fn stringify(&self, value: &Value) -> Result<String>;
}

// ============================================================================
// JsonSerializer
// ============================================================================

/// JSON codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Returns the shared default serializer.
    #[inline]
    #[must_use]
    pub fn shared() -> Arc<dyn Serializer> {
        Arc::new(Self)
    }
}

impl Serializer for JsonSerializer {
    fn parse(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(|e| Error::serialization(e.to_string()))
    }

    fn stringify(&self, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(|e| Error::serialization(e.to_string()))
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
    fn test_json_stringify_object() {
        let text = JsonSerializer.stringify(&json!({ "a": 1 })).expect("stringify");
        assert_eq!(text, r#"{"a":1}"#);
    }

    #[test]
    fn test_json_parse_object() {
        let value = JsonSerializer.parse(r#"{"a":[1,2]}"#).expect("parse");
        assert_eq!(value, json!({ "a": [1, 2] }));
    }

    #[test]
    fn test_json_parse_invalid() {
        let err = JsonSerializer.parse("not json").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
