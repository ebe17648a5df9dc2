//! Payload and frame types.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::Serializer;

// ============================================================================
// Frame
// ============================================================================

/// A wire-ready message handed to or received from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
}

impl Frame {
    /// Returns the size of the frame body in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Returns `true` if the frame body is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Application data exchanged through a controller.
///
/// Structured values go through the configured serializer; text and binary
/// payloads pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured value, serialized before transmission.
    Value(Value),
    /// Raw text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Payload {
    /// Converts the payload into a frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error for structured payloads it cannot encode.
    pub fn encode(&self, serializer: &dyn Serializer) -> Result<Frame> {
        match self {
            Self::Value(value) => serializer.stringify(value).map(Frame::Text),
            Self::Text(text) => Ok(Frame::Text(text.clone())),
            Self::Binary(bytes) => Ok(Frame::Binary(bytes.clone())),
        }
    }

    /// Converts an inbound frame into a payload.
    ///
    /// Text frames are parsed with `serializer`; when parsing fails the raw
    /// text is kept. Binary frames are never parsed.
    #[must_use]
    pub fn decode(frame: Frame, serializer: &dyn Serializer) -> Self {
        match frame {
            Frame::Text(text) => match serializer.parse(&text) {
                Ok(value) => Self::Value(value),
                Err(e) => {
                    debug!(error = %e, "Inbound text not parseable, passing through raw");
                    Self::Text(text)
                }
            },
            Frame::Binary(bytes) => Self::Binary(bytes),
        }
    }

    /// Returns the structured value, if any.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::error::Error;
    use crate::protocol::JsonSerializer;

    #[test]
    fn test_encode_value_uses_serializer() {
        let frame = Payload::from(json!({ "a": 1 }))
            .encode(&JsonSerializer)
            .expect("encode");
        assert_eq!(frame, Frame::Text(r#"{"a":1}"#.to_string()));
    }

    #[test]
    fn test_encode_text_passes_through() {
        let frame = Payload::from("{not json").encode(&JsonSerializer).expect("encode");
        assert_eq!(frame, Frame::Text("{not json".to_string()));
    }

    #[test]
    fn test_encode_binary_passes_through() {
        let frame = Payload::from(vec![1u8, 2, 3])
            .encode(&JsonSerializer)
            .expect("encode");
        assert_eq!(frame, Frame::Binary(vec![1, 2, 3]));
        assert_eq!(frame.len(), 3);
    }

    /// Codec that only accepts objects.
    #[derive(Debug)]
    struct ObjectsOnly;

    impl Serializer for ObjectsOnly {
        fn parse(&self, text: &str) -> Result<Value> {
            JsonSerializer.parse(text)
        }

        fn stringify(&self, value: &Value) -> Result<String> {
            if value.is_object() {
                JsonSerializer.stringify(value)
            } else {
                Err(Error::serialization("only objects are supported"))
            }
        }
    }

    #[test]
    fn test_encode_surfaces_serializer_error() {
        let err = Payload::from(json!([1, 2])).encode(&ObjectsOnly).unwrap_err();
        assert!(matches!(err, Error::Serialization { ref message } if message.contains("objects")));
    }

    #[test]
    fn test_decode_parses_text() {
        let payload = Payload::decode(Frame::Text(r#"{"b":true}"#.into()), &JsonSerializer);
        assert_eq!(payload.as_value(), Some(&json!({ "b": true })));
    }

    #[test]
    fn test_decode_falls_back_to_raw_text() {
        let payload = Payload::decode(Frame::Text("hello".into()), &JsonSerializer);
        assert_eq!(payload, Payload::Text("hello".into()));
    }

    #[test]
    fn test_decode_binary_untouched() {
        let payload = Payload::decode(Frame::Binary(b"{}".to_vec()), &JsonSerializer);
        assert_eq!(payload, Payload::Binary(b"{}".to_vec()));
    }
}
