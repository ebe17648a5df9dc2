//! Error types for wsbus.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wsbus::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.connect().await?;
//!     client.send(serde_json::json!({ "hello": "world" }));
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Lifecycle | [`Error::AlreadyConnecting`], [`Error::AlreadyStarted`], [`Error::MissingOptions`], [`Error::InvalidTimeout`], [`Error::ConnectCancelled`] |
//! | Transport | [`Error::Transport`], [`Error::ConnectionClosed`], [`Error::Shutdown`] |
//! | Timeout | [`Error::ConnectTimeout`] |
//! | Codec | [`Error::Serialization`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Configuration and lifecycle errors name the offending field or condition.
/// Transport and timeout errors are forwarded opaquely.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid or missing option.
    ///
    /// Returned synchronously by the normalizers. Never retried.
    #[error("Configuration error: '{field}' {expected}")]
    Config {
        /// Name of the offending option.
        field: String,
        /// Description of what the option must be.
        expected: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// `connect` called while a transport already exists.
    #[error("Already connecting: a transport is already associated with this client")]
    AlreadyConnecting,

    /// `start` called while the server is starting or listening.
    #[error("Already started: the server is already listening")]
    AlreadyStarted,

    /// No options were ever supplied to the component.
    #[error("Missing options: '{component}' options have not been set")]
    MissingOptions {
        /// Which options record is missing ("client" or "server").
        component: &'static str,
    },

    /// Connect timeout is not a non-negative integer.
    #[error("Invalid timeout: {value} is not a non-negative integer")]
    InvalidTimeout {
        /// The rejected value.
        value: i64,
    },

    /// Pending connect superseded by `disconnect` before it resolved.
    #[error("Connect cancelled by disconnect")]
    ConnectCancelled,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Error reported by the underlying transport.
    #[error("Transport error: {message}")]
    Transport {
        /// Description reported by the transport.
        message: String,
    },

    /// Transport closed before the pending operation completed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Server shutdown did not complete cleanly.
    #[error("Shutdown failed: {message}")]
    Shutdown {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Timeout Errors
    // ========================================================================
    /// Transport did not open before the connect timeout elapsed.
    #[error("Connect timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Serializer failed to encode or decode a payload.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description from the serializer.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error for `field`.
    #[inline]
    pub fn config(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Creates a missing options error.
    #[inline]
    pub fn missing_options(component: &'static str) -> Self {
        Self::MissingOptions { component }
    }

    /// Creates an invalid timeout error.
    #[inline]
    pub fn invalid_timeout(value: i64) -> Self {
        Self::InvalidTimeout { value }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a shutdown error.
    #[inline]
    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }

    /// Creates a serialization error.
    #[inline]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns the offending field of a configuration error.
    #[inline]
    #[must_use]
    pub fn config_field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns `true` if this is a lifecycle error.
    ///
    /// Lifecycle errors mean the caller must check component state first.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConnecting
                | Self::AlreadyStarted
                | Self::MissingOptions { .. }
                | Self::InvalidTimeout { .. }
                | Self::ConnectCancelled
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::ConnectTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
