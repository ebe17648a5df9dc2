//! Option normalization.
//!
//! Every controller works from an immutable, fully validated canonical
//! record. Normalizers never mutate caller input; reconfiguration always
//! produces a fresh record through full validation.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawOptions`] | Unvalidated, JSON-shaped input |
//! | [`ClientOptions`] | Canonical client record (URL or discrete parts) |
//! | [`ServerOptions`] | Canonical server record |
//! | [`SocketOptions`] | Canonical generic socket record |
//!
//! # Defaults
//!
//! | Option | Default |
//! |--------|---------|
//! | `host` | `localhost` |
//! | `ssl` | `false` |
//! | `binaryType` | `blob` |
//! | `autoConnect` / `autoReconnect` | `false` |
//! | `connectTimeout` | 5000 ms |
//! | `messageTimeout` | 10000 ms |
//! | `reconnectInterval` | 2000 ms (client), 10000 ms (socket) |
//! | `trigger` | `true` |
//! | `protocol` | none |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Submodules
// ============================================================================

/// Canonical client options.
pub mod client;

/// Raw option input.
pub mod raw;

/// Canonical server options.
pub mod server;

/// Canonical generic socket options.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::ClientOptions;
pub use raw::RawOptions;
pub use server::ServerOptions;
pub use socket::SocketOptions;

// ============================================================================
// Shared Defaults
// ============================================================================

pub(crate) const DEFAULT_HOST: &str = "localhost";
pub(crate) const DEFAULT_SSL: bool = false;
pub(crate) const DEFAULT_AUTO_CONNECT: bool = false;
pub(crate) const DEFAULT_AUTO_RECONNECT: bool = false;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub(crate) const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_TRIGGER: bool = true;

// ============================================================================
// BinaryType
// ============================================================================

/// How a browser-style transport exposes binary messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryType {
    /// Opaque blob.
    #[default]
    Blob,
    /// Raw buffer.
    ArrayBuffer,
}

impl BinaryType {
    /// Returns the option-string form.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::ArrayBuffer => "arraybuffer",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(Self::Blob),
            "arraybuffer" => Some(Self::ArrayBuffer),
            _ => None,
        }
    }
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Which closes schedule an auto-reconnect when `autoReconnect` is on.
///
/// A close caused by a manual disconnect never reconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconnectPolicy {
    /// Every close, including attempts that never opened or timed out.
    #[default]
    Always,
    /// Only closes that follow a successful open.
    AfterOpen,
}

impl ReconnectPolicy {
    /// Returns the option-string form.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::AfterOpen => "afterOpen",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "afterOpen" => Some(Self::AfterOpen),
            _ => None,
        }
    }

    /// Returns `true` if a close should schedule a reconnect.
    #[inline]
    #[must_use]
    pub const fn applies(self, was_open: bool) -> bool {
        match self {
            Self::Always => true,
            Self::AfterOpen => was_open,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_type_round_trip() {
        for ty in [BinaryType::Blob, BinaryType::ArrayBuffer] {
            assert_eq!(BinaryType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(BinaryType::parse("buffer"), None);
    }

    #[test]
    fn test_reconnect_policy_applies() {
        assert!(ReconnectPolicy::Always.applies(false));
        assert!(ReconnectPolicy::Always.applies(true));
        assert!(!ReconnectPolicy::AfterOpen.applies(false));
        assert!(ReconnectPolicy::AfterOpen.applies(true));
    }

    #[test]
    fn test_serialize_forms_match_option_strings() {
        assert_eq!(
            serde_json::to_value(BinaryType::ArrayBuffer).expect("json"),
            serde_json::json!("arraybuffer")
        );
        assert_eq!(
            serde_json::to_value(ReconnectPolicy::AfterOpen).expect("json"),
            serde_json::json!("afterOpen")
        );
    }
}
