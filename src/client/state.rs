//! Client lifecycle states and call parameters.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::task::JoinHandle;

use crate::options::RawOptions;

// ============================================================================
// Constants
// ============================================================================

/// Close code used by `reconnect` when none is given.
pub const DEFAULT_RECONNECT_CODE: u16 = 1000;

/// Close reason used by `reconnect` when none is given.
pub const DEFAULT_RECONNECT_REASON: &str = "reconnecting";

// ============================================================================
// ConnectionState
// ============================================================================

/// Controller lifecycle state.
///
/// ```text
/// Idle ──► Connecting ──► Open ──► Closing ──► Closed
///              ▲                                  │
///              └──────── connect / auto ──────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Transport created, waiting for open.
    Connecting,
    /// Transport open.
    Open,
    /// Disconnect requested, waiting for close.
    Closing,
    /// Transport closed and released.
    Closed,
}

impl ConnectionState {
    /// Returns a lowercase name for logging.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectParams
// ============================================================================

/// Arguments for [`Client::connect_with`](super::Client::connect_with).
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    /// Replacement options, normalized before connecting.
    pub options: Option<RawOptions>,
    /// Connect timeout; defaults to the options' `connectTimeout`.
    pub timeout_ms: Option<i64>,
}

impl ConnectParams {
    /// Creates empty parameters.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the options before connecting.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RawOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Overrides the connect timeout.
    #[inline]
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

// ============================================================================
// ReconnectParams
// ============================================================================

/// Arguments for [`Client::reconnect_with`](super::Client::reconnect_with).
#[derive(Debug, Clone)]
pub struct ReconnectParams {
    /// Replacement options, applied before disconnecting.
    pub options: Option<RawOptions>,
    /// Close code for the disconnect.
    pub code: u16,
    /// Close reason for the disconnect.
    pub reason: String,
    /// Connect timeout; defaults to the options' `connectTimeout`.
    pub timeout_ms: Option<i64>,
}

impl Default for ReconnectParams {
    fn default() -> Self {
        Self {
            options: None,
            code: DEFAULT_RECONNECT_CODE,
            reason: DEFAULT_RECONNECT_REASON.to_string(),
            timeout_ms: None,
        }
    }
}

impl ReconnectParams {
    /// Creates default parameters (code 1000, reason "reconnecting").
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the options before reconnecting.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RawOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the close code and reason.
    #[inline]
    #[must_use]
    pub fn close(mut self, code: u16, reason: impl Into<String>) -> Self {
        self.code = code;
        self.reason = reason.into();
        self
    }

    /// Overrides the connect timeout.
    #[inline]
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

// ============================================================================
// ReconnectHandle
// ============================================================================

/// Cancellable auto-reconnect timer.
#[derive(Debug)]
pub(crate) struct ReconnectHandle {
    /// Distinguishes this timer from later ones.
    pub(crate) id: u64,
    task: JoinHandle<()>,
}

impl ReconnectHandle {
    pub(crate) fn new(id: u64, task: JoinHandle<()>) -> Self {
        Self { id, task }
    }

    /// Aborts the timer if it has not fired yet.
    pub(crate) fn cancel(&self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
        assert_eq!(ConnectionState::Closing.to_string(), "closing");
    }

    #[test]
    fn test_reconnect_defaults() {
        let params = ReconnectParams::new();
        assert_eq!(params.code, 1000);
        assert_eq!(params.reason, "reconnecting");
        assert!(params.options.is_none());
        assert!(params.timeout_ms.is_none());
    }

    #[test]
    fn test_connect_params_builder() {
        let params = ConnectParams::new()
            .options(RawOptions::new().port(1))
            .timeout_ms(50);
        assert!(params.options.is_some());
        assert_eq!(params.timeout_ms, Some(50));
    }

    #[tokio::test]
    async fn test_cancel_aborts_timer() {
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        let handle = ReconnectHandle::new(1, task);
        assert_eq!(handle.id, 1);
        handle.cancel();

        let err = handle.task.await.expect_err("timer was aborted");
        assert!(err.is_cancelled());
    }
}
