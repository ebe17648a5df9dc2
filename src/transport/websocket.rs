//! tokio-tungstenite transport.
//!
//! # Event Loop
//!
//! Each transport spawns a tokio task that handles:
//!
//! - The client handshake (abortable by `close`)
//! - Incoming frames from the peer
//! - Outgoing frames and close requests from the controller
//! - Byte accounting for `bufferedAmount`
//!
//! The task reports everything through the event channel and always ends
//! with exactly one `Close` event.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::options::BinaryType;
use crate::protocol::Frame;

use super::{Connector, EventReceiver, ReadyState, Transport, TransportEvent, TransportRequest};

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the peer's close reply after initiating close.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code reported when the connection dropped without a close frame.
const CODE_ABNORMAL: u16 = 1006;

/// Close code reported when the peer's close frame carried no code.
const CODE_NO_STATUS: u16 = 1005;

// ============================================================================
// Types
// ============================================================================

type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Internal commands for the event loop.
enum TransportCommand {
    /// Write a frame.
    Send(Frame),
    /// Start the close handshake.
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// State shared between the handle and its event loop.
#[derive(Debug)]
struct TransportShared {
    ready_state: AtomicU8,
    buffered: AtomicUsize,
    protocol: Mutex<String>,
    extensions: Mutex<String>,
}

impl TransportShared {
    fn set_state(&self, state: ReadyState) {
        self.ready_state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready_state.load(Ordering::SeqCst))
    }

    fn record_handshake(&self, response: &Response) {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        *self.protocol.lock() = header("sec-websocket-protocol");
        *self.extensions.lock() = header("sec-websocket-extensions");
    }
}

// ============================================================================
// WsConnector
// ============================================================================

/// Connector producing [`WsTransport`]s.
///
/// Supports `ws://` URLs. `wss://` requires a TLS-enabled build of
/// tokio-tungstenite; without it the attempt fails with a transport error.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, request: TransportRequest) -> (Arc<dyn Transport>, EventReceiver) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(TransportShared {
            ready_state: AtomicU8::new(ReadyState::Connecting.as_u8()),
            buffered: AtomicUsize::new(0),
            protocol: Mutex::new(String::new()),
            extensions: Mutex::new(String::new()),
        });

        let transport = Arc::new(WsTransport {
            url: request.url.clone(),
            binary_type: request.binary_type,
            command_tx,
            shared: Arc::clone(&shared),
        });

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run_event_loop(request, command_rx, event_tx, shared));
            }
            Err(_) => fail(&event_tx, &shared, "no tokio runtime available"),
        }

        (transport, event_rx)
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// Handle to one tokio-tungstenite connection.
///
/// Dropping the last handle closes the connection.
pub struct WsTransport {
    url: String,
    binary_type: BinaryType,
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    shared: Arc<TransportShared>,
}

impl Transport for WsTransport {
    #[inline]
    fn url(&self) -> &str {
        &self.url
    }

    fn protocol(&self) -> String {
        self.shared.protocol.lock().clone()
    }

    fn extensions(&self) -> String {
        self.shared.extensions.lock().clone()
    }

    #[inline]
    fn ready_state(&self) -> ReadyState {
        self.shared.state()
    }

    #[inline]
    fn buffered_amount(&self) -> usize {
        self.shared.buffered.load(Ordering::SeqCst)
    }

    #[inline]
    fn binary_type(&self) -> BinaryType {
        self.binary_type
    }

    fn send(&self, frame: Frame) -> Result<()> {
        if self.shared.state() != ReadyState::Open {
            return Err(Error::transport("send on a transport that is not open"));
        }

        let len = frame.len();
        self.shared.buffered.fetch_add(len, Ordering::SeqCst);

        if self.command_tx.send(TransportCommand::Send(frame)).is_err() {
            self.shared.buffered.fetch_sub(len, Ordering::SeqCst);
            return Err(Error::ConnectionClosed);
        }

        Ok(())
    }

    fn close(&self, code: Option<u16>, reason: Option<&str>) {
        let _ = self.command_tx.send(TransportCommand::Close {
            code,
            reason: reason.map(str::to_string),
        });
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Reports a failed attempt: error, then close.
fn fail(events: &EventSender, shared: &TransportShared, message: impl Into<String>) {
    let message = message.into();
    debug!(error = %message, "WebSocket transport failed");

    shared.set_state(ReadyState::Closed);
    let _ = events.send(TransportEvent::Error(message));
    let _ = events.send(TransportEvent::Close {
        code: Some(CODE_ABNORMAL),
        reason: String::new(),
    });
}

fn build_request(request: &TransportRequest) -> Result<Request> {
    let mut ws_request = request.url.as_str().into_client_request()?;

    if !request.protocols.is_empty() {
        let value = HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| Error::transport(format!("invalid subprotocol header: {e}")))?;
        ws_request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", value);
    }

    Ok(ws_request)
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
    }
}

fn close_message(code: Option<u16>, reason: Option<String>) -> Message {
    Message::Close(code.map(|code| CloseFrame {
        code: CloseCode::from(code),
        reason: reason.unwrap_or_default().into(),
    }))
}

/// Event loop that owns the WebSocket for its whole life.
async fn run_event_loop(
    request: TransportRequest,
    mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
    events: EventSender,
    shared: Arc<TransportShared>,
) {
    let ws_request = match build_request(&request) {
        Ok(r) => r,
        Err(e) => return fail(&events, &shared, e.to_string()),
    };

    // Handshake, abortable by close.
    let connecting = connect_async_with_config(ws_request, request.config, false);
    tokio::pin!(connecting);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok((stream, response)) => {
                    shared.record_handshake(&response);
                    break stream;
                }
                Err(e) => return fail(&events, &shared, e.to_string()),
            },

            command = command_rx.recv() => match command {
                Some(TransportCommand::Send(frame)) => {
                    shared.buffered.fetch_sub(frame.len(), Ordering::SeqCst);
                    warn!("Frame sent before open, dropped");
                }
                Some(TransportCommand::Close { .. }) | None => {
                    debug!(url = %request.url, "Closed before open");
                    shared.set_state(ReadyState::Closed);
                    let _ = events.send(TransportEvent::Close {
                        code: Some(CODE_ABNORMAL),
                        reason: String::new(),
                    });
                    return;
                }
            },
        }
    };

    shared.set_state(ReadyState::Open);
    debug!(url = %request.url, "WebSocket transport open");
    let _ = events.send(TransportEvent::Open);

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut close_deadline: Option<Instant> = None;

    let (code, reason) = loop {
        tokio::select! {
            // Incoming frames from the peer
            message = ws_read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(Frame::Text(text.to_string())));
                }

                Some(Ok(Message::Binary(bytes))) => {
                    let _ = events.send(TransportEvent::Message(Frame::Binary(bytes.to_vec())));
                }

                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket close frame received");
                    break match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (Some(CODE_NO_STATUS), String::new()),
                    };
                }

                // Ping/Pong are answered by tungstenite
                Some(Ok(_)) => {}

                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break (Some(CODE_ABNORMAL), String::new());
                }

                None => {
                    debug!("WebSocket stream ended");
                    break (Some(CODE_ABNORMAL), String::new());
                }
            },

            // Commands from the handle
            command = command_rx.recv() => match command {
                Some(TransportCommand::Send(frame)) => {
                    let len = frame.len();
                    let result = ws_write.send(to_message(frame)).await;
                    shared.buffered.fetch_sub(len, Ordering::SeqCst);

                    if let Err(e) = result {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                    } else {
                        trace!(len, "Frame written");
                    }
                }

                Some(TransportCommand::Close { code, reason }) => {
                    if close_deadline.is_none() {
                        shared.set_state(ReadyState::Closing);
                        close_deadline = Some(Instant::now() + CLOSE_HANDSHAKE_TIMEOUT);
                        if let Err(e) = ws_write.send(close_message(code, reason)).await {
                            debug!(error = %e, "Close frame not sent");
                        }
                    }
                }

                None => {
                    debug!("Transport handle dropped");
                    let _ = ws_write.close().await;
                    break (Some(CODE_ABNORMAL), String::new());
                }
            },

            _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                debug!("Close handshake timed out");
                break (Some(CODE_ABNORMAL), String::new());
            }
        }
    };

    // Pushes out a queued close reply, if any.
    let _ = ws_write.flush().await;

    shared.set_state(ReadyState::Closed);
    let _ = events.send(TransportEvent::Close { code, reason });

    debug!(url = %request.url, "WebSocket transport closed");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> TransportRequest {
        TransportRequest {
            url: url.to_string(),
            protocols: Vec::new(),
            binary_type: BinaryType::Blob,
            config: None,
        }
    }

    #[test]
    fn test_build_request_sets_protocol_header() {
        let mut req = request("ws://localhost:8001/");
        req.protocols = vec!["chat".into(), "superchat".into()];

        let ws_request = build_request(&req).expect("request");
        assert_eq!(
            ws_request.headers().get("Sec-WebSocket-Protocol").unwrap(),
            "chat, superchat"
        );
    }

    #[test]
    fn test_close_message_without_code() {
        assert_eq!(close_message(None, None), Message::Close(None));
    }

    #[test]
    fn test_close_message_with_code() {
        match close_message(Some(1000), Some("bye".into())) {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1000);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_reports_error_then_close() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let (transport, mut events) = WsConnector.open(request(&format!("ws://127.0.0.1:{port}/")));
        assert_eq!(transport.ready_state(), ReadyState::Connecting);
        assert!(transport.send(Frame::Text("early".into())).is_err());

        assert!(matches!(events.recv().await, Some(TransportEvent::Error(_))));
        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::Close { .. })
        ));
        assert_eq!(transport.ready_state(), ReadyState::Closed);
    }
}
