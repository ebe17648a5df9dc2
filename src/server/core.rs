//! Server controller.
//!
//! A [`Server`] binds a TCP listener, upgrades each inbound stream to a
//! WebSocket and publishes it as a `socket:connection` event.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start──► Starting ──bound──► Listening ──shutdown──► Stopped
//!                        │
//!                        └──bind error──► Stopped
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::options::{RawOptions, ServerOptions};
use crate::protocol::{EventSink, SocketEvent};

use super::session::{ServerSession, SessionId, SessionIdGenerator};

// ============================================================================
// ServerState
// ============================================================================

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServerState {
    /// Not listening.
    #[default]
    Stopped,
    /// Binding the listener.
    Starting,
    /// Accepting connections.
    Listening,
}

// ============================================================================
// Server
// ============================================================================

/// WebSocket server controller.
pub struct Server {
    sink: Arc<dyn EventSink>,
    ws_config: Option<WebSocketConfig>,
    ids: Arc<SessionIdGenerator>,
    inner: Mutex<ServerInner>,
}

#[derive(Default)]
struct ServerInner {
    options: Option<Arc<ServerOptions>>,
    phase: ServerState,
    running: Option<Running>,
}

/// A live accept loop.
struct Running {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Returns a server left in `Starting` to `Stopped` when a start does not
/// complete, including when the `start` future is dropped mid-bind.
struct StartGuard<'a> {
    inner: &'a Mutex<ServerInner>,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.phase == ServerState::Starting {
            inner.phase = ServerState::Stopped;
        }
    }
}

/// What the accept loop needs per connection.
#[derive(Clone)]
struct AcceptContext {
    sink: Arc<dyn EventSink>,
    ids: Arc<SessionIdGenerator>,
    options: Arc<ServerOptions>,
    ws_config: Option<WebSocketConfig>,
}

// ============================================================================
// Server - Public API
// ============================================================================

impl Server {
    /// Creates a stopped server.
    ///
    /// # Arguments
    ///
    /// * `sink` - Receives `socket:connection` and `socket:listening`
    /// * `options` - Initial server options, validated now
    /// * `ws_config` - tungstenite options for every accepted connection
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` is invalid.
    pub fn new(
        sink: Arc<dyn EventSink>,
        options: Option<&RawOptions>,
        ws_config: Option<WebSocketConfig>,
    ) -> Result<Self> {
        let options = options
            .map(ServerOptions::normalize)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            sink,
            ws_config,
            ids: Arc::new(SessionIdGenerator::new()),
            inner: Mutex::new(ServerInner {
                options,
                ..ServerInner::default()
            }),
        })
    }

    /// Starts listening with the current options.
    ///
    /// # Errors
    ///
    /// See [`Server::start_with`].
    pub async fn start(&self) -> Result<SocketAddr> {
        self.start_with(None).await
    }

    /// Starts listening, optionally replacing the options first. Returns the
    /// bound address.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if starting or listening
    /// - [`Error::Config`] if replacement options are invalid
    /// - [`Error::MissingOptions`] if no options were ever provided
    /// - [`Error::Io`] if binding fails
    pub async fn start_with(&self, options: Option<&RawOptions>) -> Result<SocketAddr> {
        let options = self.begin_start(options)?;
        let _guard = StartGuard { inner: &self.inner };

        let listener = match bind(&options).await {
            Ok(bound) => bound,
            Err(err) => {
                warn!(host = options.host(), port = options.port(), error = %err, "Bind failed");
                return Err(err);
            }
        };
        let (listener, local_addr) = listener;

        let context = AcceptContext {
            sink: Arc::clone(&self.sink),
            ids: Arc::clone(&self.ids),
            options: Arc::clone(&options),
            ws_config: self.ws_config.clone(),
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, shutdown_rx, context));

        {
            let mut inner = self.inner.lock();
            inner.phase = ServerState::Listening;
            inner.running = Some(Running {
                local_addr,
                shutdown_tx,
                task,
            });
        }

        info!(%local_addr, "Server listening");
        if options.trigger_events() {
            self.sink.trigger(SocketEvent::Listening { local_addr });
        }

        Ok(local_addr)
    }

    /// Stops accepting connections. Resolves immediately if not listening.
    ///
    /// Already published sessions are owned by their receivers and stay open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the accept loop panicked.
    pub async fn shutdown(&self) -> Result<()> {
        let running = {
            let mut inner = self.inner.lock();
            let running = inner.running.take();
            if running.is_some() {
                inner.phase = ServerState::Stopped;
            }
            running
        };

        let Some(running) = running else {
            trace!("Shutdown without listener");
            return Ok(());
        };

        let _ = running.shutdown_tx.send(());
        running
            .task
            .await
            .map_err(|e| Error::shutdown(e.to_string()))?;

        info!(local_addr = %running.local_addr, "Server stopped");
        Ok(())
    }

    /// Replaces the options. Takes effect on the next start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `raw` is invalid.
    pub fn set_options(&self, raw: &RawOptions) -> Result<()> {
        let options = ServerOptions::normalize(raw)?;
        self.inner.lock().options = Some(Arc::new(options));
        Ok(())
    }

    /// Returns the next session id from this server's generator.
    #[inline]
    pub fn next_id(&self) -> SessionId {
        self.ids.next_id()
    }

    /// Returns this server's id generator.
    #[inline]
    #[must_use]
    pub fn id_generator(&self) -> &Arc<SessionIdGenerator> {
        &self.ids
    }

    /// Returns the current options.
    #[must_use]
    pub fn options(&self) -> Option<Arc<ServerOptions>> {
        self.inner.lock().options.clone()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.inner.lock().phase
    }

    /// Returns `true` while listening.
    #[must_use]
    pub fn listening(&self) -> bool {
        self.state() == ServerState::Listening
    }

    /// Returns the bound address while listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().running.as_ref().map(|r| r.local_addr)
    }
}

// ============================================================================
// Server - Internal
// ============================================================================

impl Server {
    /// Checks state and resolves options, moving to `Starting`.
    fn begin_start(&self, overrides: Option<&RawOptions>) -> Result<Arc<ServerOptions>> {
        let mut inner = self.inner.lock();
        if inner.phase != ServerState::Stopped {
            return Err(Error::AlreadyStarted);
        }

        let options = match overrides {
            Some(raw) => Arc::new(ServerOptions::normalize(raw)?),
            None => inner
                .options
                .clone()
                .ok_or_else(|| Error::missing_options("server"))?,
        };

        inner.options = Some(Arc::clone(&options));
        inner.phase = ServerState::Starting;
        Ok(options)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.inner.get_mut().running.take() {
            let _ = running.shutdown_tx.send(());
        }
    }
}

// ============================================================================
// Accept Loop
// ============================================================================

async fn bind(options: &ServerOptions) -> Result<(TcpListener, SocketAddr)> {
    if options.ssl() {
        warn!("ssl is set but TLS is not terminated here, serving plain ws");
    }

    let listener = TcpListener::bind((options.host(), options.port())).await?;
    let local_addr = listener.local_addr()?;
    debug!(%local_addr, "Server bound");
    Ok((listener, local_addr))
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown_rx: oneshot::Receiver<()>,
    context: AcceptContext,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Accept loop stopping");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    trace!(%peer_addr, "TCP connection accepted");
                    tokio::spawn(upgrade(stream, peer_addr, context.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                }
            },
        }
    }
}

/// Completes the WebSocket handshake and publishes the session.
async fn upgrade(stream: TcpStream, peer_addr: SocketAddr, context: AcceptContext) {
    let handshake = tokio_tungstenite::accept_hdr_async_with_config(
        stream,
        select_protocol,
        context.ws_config,
    );
    let stream = match handshake.await {
        Ok(stream) => stream,
        Err(e) => {
            debug!(%peer_addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let id = context.ids.next_id();
    debug!(%id, %peer_addr, "Connection established");

    if context.options.trigger_events() {
        context
            .sink
            .trigger(SocketEvent::Connection(ServerSession::new(id, peer_addr, stream)));
    } else {
        trace!(%id, "Events disabled, connection dropped");
    }
}

/// Accepts the first subprotocol the client offers.
fn select_protocol(
    request: &Request,
    mut response: Response,
) -> StdResult<Response, ErrorResponse> {
    let first = request
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').map(str::trim).find(|p| !p.is_empty()))
        .and_then(|p| HeaderValue::from_str(p).ok());

    if let Some(protocol) = first {
        trace!(protocol = ?protocol, "Subprotocol selected");
        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);
    }
    Ok(response)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::NullSink;

    fn server(options: Option<RawOptions>) -> Server {
        Server::new(Arc::new(NullSink), options.as_ref(), None).expect("server")
    }

    #[test]
    fn test_new_is_stopped() {
        let server = server(None);
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(!server.listening());
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn test_new_requires_port() {
        let err = Server::new(Arc::new(NullSink), Some(&RawOptions::new()), None).unwrap_err();
        assert_eq!(err.config_field(), Some("port"));
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let server = server(None);
        assert_eq!(server.next_id().get(), 0);
        assert_eq!(server.next_id().get(), 1);
        assert_eq!(server.id_generator().next_id().get(), 2);
    }

    #[tokio::test]
    async fn test_start_without_options_fails() {
        let err = server(None).start().await.unwrap_err();
        assert!(matches!(err, Error::MissingOptions { component: "server" }));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let server = server(Some(RawOptions::new().host("127.0.0.1").port(0)));

        let addr = server.start().await.expect("start");
        assert!(addr.port() > 0);
        assert!(server.listening());
        assert_eq!(server.local_addr(), Some(addr));

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyStarted));

        server.shutdown().await.expect("shutdown");
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_when_stopped_is_noop() {
        server(None).shutdown().await.expect("no-op");
    }

    #[tokio::test]
    async fn test_abandoned_start_returns_to_stopped() {
        let server = server(Some(RawOptions::new().host("127.0.0.1").port(0)));

        let _options = server.begin_start(None).expect("begin");
        let guard = StartGuard { inner: &server.inner };
        assert_eq!(server.state(), ServerState::Starting);

        drop(guard);
        assert_eq!(server.state(), ServerState::Stopped);

        server.start().await.expect("start after abandoned start");
        assert!(server.listening());
        server.shutdown().await.expect("shutdown");
    }

    #[test]
    fn test_select_protocol_echoes_first_offer() {
        let request = Request::builder()
            .header(SEC_WEBSOCKET_PROTOCOL, "chat, superchat")
            .body(())
            .expect("request");
        let response = select_protocol(&request, Response::default()).expect("response");
        assert_eq!(
            response.headers().get(SEC_WEBSOCKET_PROTOCOL).and_then(|v| v.to_str().ok()),
            Some("chat")
        );

        let bare = Request::builder().body(()).expect("request");
        let response = select_protocol(&bare, Response::default()).expect("response");
        assert!(response.headers().get(SEC_WEBSOCKET_PROTOCOL).is_none());
    }

    #[tokio::test]
    async fn test_bind_conflict_returns_to_stopped() {
        let first = server(Some(RawOptions::new().host("127.0.0.1").port(0)));
        let addr = first.start().await.expect("start");

        let second = server(Some(RawOptions::new().host("127.0.0.1").port(addr.port())));
        let err = second.start().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(second.state(), ServerState::Stopped);

        first.shutdown().await.expect("shutdown");
    }
}
