//! Client connection controller.
//!
//! A [`Client`] owns at most one transport at a time and walks it through
//! the connect / open / close lifecycle. Every connect attempt gets a fresh
//! generation number; transport events carrying an older generation are
//! ignored, so a late callback from a replaced transport can never disturb
//! the current one.
//!
//! # Lifecycle
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`Client::connect`] | Creates a transport, resolves on open |
//! | [`Client::disconnect`] | Empties the queue, closes, resolves on close |
//! | [`Client::reconnect`] | Disconnect then connect as one unit |
//! | auto-reconnect | Scheduled after an unrequested close |
//!
//! The synchronous part of every lifecycle call (state checks, queue
//! emptying, creating or closing the transport) runs when the method is
//! called. The returned future only waits for the outcome.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::options::{BinaryType, ClientOptions, RawOptions};
use crate::protocol::{EventSink, Frame, Payload, SocketEvent};
use crate::queue::MessageQueue;
use crate::transport::{
    Connector, EventReceiver, ReadyState, Transport, TransportEvent, TransportRequest,
};

use super::builder::ClientBuilder;
use super::state::{ConnectParams, ConnectionState, ReconnectHandle, ReconnectParams};

// ============================================================================
// Types
// ============================================================================

/// Outcome of a lifecycle call.
pub type LifecycleFuture = BoxFuture<'static, Result<()>>;

/// Completion slot for a pending lifecycle call.
type Completion = oneshot::Sender<Result<()>>;

// ============================================================================
// Client
// ============================================================================

/// Client connection controller.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

/// State shared between handles, event pumps and timers.
struct Shared {
    state: Mutex<ClientState>,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn EventSink>,
    ws_config: Option<WebSocketConfig>,
    queue: MessageQueue<Payload>,
}

#[derive(Default)]
struct ClientState {
    options: Option<Arc<ClientOptions>>,
    phase: ConnectionState,
    attempt: Option<Attempt>,
    generation: u64,
    reconnect: Option<ReconnectHandle>,
    reconnect_seq: u64,
}

/// The transport currently attached to the controller.
struct Attempt {
    generation: u64,
    transport: Arc<dyn Transport>,
    /// Options snapshot taken when the attempt started.
    options: Arc<ClientOptions>,
    was_open: bool,
    manual_close: bool,
    pending_connect: Option<Completion>,
    pending_disconnect: Vec<Completion>,
    /// Connect timeout timer, aborted once the attempt settles.
    deadline: Option<AbortHandle>,
}

/// Outcome of a started connect attempt.
type PendingConnect = oneshot::Receiver<Result<()>>;

impl ClientState {
    fn current(&self, generation: u64) -> Option<&Attempt> {
        self.attempt.as_ref().filter(|a| a.generation == generation)
    }

    fn current_mut(&mut self, generation: u64) -> Option<&mut Attempt> {
        self.attempt.as_mut().filter(|a| a.generation == generation)
    }
}

impl Attempt {
    /// Returns the auto-reconnect delay if this attempt's close should
    /// trigger one.
    fn reconnect_delay(&self) -> Option<u64> {
        let options = &self.options;
        let wanted = options.auto_reconnect()
            && !self.manual_close
            && options.reconnect_policy().applies(self.was_open);
        wanted.then(|| options.reconnect_interval_ms())
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a builder for a client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a controller. If the options enable `autoConnect`, a connect
    /// is started on the next scheduler tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` is invalid.
    pub fn new(
        options: Option<&RawOptions>,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn EventSink>,
        ws_config: Option<WebSocketConfig>,
    ) -> Result<Self> {
        let options = options
            .map(ClientOptions::normalize)
            .transpose()?
            .map(Arc::new);
        let auto_connect = options.as_ref().is_some_and(|o| o.auto_connect());

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            Shared {
                state: Mutex::new(ClientState {
                    options,
                    ..ClientState::default()
                }),
                connector,
                sink,
                ws_config,
                queue: MessageQueue::new(move |payload: &Payload| {
                    weak.upgrade().is_some_and(|shared| shared.deliver(payload))
                }),
            }
        });

        if auto_connect {
            shared.schedule_auto_connect();
        }

        Ok(Self { shared })
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Connects with the current options and their `connectTimeout`.
    ///
    /// # Errors
    ///
    /// See [`Client::connect_with`].
    pub fn connect(&self) -> LifecycleFuture {
        self.connect_with(ConnectParams::default())
    }

    /// Connects, optionally replacing the options and overriding the
    /// timeout. Cancels a scheduled auto-reconnect.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnecting`] if a transport is attached
    /// - [`Error::Config`] if replacement options are invalid
    /// - [`Error::MissingOptions`] if no options were ever provided
    /// - [`Error::InvalidTimeout`] if the timeout is negative
    /// - [`Error::ConnectTimeout`] if open does not arrive in time
    /// - [`Error::ConnectCancelled`] if `disconnect` is called first
    /// - [`Error::Transport`] / [`Error::ConnectionClosed`] if the
    ///   transport fails before opening
    pub fn connect_with(&self, params: ConnectParams) -> LifecycleFuture {
        self.shared.cancel_reconnect();
        let started = self
            .shared
            .begin_connect(params.options.as_ref(), params.timeout_ms);

        async move {
            match started {
                Ok(pending) => Shared::await_connect(pending).await,
                Err(err) => Err(err),
            }
        }
        .boxed()
    }

    /// Closes the transport without a code or reason.
    ///
    /// # Errors
    ///
    /// See [`Client::disconnect_with`].
    pub fn disconnect(&self) -> LifecycleFuture {
        self.disconnect_with(None, None)
    }

    /// Empties the queue, cancels any scheduled auto-reconnect and closes
    /// the transport. Resolves immediately if there is no transport.
    ///
    /// A connect still waiting for open fails with
    /// [`Error::ConnectCancelled`]. A close requested here never triggers
    /// auto-reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the transport reports an error before
    /// it closes.
    pub fn disconnect_with(&self, code: Option<u16>, reason: Option<&str>) -> LifecycleFuture {
        let done = self.shared.begin_disconnect(code, reason);

        async move {
            match done {
                Some(done) => done.await.unwrap_or(Ok(())),
                None => Ok(()),
            }
        }
        .boxed()
    }

    /// Disconnects with code 1000 and reason "reconnecting", then connects.
    ///
    /// # Errors
    ///
    /// See [`Client::reconnect_with`].
    pub fn reconnect(&self) -> LifecycleFuture {
        self.reconnect_with(ReconnectParams::default())
    }

    /// Applies replacement options, then disconnects and connects.
    ///
    /// # Errors
    ///
    /// Returns the first error from applying options, disconnecting or
    /// connecting.
    pub fn reconnect_with(&self, params: ReconnectParams) -> LifecycleFuture {
        if let Some(raw) = &params.options
            && let Err(err) = self.set_options(raw)
        {
            return future::ready(Err(err)).boxed();
        }

        let disconnect = self.disconnect_with(Some(params.code), Some(&params.reason));
        let client = self.clone();
        let timeout_ms = params.timeout_ms;

        async move {
            disconnect.await?;
            client
                .connect_with(ConnectParams {
                    options: None,
                    timeout_ms,
                })
                .await
        }
        .boxed()
    }

    /// Replaces the options. Takes effect on the next connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `raw` is invalid; the previous options
    /// stay in place.
    pub fn set_options(&self, raw: &RawOptions) -> Result<()> {
        let options = ClientOptions::normalize(raw)?;
        debug!(url = options.url(), "Client options replaced");
        self.shared.state.lock().options = Some(Arc::new(options));
        Ok(())
    }
}

// ============================================================================
// Client - Messaging
// ============================================================================

impl Client {
    /// Sends one payload if the transport is open; otherwise drops it.
    pub fn send(&self, payload: impl Into<Payload>) {
        self.shared.deliver(&payload.into());
    }

    /// Sends each payload in order if the transport is open.
    pub fn send_all<I>(&self, payloads: I)
    where
        I: IntoIterator,
        I::Item: Into<Payload>,
    {
        for payload in payloads {
            self.send(payload);
        }
    }

    /// Returns the outbound queue. Its consumer sends through this client
    /// and declines while the transport is not open.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &MessageQueue<Payload> {
        &self.shared.queue
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the current options, if any were provided.
    #[must_use]
    pub fn options(&self) -> Option<Arc<ClientOptions>> {
        self.shared.state.lock().options.clone()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().phase
    }

    /// Returns `true` while the transport is open.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns `true` while an auto-reconnect is scheduled.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.shared.state.lock().reconnect.is_some()
    }

    /// Returns the transport's ready state, or `Closed` without one.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.shared
            .transport()
            .map_or(ReadyState::Closed, |t| t.ready_state())
    }

    /// Returns the transport's unsent byte count, or 0 without one.
    #[must_use]
    pub fn buffered_amount(&self) -> usize {
        self.shared.transport().map_or(0, |t| t.buffered_amount())
    }

    /// Returns the negotiated extensions, or empty without a transport.
    #[must_use]
    pub fn extensions(&self) -> String {
        self.shared
            .transport()
            .map_or_else(String::new, |t| t.extensions())
    }

    /// Returns the negotiated subprotocol, or empty without a transport.
    #[must_use]
    pub fn protocol(&self) -> String {
        self.shared
            .transport()
            .map_or_else(String::new, |t| t.protocol())
    }

    /// Returns the binary type of the transport, else of the options.
    #[must_use]
    pub fn binary_type(&self) -> BinaryType {
        if let Some(transport) = self.shared.transport() {
            return transport.binary_type();
        }
        self.options()
            .map_or_else(BinaryType::default, |o| o.binary_type())
    }

    /// Returns the transport URL, else the configured URL, else empty.
    #[must_use]
    pub fn url(&self) -> String {
        if let Some(transport) = self.shared.transport() {
            return transport.url().to_string();
        }
        self.options()
            .map_or_else(String::new, |o| o.url().to_string())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("url", &self.url())
            .field("queued", &self.shared.queue.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Shared - Connect / Disconnect
// ============================================================================

impl Shared {
    /// Validates, creates the transport and spawns its event pump and
    /// connect timer. The connector is called without the state lock held.
    fn begin_connect(
        self: &Arc<Self>,
        overrides: Option<&RawOptions>,
        timeout_ms: Option<i64>,
    ) -> Result<PendingConnect> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::transport("connect requires a tokio runtime"))?;

        let (options, timeout_ms, generation) = {
            let mut state = self.state.lock();
            if state.attempt.is_some() {
                return Err(Error::AlreadyConnecting);
            }

            let options = match overrides {
                Some(raw) => Arc::new(ClientOptions::normalize(raw)?),
                None => state
                    .options
                    .clone()
                    .ok_or_else(|| Error::missing_options("client"))?,
            };
            let timeout_ms = match timeout_ms {
                Some(value) => u64::try_from(value).map_err(|_| Error::invalid_timeout(value))?,
                None => options.connect_timeout_ms(),
            };

            state.generation += 1;
            (options, timeout_ms, state.generation)
        };

        let (transport, events) = self.connector.open(TransportRequest {
            url: options.url().to_string(),
            protocols: options.protocols().to_vec(),
            binary_type: options.binary_type(),
            config: self.ws_config.clone(),
        });

        let (done_tx, done) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if state.attempt.is_some() {
                drop(state);
                transport.close(None, None);
                return Err(Error::AlreadyConnecting);
            }

            state.options = Some(Arc::clone(&options));
            state.attempt = Some(Attempt {
                generation,
                transport,
                options: Arc::clone(&options),
                was_open: false,
                manual_close: false,
                pending_connect: Some(done_tx),
                pending_disconnect: Vec::new(),
                deadline: None,
            });
            state.phase = ConnectionState::Connecting;
        }

        let weak = Arc::downgrade(self);
        let deadline = runtime
            .spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                if let Some(shared) = weak.upgrade() {
                    shared.expire_connect(generation, timeout_ms);
                }
            })
            .abort_handle();
        match self.state.lock().current_mut(generation) {
            Some(attempt) if !attempt.was_open => attempt.deadline = Some(deadline),
            _ => deadline.abort(),
        }

        runtime.spawn(Self::pump(Arc::downgrade(self), generation, events));
        info!(url = options.url(), generation, timeout_ms, "Connecting");

        Ok(done)
    }

    /// Waits for the attempt to open, fail or time out.
    async fn await_connect(pending: PendingConnect) -> Result<()> {
        pending.await.unwrap_or(Err(Error::ConnectionClosed))
    }

    /// Detaches a transport that did not open in time.
    fn expire_connect(self: &Arc<Self>, generation: u64, timeout_ms: u64) {
        let (attempt, delay) = {
            let mut state = self.state.lock();
            match state.current(generation) {
                Some(attempt) if !attempt.was_open => {}
                _ => return,
            }
            let Some(attempt) = state.attempt.take() else {
                return;
            };
            state.phase = ConnectionState::Closed;
            let delay = attempt.reconnect_delay();
            (attempt, delay)
        };

        warn!(url = attempt.options.url(), timeout_ms, "Connect timed out");
        attempt.transport.close(None, None);
        if attempt.options.trigger_events() {
            self.sink.trigger(SocketEvent::Close {
                code: None,
                reason: String::new(),
            });
        }
        if let Some(done) = attempt.pending_connect {
            let _ = done.send(Err(Error::connect_timeout(timeout_ms)));
        }
        for waiter in attempt.pending_disconnect {
            let _ = waiter.send(Ok(()));
        }

        if let Some(interval_ms) = delay {
            self.schedule_reconnect(interval_ms);
        }
    }

    /// Runs the synchronous part of a disconnect. Returns `None` if there is
    /// no transport to close.
    fn begin_disconnect(
        &self,
        code: Option<u16>,
        reason: Option<&str>,
    ) -> Option<oneshot::Receiver<Result<()>>> {
        self.cancel_reconnect();
        self.queue.empty();

        let (transport, cancelled, done) = {
            let mut state = self.state.lock();
            let Some(attempt) = state.attempt.as_mut() else {
                trace!("Disconnect without transport");
                return None;
            };
            let (done_tx, done) = oneshot::channel();
            attempt.pending_disconnect.push(done_tx);
            attempt.manual_close = true;
            let cancelled = attempt.pending_connect.take();
            let transport = Arc::clone(&attempt.transport);
            state.phase = ConnectionState::Closing;
            (transport, cancelled, done)
        };

        debug!(url = transport.url(), ?code, "Disconnecting");
        if let Some(cancelled) = cancelled {
            let _ = cancelled.send(Err(Error::ConnectCancelled));
        }
        transport.close(code, reason);

        Some(done)
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.state
            .lock()
            .attempt
            .as_ref()
            .map(|a| Arc::clone(&a.transport))
    }
}

// ============================================================================
// Shared - Transport Events
// ============================================================================

impl Shared {
    /// Forwards one transport's events until it closes or is replaced.
    async fn pump(weak: Weak<Self>, generation: u64, mut events: EventReceiver) {
        loop {
            let Some(event) = events.recv().await else {
                // Sender dropped without a close event.
                if let Some(shared) = weak.upgrade() {
                    shared.on_close(generation, None, String::new());
                }
                break;
            };

            let Some(shared) = weak.upgrade() else {
                break;
            };
            if !shared.handle_event(generation, event) {
                break;
            }
        }

        trace!(generation, "Transport event pump finished");
    }

    /// Applies one event. Returns `false` once the pump should stop.
    fn handle_event(self: &Arc<Self>, generation: u64, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Open => self.on_open(generation),
            TransportEvent::Message(frame) => self.on_message(generation, frame),
            TransportEvent::Error(message) => self.on_error(generation, message),
            TransportEvent::Close { code, reason } => {
                self.on_close(generation, code, reason);
                false
            }
        }
    }

    fn on_open(&self, generation: u64) -> bool {
        let (options, done) = {
            let mut state = self.state.lock();
            let Some(attempt) = state.current_mut(generation) else {
                trace!(generation, "Stale open ignored");
                return false;
            };
            if attempt.manual_close {
                trace!(generation, "Open after disconnect request ignored");
                return true;
            }
            attempt.was_open = true;
            if let Some(deadline) = attempt.deadline.take() {
                deadline.abort();
            }
            let done = attempt.pending_connect.take();
            let options = Arc::clone(&attempt.options);
            state.phase = ConnectionState::Open;
            (options, done)
        };

        info!(url = options.url(), "Connection open");
        if options.trigger_events() {
            self.sink.trigger(SocketEvent::Open);
        }
        if let Some(done) = done {
            let _ = done.send(Ok(()));
        }
        self.queue.process();
        true
    }

    fn on_message(&self, generation: u64, frame: Frame) -> bool {
        let options = self
            .state
            .lock()
            .current(generation)
            .map(|a| Arc::clone(&a.options));
        let Some(options) = options else {
            trace!(generation, "Stale message ignored");
            return false;
        };

        if !options.trigger_events() {
            trace!(len = frame.len(), "Message received, events disabled");
            return true;
        }

        let payload = Payload::decode(frame, options.serializer().as_ref());
        self.sink.trigger(SocketEvent::MessageIn(payload));
        true
    }

    fn on_error(&self, generation: u64, message: String) -> bool {
        let (options, done, waiters) = {
            let mut state = self.state.lock();
            let Some(attempt) = state.current_mut(generation) else {
                trace!(generation, "Stale error ignored");
                return false;
            };
            (
                Arc::clone(&attempt.options),
                attempt.pending_connect.take(),
                mem::take(&mut attempt.pending_disconnect),
            )
        };

        warn!(url = options.url(), error = %message, "Transport error");
        if let Some(done) = done {
            let _ = done.send(Err(Error::transport(message.clone())));
        }
        for waiter in waiters {
            let _ = waiter.send(Err(Error::transport(message.clone())));
        }
        if options.trigger_events() {
            self.sink.trigger(SocketEvent::Error { message });
        }
        true
    }

    fn on_close(self: &Arc<Self>, generation: u64, code: Option<u16>, reason: String) {
        let (attempt, delay) = {
            let mut state = self.state.lock();
            if state.current(generation).is_none() {
                trace!(generation, "Stale close ignored");
                return;
            }
            let Some(attempt) = state.attempt.take() else {
                return;
            };
            state.phase = ConnectionState::Closed;
            let delay = attempt.reconnect_delay();
            (attempt, delay)
        };

        if let Some(deadline) = &attempt.deadline {
            deadline.abort();
        }
        info!(url = attempt.options.url(), ?code, reason = %reason, "Connection closed");
        if let Some(done) = attempt.pending_connect {
            let _ = done.send(Err(Error::ConnectionClosed));
        }
        for waiter in attempt.pending_disconnect {
            let _ = waiter.send(Ok(()));
        }
        if attempt.options.trigger_events() {
            self.sink.trigger(SocketEvent::Close { code, reason });
        }

        if let Some(interval_ms) = delay {
            self.schedule_reconnect(interval_ms);
        }
    }
}

// ============================================================================
// Shared - Timers
// ============================================================================

impl Shared {
    /// Starts a connect on the next scheduler tick.
    fn schedule_auto_connect(self: &Arc<Self>) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("autoConnect requires a tokio runtime, connect manually");
            return;
        };

        let weak = Arc::downgrade(self);
        runtime.spawn(async move {
            tokio::task::yield_now().await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let result = match shared.begin_connect(None, None) {
                Ok(pending) => Self::await_connect(pending).await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                warn!(error = %err, "Auto-connect failed");
            }
        });
    }

    /// Arms the auto-reconnect timer, replacing any earlier one.
    fn schedule_reconnect(self: &Arc<Self>, interval_ms: u64) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("Auto-reconnect requires a tokio runtime");
            return;
        };

        let weak = Arc::downgrade(self);
        let mut state = self.state.lock();
        state.reconnect_seq += 1;
        let id = state.reconnect_seq;

        let task = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire_reconnect(id).await;
            }
        });

        if let Some(previous) = state.reconnect.replace(ReconnectHandle::new(id, task)) {
            previous.cancel();
        }
        drop(state);

        debug!(interval_ms, "Auto-reconnect scheduled");
    }

    async fn fire_reconnect(self: Arc<Self>, id: u64) {
        if !self.claim_reconnect(id) {
            return;
        }

        debug!("Auto-reconnect attempt");
        let result = match self.begin_connect(None, None) {
            Ok(pending) => Self::await_connect(pending).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            debug!(error = %err, "Auto-reconnect attempt failed");
        }
    }

    /// Releases the timer slot if it still belongs to timer `id`.
    fn claim_reconnect(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        if state.reconnect.as_ref().is_some_and(|h| h.id == id) {
            state.reconnect = None;
            true
        } else {
            false
        }
    }

    fn cancel_reconnect(&self) {
        let handle = self.state.lock().reconnect.take();
        if let Some(handle) = handle {
            trace!(id = handle.id, "Auto-reconnect cancelled");
            handle.cancel();
        }
    }
}

// ============================================================================
// Shared - Delivery
// ============================================================================

impl Shared {
    /// Sends one payload. Returns the queue ack: `false` only while the
    /// transport cannot take it yet.
    fn deliver(&self, payload: &Payload) -> bool {
        let (transport, options) = {
            let state = self.state.lock();
            match (state.phase, state.attempt.as_ref()) {
                (ConnectionState::Open, Some(attempt)) => (
                    Arc::clone(&attempt.transport),
                    Arc::clone(&attempt.options),
                ),
                _ => {
                    trace!(phase = %state.phase, "Not open, message not sent");
                    return false;
                }
            }
        };

        let frame = match payload.encode(options.serializer().as_ref()) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Message not serializable, dropped");
                return true;
            }
        };

        match transport.send(frame) {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "Send failed");
                false
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(handle) = state.reconnect.take() {
            handle.cancel();
        }
        if let Some(attempt) = state.attempt.take() {
            if let Some(deadline) = &attempt.deadline {
                deadline.abort();
            }
            attempt.transport.close(None, None);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::NullSink;
    use crate::transport::WsConnector;

    fn client(options: Option<RawOptions>) -> Client {
        Client::new(
            options.as_ref(),
            Arc::new(WsConnector),
            Arc::new(NullSink),
            None,
        )
        .expect("client")
    }

    #[test]
    fn test_new_without_options_is_idle() {
        let client = client(None);
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(!client.connected());
        assert!(client.options().is_none());
        assert_eq!(client.url(), "");
        assert_eq!(client.ready_state(), ReadyState::Closed);
        assert_eq!(client.buffered_amount(), 0);
        assert_eq!(client.protocol(), "");
        assert_eq!(client.extensions(), "");
        assert_eq!(client.binary_type(), BinaryType::Blob);
    }

    #[test]
    fn test_new_rejects_invalid_options() {
        let raw = RawOptions::new().with("ssl", "yes");
        let err = Client::new(Some(&raw), Arc::new(WsConnector), Arc::new(NullSink), None)
            .unwrap_err();
        assert_eq!(err.config_field(), Some("ssl"));
    }

    #[test]
    fn test_url_falls_back_to_options() {
        let client = client(Some(RawOptions::new().port(8001).path("feed")));
        assert_eq!(client.url(), "ws://localhost:8001/feed");
        assert_eq!(client.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_set_options_keeps_previous_on_error() {
        let client = client(Some(RawOptions::new().port(8001)));

        let err = client
            .set_options(&RawOptions::new().url("http://localhost"))
            .unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(client.url(), "ws://localhost:8001/");

        client
            .set_options(&RawOptions::new().url("wss://example.com/a"))
            .expect("valid");
        assert_eq!(client.url(), "wss://example.com/a");
    }

    #[tokio::test]
    async fn test_connect_without_options_fails() {
        let err = client(None).connect().await.unwrap_err();
        assert!(matches!(err, Error::MissingOptions { .. }));
    }

    #[tokio::test]
    async fn test_negative_timeout_rejected() {
        let client = client(Some(RawOptions::new().port(8001)));
        let err = client
            .connect_with(ConnectParams::new().timeout_ms(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTimeout { value: -1 }));
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_disconnect_without_transport_resolves() {
        let client = client(Some(RawOptions::new().port(8001)));
        client.queue().push(Payload::Text("dropped".into()));

        client.disconnect().await.expect("no-op disconnect");
        assert!(client.queue().is_empty());
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_send_when_idle_is_dropped() {
        let client = client(Some(RawOptions::new().port(8001)));
        client.send("hello");
        client.send_all(["a", "b"]);
        assert!(client.queue().is_empty());
    }

    #[test]
    fn test_debug_shows_state() {
        let rendered = format!("{:?}", client(None));
        assert!(rendered.contains("Idle"));
    }
}
