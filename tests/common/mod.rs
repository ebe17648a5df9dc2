//! Shared fixtures: a scripted transport and a recording event sink.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use wsbus::transport::EventReceiver;
use wsbus::{
    BinaryType, Connector, Error, EventSink, Frame, ReadyState, Result, SocketEvent, Transport,
    TransportEvent, TransportRequest,
};

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Waiting
// ============================================================================

/// Polls `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Lets spawned tasks run for a short while.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

// ============================================================================
// MockTransport
// ============================================================================

/// Transport whose events are driven by the test.
pub struct MockTransport {
    request: TransportRequest,
    state: Mutex<ReadyState>,
    sent: Mutex<Vec<Frame>>,
    closes: Mutex<Vec<(Option<u16>, Option<String>)>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    echo_close: bool,
}

impl MockTransport {
    /// Completes the handshake.
    pub fn open(&self) {
        *self.state.lock() = ReadyState::Open;
        let _ = self.events.send(TransportEvent::Open);
    }

    /// Delivers an inbound frame.
    pub fn receive(&self, frame: Frame) {
        let _ = self.events.send(TransportEvent::Message(frame));
    }

    /// Reports an error.
    pub fn fail(&self, message: &str) {
        let _ = self.events.send(TransportEvent::Error(message.to_string()));
    }

    /// Closes from the peer side.
    pub fn peer_close(&self, code: Option<u16>, reason: &str) {
        *self.state.lock() = ReadyState::Closed;
        let _ = self.events.send(TransportEvent::Close {
            code,
            reason: reason.to_string(),
        });
    }

    /// Returns the frames sent so far.
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Returns the close requests received so far.
    pub fn closes(&self) -> Vec<(Option<u16>, Option<String>)> {
        self.closes.lock().clone()
    }

    /// Returns the request this transport was created for.
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }
}

impl Transport for MockTransport {
    fn url(&self) -> &str {
        &self.request.url
    }

    fn protocol(&self) -> String {
        self.request.protocols.first().cloned().unwrap_or_default()
    }

    fn extensions(&self) -> String {
        String::new()
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }

    fn buffered_amount(&self) -> usize {
        0
    }

    fn binary_type(&self) -> BinaryType {
        self.request.binary_type
    }

    fn send(&self, frame: Frame) -> Result<()> {
        if *self.state.lock() != ReadyState::Open {
            return Err(Error::transport("mock transport is not open"));
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&self, code: Option<u16>, reason: Option<&str>) {
        self.closes
            .lock()
            .push((code, reason.map(str::to_string)));
        if self.echo_close {
            self.peer_close(code, reason.unwrap_or_default());
        } else {
            *self.state.lock() = ReadyState::Closing;
        }
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Connector handing out [`MockTransport`]s.
#[derive(Default)]
pub struct MockConnector {
    transports: Mutex<Vec<Arc<MockTransport>>>,
    auto_open: bool,
    hold_close: bool,
}

impl MockConnector {
    /// Transports wait for the test to call `open`.
    pub fn manual() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transports open as soon as they are created.
    pub fn auto_open() -> Arc<Self> {
        Arc::new(Self {
            auto_open: true,
            ..Self::default()
        })
    }

    /// Transports never complete a close the controller requests.
    pub fn holding_close() -> Arc<Self> {
        Arc::new(Self {
            hold_close: true,
            ..Self::default()
        })
    }

    /// Returns how many transports were created.
    pub fn attempts(&self) -> usize {
        self.transports.lock().len()
    }

    /// Returns the `index`-th transport.
    pub fn transport(&self, index: usize) -> Arc<MockTransport> {
        Arc::clone(&self.transports.lock()[index])
    }

    /// Returns the most recent transport.
    pub fn last(&self) -> Arc<MockTransport> {
        let transports = self.transports.lock();
        Arc::clone(transports.last().expect("no transport created"))
    }
}

impl Connector for MockConnector {
    fn open(&self, request: TransportRequest) -> (Arc<dyn Transport>, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(MockTransport {
            request,
            state: Mutex::new(ReadyState::Connecting),
            sent: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
            events: tx,
            echo_close: !self.hold_close,
        });
        if self.auto_open {
            transport.open();
        }
        self.transports.lock().push(Arc::clone(&transport));
        (transport, rx)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Sink that keeps every event.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<SocketEvent>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the names of recorded events in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SocketEvent::name).collect()
    }

    /// Removes and returns all recorded events.
    pub fn take(&self) -> Vec<SocketEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Returns how many events named `name` were recorded.
    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl EventSink for Recorder {
    fn trigger(&self, event: SocketEvent) {
        self.events.lock().push(event);
    }
}
