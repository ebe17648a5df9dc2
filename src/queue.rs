//! Single-consumer, ack-driven outbound message queue.
//!
//! Items are handed to a consumer one at a time, strictly in FIFO order.
//! The consumer returns an ack: `true` removes the head and moves on to the
//! next item on the following scheduler tick, `false` halts the queue with
//! the head still in place until [`MessageQueue::process`] is called again.
//!
//! # Scheduling
//!
//! ```text
//! push ──► process() ──► (next tick) consumer(head)
//!                              │
//!                  ack=true ◄──┴──► ack=false
//!                     │                 │
//!              pop, next tick        halt, keep head
//! ```
//!
//! `process()` is idempotent: while a drain is scheduled, further calls do
//! nothing. A call made while the consumer is running marks the drain for a
//! rerun, so a declined head is retried once more instead of halting. The
//! consumer always runs on a spawned task, never synchronously from
//! `push`/`process`, and never while the queue lock is held.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{trace, warn};

// ============================================================================
// Types
// ============================================================================

/// Delivery attempt for one item. Returns the ack.
pub type Consumer<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

// ============================================================================
// MessageQueue
// ============================================================================

/// Ordered outbound buffer with a single injected consumer.
///
/// Cloning yields another handle to the same queue.
pub struct MessageQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<QueueState<T>>,
    consumer: Consumer<T>,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// A drain task is scheduled or running.
    scheduled: bool,
    /// `process()` was called after the in-flight head was taken.
    rerun: bool,
    /// Bumped by `empty()`; a declined head is only reinserted if unchanged.
    epoch: u64,
}

impl<T> Clone for MessageQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MessageQueue")
            .field("len", &state.items.len())
            .field("scheduled", &state.scheduled)
            .finish()
    }
}

// ============================================================================
// MessageQueue - Public API
// ============================================================================

impl<T: Send + 'static> MessageQueue<T> {
    /// Creates an empty queue delivering to `consumer`.
    pub fn new(consumer: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    scheduled: false,
                    rerun: false,
                    epoch: 0,
                }),
                consumer: Box::new(consumer),
            }),
        }
    }

    /// Appends an item and schedules processing.
    pub fn push(&self, item: T) -> &Self {
        self.inner.state.lock().items.push_back(item);
        self.process()
    }

    /// Appends items in order and schedules processing.
    pub fn push_all(&self, items: impl IntoIterator<Item = T>) -> &Self {
        self.inner.state.lock().items.extend(items);
        self.process()
    }

    /// Discards all items without invoking the consumer.
    pub fn empty(&self) -> &Self {
        let mut state = self.inner.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        state.epoch = state.epoch.wrapping_add(1);
        drop(state);

        if dropped > 0 {
            trace!(dropped, "Message queue emptied");
        }
        self
    }

    /// Schedules one delivery attempt of the head item on the next tick.
    ///
    /// Does nothing if the queue is empty. While a drain is running the call
    /// is folded into it as one more attempt of the head. Requires a tokio
    /// runtime; without one the queue is left untouched.
    pub fn process(&self) -> &Self {
        {
            let mut state = self.inner.state.lock();
            if state.scheduled {
                state.rerun = true;
                return self;
            }
            if state.items.is_empty() {
                return self;
            }
            state.scheduled = true;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move { inner.drain().await });
            }
            Err(_) => {
                warn!("Message queue processing requires a tokio runtime");
                let mut state = self.inner.state.lock();
                state.scheduled = false;
                state.rerun = false;
            }
        }

        self
    }

    /// Returns the number of queued items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    /// Returns `true` if no items are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }
}

// ============================================================================
// Drain Loop
// ============================================================================

impl<T> Inner<T> {
    /// Delivers items one per tick until the queue empties or the consumer
    /// declines.
    async fn drain(&self) {
        loop {
            tokio::task::yield_now().await;
            if !self.deliver_head() {
                break;
            }
        }
    }

    /// Attempts the head item. Returns `true` if draining should continue.
    fn deliver_head(&self) -> bool {
        let (item, epoch) = {
            let mut state = self.state.lock();
            state.rerun = false;
            match state.items.pop_front() {
                Some(item) => (item, state.epoch),
                None => {
                    state.scheduled = false;
                    return false;
                }
            }
        };

        // Consumer runs unlocked so it may push re-entrantly.
        let ack = (self.consumer)(&item);

        let mut state = self.state.lock();
        if ack {
            trace!(remaining = state.items.len(), "Message delivered");
            return true;
        }

        if state.epoch == epoch {
            state.items.push_front(item);
        }
        if state.rerun && !state.items.is_empty() {
            trace!(pending = state.items.len(), "Message declined, retrying on request");
            return true;
        }
        state.scheduled = false;
        state.rerun = false;
        trace!(pending = state.items.len(), "Message declined, queue halted");
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
