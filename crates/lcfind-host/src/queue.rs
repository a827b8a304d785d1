//! Bounded inbound message queue shared between the receive pump and the
//! tick loop.
//!
//! Overflow sheds the **oldest** entry instead of blocking: discovery
//! traffic is bursty and stale requests are the least valuable thing in the
//! queue, while reconfiguration traffic is rare and safe for the operator to
//! retry.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex;

use tracing::warn;

/// One received datagram, as queued by the pump: the payload text and the
/// endpoint it came from. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub payload: String,
    pub sender: SocketAddr,
}

/// Thread-safe bounded FIFO of raw messages.
///
/// `push` and `pop` are the only operations, so a plain mutex around a
/// `VecDeque` is sufficient; neither side ever holds the lock across I/O.
pub struct InboundQueue {
    entries: Mutex<VecDeque<RawMessage>>,
    capacity: usize,
}

impl InboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    /// Enqueues a message, shedding the oldest entry when full.
    pub fn push(&self, message: RawMessage) {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            if let Some(dropped) = entries.pop_front() {
                warn!(sender = %dropped.sender, "inbound queue full, shedding the oldest message");
            }
        }
        entries.push_back(message);
    }

    /// Dequeues the oldest message, if any.
    pub fn pop(&self) -> Option<RawMessage> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RawMessage>> {
        // A poisoned lock only means another thread panicked mid-push/pop;
        // the deque itself is still structurally sound.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
