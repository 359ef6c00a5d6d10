//! Single-slot holder for the most recent frame.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared handle to the latest encoded frame.
///
/// Cloning is cheap; all clones refer to the same slot. Writers replace
/// the whole frame at once and readers see either the old or the new
/// frame, never a mix. There is no history and no queue: a slow reader
/// simply skips frames.
#[derive(Clone)]
pub struct LiveFrameSlot {
    tx: Arc<watch::Sender<Option<Bytes>>>,
    closed: CancellationToken,
}

impl LiveFrameSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            closed: CancellationToken::new(),
        }
    }

    /// Replaces the current frame and wakes every subscriber.
    pub fn set(&self, frame: Bytes) {
        self.tx.send_replace(Some(frame));
    }

    /// Returns the current frame, or `None` before the first `set`.
    pub fn get(&self) -> Option<Bytes> {
        self.tx.borrow().clone()
    }

    /// Returns a receiver notified on every `set`.
    pub fn subscribe(&self) -> watch::Receiver<Option<Bytes>> {
        self.tx.subscribe()
    }

    /// Returns the token cancelled by [`close`](Self::close).
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Ends every viewer stream attached to this slot.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveFrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
