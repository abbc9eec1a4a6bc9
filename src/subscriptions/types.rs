//! Subscriber types for the live feed.

use super::SubscriberRegistry;
use crate::types::ChangeRecord;
use std::fmt;
use std::sync::Weak;
use tokio::sync::mpsc;

/// One delivery to a subscriber: the initial snapshot or a single new record.
pub type FeedBatch = Vec<ChangeRecord>;

/// Configuration for a subscriber channel.
#[derive(Clone, Debug)]
pub struct SubscriberConfig {
    /// Max queued batches before the subscriber is dropped.
    /// Default: 256
    pub buffer_size: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self { buffer_size: 256 }
    }
}

/// Why a subscriber was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::BufferOverflow => "buffer_overflow",
            DropReason::Disconnected => "disconnected",
            DropReason::Unsubscribed => "unsubscribed",
        };
        f.write_str(s)
    }
}

/// Unique identifier for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a subscriber channel.
///
/// Dropping the handle deregisters the subscriber.
pub struct SubscriberHandle {
    pub id: SubscriberId,
    receiver: mpsc::Receiver<FeedBatch>,
    registry: Weak<SubscriberRegistry>,
}

impl SubscriberHandle {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<FeedBatch>,
        registry: Weak<SubscriberRegistry>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    /// Receive the next batch; `None` once the subscriber has been dropped
    /// and its queue drained.
    pub async fn recv(&mut self) -> Option<FeedBatch> {
        self.receiver.recv().await
    }

    /// Try to receive a batch (non-blocking).
    pub fn try_recv(&mut self) -> Result<FeedBatch, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Whether the registry still delivers to this subscriber.
    pub fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_registered(self.id))
    }

    /// Deregister now. Idempotent.
    pub fn close(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
