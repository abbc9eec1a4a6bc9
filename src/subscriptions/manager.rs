//! Subscriber registry for broadcasting finalized records.

use crate::types::ChangeRecord;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Sender};
use tracing::debug;

use super::types::{DropReason, FeedBatch, SubscriberConfig, SubscriberHandle, SubscriberId};

/// Internal subscriber state.
struct Subscriber {
    sender: Sender<FeedBatch>,
}

impl Subscriber {
    /// Queue a batch without waiting.
    fn try_send(&self, batch: FeedBatch) -> Result<(), DropReason> {
        match self.sender.try_send(batch) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
            Err(TrySendError::Closed(_)) => Err(DropReason::Disconnected),
        }
    }
}

/// The set of live subscribers.
pub struct SubscriberRegistry {
    /// Live subscribers by ID.
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    /// Counter for generating subscriber IDs.
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber, seeding its queue with `snapshot`.
    ///
    /// The snapshot is queued before the subscriber becomes visible to
    /// [`broadcast`](Self::broadcast), so it always arrives first. A
    /// `buffer_size` of zero is treated as one.
    pub fn subscribe(
        self: &Arc<Self>,
        snapshot: FeedBatch,
        config: SubscriberConfig,
    ) -> SubscriberHandle {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let subscriber = Subscriber { sender };
        let handle = SubscriberHandle::new(id, receiver, Arc::downgrade(self));

        let snapshot_len = snapshot.len();
        match subscriber.try_send(snapshot) {
            Ok(()) => {
                self.subscribers.write().insert(id, subscriber);
                debug!(subscriber = %id, snapshot_len, "subscriber live");
            }
            Err(reason) => {
                debug!(subscriber = %id, %reason, "subscriber closed before going live");
            }
        }

        handle
    }

    /// Remove a subscriber. Removing an unknown ID is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().remove(&id).is_some() {
            debug!(subscriber = %id, reason = %DropReason::Unsubscribed, "subscriber removed");
        }
    }

    /// Drop every subscriber. Their receivers end once drained.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.subscribers.write());
        if !removed.is_empty() {
            debug!(count = removed.len(), "all subscribers removed");
        }
        removed.len()
    }

    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver one record to every subscriber. Drops subscribers that fail to
    /// receive. Returns the number of successful deliveries.
    pub fn broadcast(&self, record: &ChangeRecord) -> usize {
        let mut to_remove = Vec::new();
        let mut delivered = 0;

        {
            let subs = self.subscribers.read();
            for (id, sub) in subs.iter() {
                match sub.try_send(vec![record.clone()]) {
                    Ok(()) => delivered += 1,
                    Err(reason) => to_remove.push((*id, reason)),
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscribers.write();
            for (id, reason) in to_remove {
                if subs.remove(&id).is_some() {
                    debug!(subscriber = %id, %reason, "subscriber dropped");
                }
            }
        }

        delivered
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
