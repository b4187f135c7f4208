//! Fan-out from the single producer to every connected client.
//!
//! Each subscriber owns a bounded `EventQueue`, so a message is delivered to
//! all clients instead of being claimed by whichever one reads first. A slow
//! client only loses its own oldest updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{BroadcastMessage, EventKind, EventQueue, PutOutcome};
use crate::config::section::WatchConfig;

/// Registry of per-client queues.
#[derive(Debug)]
pub struct EventHub {
    capacity: usize,
    /// Replay the latest update into new subscriptions
    replay_latest: bool,
    next_id: AtomicU64,
    subscribers: Mutex<FxHashMap<u64, Arc<EventQueue>>>,
    /// Latest update; always locked after `subscribers`
    latest: Mutex<Option<BroadcastMessage>>,
}

impl EventHub {
    pub fn new(capacity: usize, replay_latest: bool) -> Self {
        Self {
            capacity,
            replay_latest,
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(FxHashMap::default()),
            latest: Mutex::new(None),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.queue_capacity, config.replay_latest)
    }

    /// Register a new client queue. Dropping the subscription unregisters it.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(EventQueue::new(self.capacity));

        let mut subscribers = self.subscribers.lock();
        if self.replay_latest
            && let Some(latest) = self.latest.lock().clone()
        {
            queue.put(latest);
        }
        subscribers.insert(id, Arc::clone(&queue));
        crate::debug!("stream"; "client {} subscribed (total: {})", id, subscribers.len());

        Subscription {
            id,
            queue,
            hub: Arc::downgrade(self),
        }
    }

    /// Put a message into every subscriber queue. Returns the number of
    /// subscribers it was delivered to.
    pub fn publish(&self, msg: BroadcastMessage) -> usize {
        let subscribers = self.subscribers.lock();
        if msg.kind() == EventKind::FileUpdate {
            *self.latest.lock() = Some(msg.clone());
        }

        for (id, queue) in subscribers.iter() {
            if let PutOutcome::Evicted(old) = queue.put(msg.clone()) {
                crate::log!(
                    "warning";
                    "client {} is not keeping up (queue of {}), dropped pending {} {}",
                    id,
                    queue.capacity(),
                    old.kind().as_str(),
                    old.id()
                );
            }
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.lock();
        subscribers.remove(&id);
        crate::debug!("stream"; "client {} unsubscribed (total: {})", id, subscribers.len());
    }
}

/// One client's view of the hub.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    queue: Arc<EventQueue>,
    hub: Weak<EventHub>,
}

impl Subscription {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Wait up to `timeout` for the next message.
    pub fn get(&self, timeout: Duration) -> Option<BroadcastMessage> {
        self.queue.get(timeout)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
