//! Bounded hand-off buffer between the producer and one client.
//!
//! Overflow policy is drop-oldest: `put` never blocks, a full queue evicts
//! its oldest pending message to make room. Only the latest state matters to
//! a preview client, so losing an intermediate update is acceptable.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};

use super::BroadcastMessage;

/// Result of `EventQueue::put`.
#[derive(Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Queued,
    /// Queue was full; the returned oldest message was discarded.
    Evicted(BroadcastMessage),
}

/// Capacity-bounded FIFO of pending broadcast messages.
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<BroadcastMessage>,
    rx: Receiver<BroadcastMessage>,
    capacity: usize,
}

impl EventQueue {
    /// Create a queue. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Insert a message, evicting the oldest one if the queue is full.
    pub fn put(&self, msg: BroadcastMessage) -> PutOutcome {
        let mut msg = msg;
        let mut evicted = None;
        loop {
            match self.tx.try_send(msg) {
                Ok(()) => {
                    return match evicted {
                        Some(old) => PutOutcome::Evicted(old),
                        None => PutOutcome::Queued,
                    };
                }
                Err(TrySendError::Full(back)) => {
                    msg = back;
                    // A consumer may drain concurrently; an empty pop just retries
                    match self.rx.try_recv() {
                        Ok(old) => evicted = evicted.or(Some(old)),
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => return PutOutcome::Queued,
                    }
                }
                // Unreachable while `self.rx` is alive
                Err(TrySendError::Disconnected(_)) => return PutOutcome::Queued,
            }
        }
    }

    /// Wait up to `timeout` for the next message. `None` means nothing arrived.
    pub fn get(&self, timeout: Duration) -> Option<BroadcastMessage> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_put_up_to_capacity_never_evicts() {
        let queue = EventQueue::new(30);
        for i in 0..30 {
            assert_eq!(queue.put(BroadcastMessage::heartbeat(i)), PutOutcome::Queued);
        }
        assert_eq!(queue.len(), 30);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = EventQueue::new(3);
        let msgs: Vec<_> = (0..5).map(BroadcastMessage::heartbeat).collect();

        for m in &msgs[..3] {
            assert_eq!(queue.put(m.clone()), PutOutcome::Queued);
        }
        assert_eq!(queue.put(msgs[3].clone()), PutOutcome::Evicted(msgs[0].clone()));
        assert_eq!(queue.put(msgs[4].clone()), PutOutcome::Evicted(msgs[1].clone()));

        let drained: Vec<_> = std::iter::from_fn(|| queue.get(Duration::ZERO)).collect();
        assert_eq!(drained, msgs[2..].to_vec());
    }

    #[test]
    fn test_get_is_fifo() {
        let queue = EventQueue::new(4);
        queue.put(BroadcastMessage::heartbeat(1));
        queue.put(BroadcastMessage::heartbeat(2));
        assert_eq!(queue.get(Duration::ZERO).unwrap().payload(), "1");
        assert_eq!(queue.get(Duration::ZERO).unwrap().payload(), "2");
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_get_times_out_empty() {
        let queue = EventQueue::new(1);
        let start = Instant::now();
        assert_eq!(queue.get(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_get_wakes_on_put() {
        let queue = std::sync::Arc::new(EventQueue::new(1));
        let producer = std::sync::Arc::clone(&queue);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.put(BroadcastMessage::heartbeat(9));
        });
        let got = queue.get(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(got.unwrap().payload(), "9");
    }

    #[test]
    fn test_zero_capacity_raised() {
        let queue = EventQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.put(BroadcastMessage::heartbeat(0)), PutOutcome::Queued);
    }
}
