//! Bounded intent queue shared between the scan loop and the consumer.

use crate::intent::Intent;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// Default number of pending intents before new ones are dropped.
///
/// Without a cap, a few held directional inputs could queue thousands of
/// unprocessed repeats for a slow consumer.
pub const DEFAULT_CAPACITY: usize = 8;

/// Bounded FIFO of intents, safe for one producer plus one consumer (who
/// may also clear it at any time).
///
/// Overflow drops the incoming intent rather than blocking the scan loop;
/// an empty queue pops [`Intent::None`].
pub struct IntentQueue {
    pending: Mutex<VecDeque<Intent>>,
    capacity: usize,
}

impl IntentQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueues an intent, silently dropping it when the queue is full.
    pub fn push(&self, intent: Intent) {
        let mut pending = self.lock();
        if pending.len() < self.capacity {
            pending.push_back(intent);
        } else {
            debug!(%intent, "intent queue full, dropping");
        }
    }

    /// Pops the oldest queued intent, or [`Intent::None`] when empty.
    pub fn pop(&self) -> Intent {
        self.lock().pop_front().unwrap_or(Intent::None)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A poisoned lock only means the other side panicked mid-operation on
    /// a `VecDeque` of `Copy` values; the queue content is still valid.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Intent>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for IntentQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn pops_in_fifo_order() {
        let queue = IntentQueue::default();
        queue.push(Intent::Up);
        queue.push(Intent::Confirm);
        queue.push(Intent::Down);

        assert_eq!(queue.pop(), Intent::Up);
        assert_eq!(queue.pop(), Intent::Confirm);
        assert_eq!(queue.pop(), Intent::Down);
        assert_eq!(queue.pop(), Intent::None);
    }

    #[test]
    fn overflow_drops_newest() {
        let queue = IntentQueue::new(DEFAULT_CAPACITY);
        for _ in 0..DEFAULT_CAPACITY {
            queue.push(Intent::Left);
        }
        queue.push(Intent::Confirm);

        assert_eq!(queue.len(), DEFAULT_CAPACITY);
        for _ in 0..DEFAULT_CAPACITY {
            assert_eq!(queue.pop(), Intent::Left);
        }
        assert_eq!(queue.pop(), Intent::None);
    }

    #[test]
    fn clear_empties_immediately() {
        let queue = IntentQueue::default();
        queue.push(Intent::Up);
        queue.push(Intent::Down);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), Intent::None);
    }

    #[test]
    fn concurrent_producer_and_clearing_consumer() {
        let queue = Arc::new(IntentQueue::default());
        let producer_queue = queue.clone();

        let producer = std::thread::spawn(move || {
            for _ in 0..10_000 {
                producer_queue.push(Intent::Right);
            }
        });

        for _ in 0..1_000 {
            queue.pop();
            queue.clear();
        }

        producer.join().unwrap();
        assert!(queue.len() <= DEFAULT_CAPACITY);
    }
}
