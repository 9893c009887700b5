//! Thread hand-off built on [`CircularQueue`].
//!
//! Every `SharedQueue` owns exactly one mutex guarding exactly one queue. The
//! lock is held only for a single probe, never across I/O or a sleep. Callers
//! that must wait use the `*_until` retry loops, which re-check the
//! [`Shutdown`] flag on every iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::circular_queue::CircularQueue;
use crate::config::QueueConfig;

/// Cancellation flag shared by every loop of a pipeline or server.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SharedQueue<T> {
    inner: Mutex<CircularQueue<T>>,
    retry_interval: Duration,
}

impl<T> SharedQueue<T> {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(CircularQueue::with_capacity(config.capacity)),
            retry_interval: config.retry_interval,
        }
    }

    // The guarded data is plain items and indices, so a panic elsewhere
    // cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, CircularQueue<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Single probe: copies `item` in, or returns `false` when full.
    #[inline]
    pub fn try_push(&self, item: &T) -> bool
    where
        T: Clone,
    {
        self.lock().push(item)
    }

    /// Single probe: takes the oldest item, or `None` when empty.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop()
    }

    /// Retries `try_push` until it succeeds or `shutdown` is triggered.
    pub fn push_until(&self, item: &T, shutdown: &Shutdown) -> bool
    where
        T: Clone,
    {
        loop {
            if self.try_push(item) {
                return true;
            }

            if shutdown.is_triggered() {
                return false;
            }

            thread::sleep(self.retry_interval);
        }
    }

    /// Retries `try_pop` until an item arrives or `shutdown` is triggered.
    ///
    /// Once `shutdown` is triggered nothing more is handed out, even if items
    /// are still queued.
    pub fn pop_until(&self, shutdown: &Shutdown) -> Option<T> {
        loop {
            if shutdown.is_triggered() {
                return None;
            }

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            thread::sleep(self.retry_interval);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn queue<T>(capacity: usize) -> SharedQueue<T> {
        SharedQueue::new(QueueConfig::default().capacity(capacity))
    }

    #[test]
    fn probes_do_not_block() {
        let q = queue::<u32>(1);

        assert_eq!(q.try_pop(), None);
        assert!(q.try_push(&1));
        assert!(!q.try_push(&2));
        assert_eq!(q.len(), 1);
        assert_eq!(q.try_pop(), Some(1));
    }

    #[test]
    fn pop_until_returns_on_shutdown() {
        let q = Arc::new(queue::<u32>(4));
        let shutdown = Shutdown::new();

        let waiter = {
            let q = Arc::clone(&q);
            let shutdown = shutdown.clone();
            thread::spawn(move || q.pop_until(&shutdown))
        };

        thread::sleep(Duration::from_millis(20));
        shutdown.trigger();

        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn pop_until_leaves_queued_items_after_shutdown() {
        let q = queue::<u32>(4);
        let shutdown = Shutdown::new();
        assert!(q.try_push(&1));
        assert!(q.try_push(&2));

        shutdown.trigger();

        assert_eq!(q.pop_until(&shutdown), None);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn push_until_gives_up_on_shutdown_when_full() {
        let q = queue::<u32>(1);
        let shutdown = Shutdown::new();
        assert!(q.try_push(&1));

        shutdown.trigger();
        let started = Instant::now();
        assert!(!q.push_until(&2, &shutdown));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(q.try_pop(), Some(1));
    }

    #[test]
    fn hands_items_across_threads_in_order() {
        let q = Arc::new(queue::<u32>(4));
        let shutdown = Shutdown::new();

        let producer = {
            let q = Arc::clone(&q);
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    assert!(q.push_until(&i, &shutdown));
                }
            })
        };

        let received: Vec<u32> = (0..100).filter_map(|_| q.pop_until(&shutdown)).collect();
        producer.join().unwrap();

        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }
}
