use std::collections::VecDeque;
use std::fmt;

/// Fixed-capacity FIFO ring of owned items.
///
/// Both `push` and `pop` are single non-blocking probes: a full queue rejects
/// the new item and leaves its storage untouched, an empty queue yields
/// nothing. The queue does no locking of its own; see
/// [`SharedQueue`](crate::shared_queue::SharedQueue) for the thread-safe pairing.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap,
        }
    }

    /// Stores a copy of `item` so the caller can reuse its buffer right away.
    #[inline]
    pub fn push(&mut self, item: &T) -> bool
    where
        T: Clone,
    {
        if self.is_full() {
            return false;
        }

        self.deque.push_back(item.clone());

        true
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.deque.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    /// Oldest item first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_fifo_order() {
        let mut queue = CircularQueue::with_capacity(4);

        for i in 0..4 {
            assert!(queue.push(&i));
        }

        let drained: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn rejects_push_when_full() {
        let mut queue = CircularQueue::with_capacity(3);

        assert!(queue.push(&"a"));
        assert!(queue.push(&"b"));
        assert!(queue.push(&"c"));
        assert!(queue.is_full());

        assert!(!queue.push(&"d"));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn pop_on_empty_yields_nothing() {
        let mut queue: CircularQueue<u8> = CircularQueue::with_capacity(2);
        assert_eq!(queue.pop(), None);

        queue.push(&7);
        assert_eq!(queue.pop(), Some(7));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn wraps_around_after_partial_drain() {
        let mut queue = CircularQueue::with_capacity(3);

        queue.push(&1);
        queue.push(&2);
        queue.push(&3);
        assert_eq!(queue.pop(), Some(1));
        assert!(queue.push(&4));
        assert!(!queue.push(&5));

        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), Some(4));
        assert_eq!(queue.capacity(), 3);
    }

    #[test]
    fn stored_item_is_independent_of_producer_buffer() {
        let mut queue = CircularQueue::with_capacity(2);
        let mut buf = vec![1u8, 2, 3];

        queue.push(&buf);
        buf.iter_mut().for_each(|b| *b = 0);

        assert_eq!(queue.pop(), Some(vec![1, 2, 3]));
    }
}
