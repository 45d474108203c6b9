//! Fixed-capacity, insertion-ordered event history.
//!
//! Dashboard widgets that render "the last N events" poll a snapshot of
//! this buffer instead of reacting to each callback. The eviction policy
//! lives here once, rather than as ad-hoc slicing after every push.

use std::collections::VecDeque;

/// A bounded most-recent-N history with oldest-eviction.
///
/// Length never exceeds the configured capacity; insertion order is always
/// preserved among retained elements (oldest first). Consumers that want
/// newest-first reverse the snapshot themselves.
#[derive(Clone, Debug)]
pub struct RollingEventBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingEventBuffer<T> {
    /// Create a buffer holding at most `capacity` elements.
    ///
    /// A capacity of zero is clamped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an element, evicting the oldest if the buffer is full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            let _ = self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Number of retained elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate retained elements oldest-to-newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> RollingEventBuffer<T> {
    /// Retained elements oldest-to-newest.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_buffer() {
        let buf: RollingEventBuffer<u32> = RollingEventBuffer::new(3);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut buf = RollingEventBuffer::new(5);
        buf.push('a');
        buf.push('b');
        assert_eq!(buf.snapshot(), vec!['a', 'b']);
    }

    #[test]
    fn overflow_evicts_oldest() {
        // Capacity 3; A, B, C, D pushed in order → [B, C, D].
        let mut buf = RollingEventBuffer::new(3);
        for c in ['A', 'B', 'C', 'D'] {
            buf.push(c);
        }
        assert_eq!(buf.snapshot(), vec!['B', 'C', 'D']);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let mut buf = RollingEventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.snapshot(), vec![2]);
    }

    #[test]
    fn iter_matches_snapshot() {
        let mut buf = RollingEventBuffer::new(4);
        for n in 0..6 {
            buf.push(n);
        }
        let via_iter: Vec<i32> = buf.iter().copied().collect();
        assert_eq!(via_iter, buf.snapshot());
    }

    proptest! {
        #[test]
        fn retains_exactly_last_k_in_order(
            capacity in 1_usize..64,
            pushes in proptest::collection::vec(0_u32..1000, 0..200),
        ) {
            let mut buf = RollingEventBuffer::new(capacity);
            for &n in &pushes {
                buf.push(n);
            }
            let expected: Vec<u32> = pushes
                .iter()
                .skip(pushes.len().saturating_sub(capacity))
                .copied()
                .collect();
            prop_assert_eq!(buf.snapshot(), expected);
            prop_assert!(buf.len() <= capacity);
        }
    }
}
