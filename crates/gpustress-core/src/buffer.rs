//! Bounded Sample Buffers
//!
//! Fixed-capacity FIFO windows used for frame samples, hardware snapshots and
//! the performance log. Appending past capacity evicts the oldest item; order
//! is never changed. Synchronisation is the owner's job (see `telemetry`).

use std::collections::VecDeque;

/// Frame-time window capacity
pub const FRAME_BUFFER_CAPACITY: usize = 1_000;
/// Hardware snapshot window capacity
pub const SNAPSHOT_BUFFER_CAPACITY: usize = 1_000;
/// Performance log capacity
pub const PERFORMANCE_LOG_CAPACITY: usize = 10_000;

/// Fixed-capacity FIFO-evicting sequence
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item, returning the evicted oldest item on overflow
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Most recently appended item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterates oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Point-in-time copy, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Copy of the newest `n` items, oldest first
    pub fn tail(&self, n: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
