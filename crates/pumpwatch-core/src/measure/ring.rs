//! Fixed-capacity ring of recent samples
//!
//! Storage is allocated once at construction. Once full, each push overwrites
//! the oldest slot and advances the head index, so iteration always yields
//! samples oldest first.

/// Fixed-capacity FIFO of the most recent samples
///
/// # Example
/// ```
/// use pumpwatch_core::measure::ring::SampleRing;
///
/// let mut ring = SampleRing::new(3);
/// for v in [1.0, 2.0, 3.0, 4.0] {
///     ring.push(v);
/// }
/// assert!(ring.is_full());
/// assert_eq!(ring.oldest(), Some(2.0));
/// assert_eq!(ring.newest(), Some(4.0));
/// assert_eq!(ring.mean(), Some(3.0));
/// ```
#[derive(Debug, Clone)]
pub struct SampleRing<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Index of the oldest sample once the ring has wrapped
    head: usize,
}

impl<T: Copy> SampleRing<T> {
    /// Create an empty ring holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained sample
    pub fn oldest(&self) -> Option<T> {
        self.slots.get(self.head).copied()
    }

    /// Most recently pushed sample
    pub fn newest(&self) -> Option<T> {
        if self.slots.is_empty() {
            return None;
        }
        let index = if self.is_full() {
            (self.head + self.capacity - 1) % self.capacity
        } else {
            self.slots.len() - 1
        };
        self.slots.get(index).copied()
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots[self.head..].iter().chain(self.slots[..self.head].iter())
    }

    /// Drop all samples, keeping the allocation
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl SampleRing<f64> {
    /// Arithmetic mean of the retained samples
    pub fn mean(&self) -> Option<f64> {
        if self.slots.is_empty() {
            None
        } else {
            Some(self.slots.iter().sum::<f64>() / self.slots.len() as f64)
        }
    }
}
