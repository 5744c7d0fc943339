//! Fixed-capacity FIFO ring buffer.
//!
//! Storage is allocated once; once full, each push overwrites the oldest
//! slot. Logical index 0 is always the oldest element.

#[derive(Debug, Clone)]
pub struct RowRing<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Physical index of the oldest element once the buffer has wrapped.
    head: usize,
}

impl<T> RowRing<T> {
    /// `capacity` must be >= 1; callers validate before constructing.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Append an element, returning the evicted oldest one when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    fn physical(&self, index: usize) -> usize {
        (self.head + index) % self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.slots.len() {
            return None;
        }
        self.slots.get(self.physical(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.slots.len() {
            return None;
        }
        let physical = self.physical(index);
        self.slots.get_mut(physical)
    }

    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.slots.len()).map(move |i| &self.slots[self.physical(i)])
    }
}
