//! Fixed-capacity, newest-first store
//!
//! `RingStore` keeps at most `capacity` items ordered from newest (index 0)
//! to oldest. Every mutation renumbers the items so that their `index`
//! fields always read `0..len` without gaps.
//!
//! The store is not synchronized. Owners wrap it in a lock and take the
//! write side for `load_all`/`push_front` and the read side for lookups.

use std::collections::VecDeque;

use crate::model::Indexed;

/// Bounded, index-addressable container with newest-first ordering
#[derive(Debug, Clone)]
pub struct RingStore<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Indexed> RingStore<T> {
    /// Create an empty store holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Maximum number of items kept after a push
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the whole contents, keeping the given order.
    ///
    /// The first item becomes index 0. Nothing is truncated here: callers
    /// pre-limit bulk loads, usually through the fetch limit.
    pub fn load_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.items = items.into_iter().collect();
        self.reindex();
    }

    /// Insert `item` as the newest entry, evicting the oldest when full
    pub fn push_front(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
        self.reindex();
    }

    /// Bounds-checked lookup
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    fn reindex(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.set_index(i);
        }
    }
}
