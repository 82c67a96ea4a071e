//! Blocking FIFO between the import workers and the render thread.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Mutex + condvar FIFO.
///
/// Unbounded by default. With a capacity, `push` blocks while the queue is
/// full so a burst of import workers cannot outrun the consumer.
#[derive(Debug)]
pub struct ThreadSafeQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> Default for ThreadSafeQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> ThreadSafeQueue<T> {
    pub fn unbounded() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    /// A capacity of zero is treated as one.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::unbounded()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[inline]
    fn is_full(&self, items: &VecDeque<T>) -> bool {
        self.capacity.map_or(false, |cap| items.len() >= cap)
    }

    /// Appends `item`, waiting for room if the queue is bounded and full.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        while self.is_full(&items) {
            self.not_full.wait(&mut items);
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Appends `item` unless the queue is full, in which case it is handed back.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if self.is_full(&items) {
            return Err(item);
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, waiting until there is one.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut items);
        }
    }

    /// Removes the oldest item if there is one.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Like [`ThreadSafeQueue::pop`] but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if items.is_empty() {
            self.not_empty.wait_while_for(&mut items, |items| items.is_empty(), timeout);
        }
        let item = items.pop_front();
        drop(items);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Point-in-time snapshot; may be stale by the time the caller acts.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }
}
