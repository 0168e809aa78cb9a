use core::fmt;

use crate::list::List;

/// FIFO queue layered over [`List`].
///
/// Elements leave in the order they were pushed; only the two ends are
/// reachable.
pub struct Queue<T> {
    items: List<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self { items: List::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, val: T) {
        self.items.push_back(val);
    }

    /// Removes and returns the oldest element. Popping an empty queue is a
    /// no-op returning `None`.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// The oldest element, next in line to be popped.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// The most recently pushed element.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    pub fn push_many<I>(&mut self, vals: I)
    where
        I: IntoIterator<Item = T>,
    {
        for val in vals {
            self.push(val);
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.items.swap(&mut other.items);
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("count", &self.len())
            .field("items", &self.items)
            .finish()
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.push_many(iter);
        queue
    }
}
