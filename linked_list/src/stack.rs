use core::fmt;

use vec::Vector;

/// LIFO stack layered over [`Vector`].
///
/// Only the top of the underlying storage is reachable; there is no index
/// access and no iteration.
pub struct Stack<T> {
    items: Vector<T>,
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self {
            items: Vector::new(),
        }
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

    /// Removes and returns the most recently pushed element. Popping an
    /// empty stack is a no-op returning `None`.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    /// The most recently pushed element.
    pub fn top(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn top_mut(&mut self) -> Option<&mut T> {
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

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Stack<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("count", &self.len())
            .field("items", &self.items.as_slice())
            .finish()
    }
}

impl<T> FromIterator<T> for Stack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stack = Self::new();
        stack.push_many(iter);
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = Stack::new();
        assert!(stack.is_empty());
        stack.push(5);
        stack.push(6);
        assert_eq!(stack.pop(), Some(6));
        stack.push(7);
        assert_eq!(stack.pop(), Some(7));
        assert_eq!(stack.pop(), Some(5));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn top_tracks_last_push() {
        let mut stack = Stack::new();
        assert_eq!(stack.top(), None);
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.top(), Some(&2));
        *stack.top_mut().unwrap() = 20;
        assert_eq!(stack.pop(), Some(20));
        assert_eq!(stack.top(), Some(&1));
    }

    #[test]
    fn push_many_pops_in_reverse() {
        let mut stack = Stack::new();
        stack.push_many([1, 2, 3]);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
    }

    #[test]
    fn swap() {
        let mut a: Stack<i32> = [1, 2].into_iter().collect();
        let mut b: Stack<i32> = [9].into_iter().collect();
        a.swap(&mut b);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(a.top(), Some(&9));
    }
}
