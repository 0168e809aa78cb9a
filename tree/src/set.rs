use core::fmt;
use std::borrow::Borrow;

use crate::red_black_tree::{self, Cursor, RedBlackTree};

/// An ordered collection of unique keys.
///
/// Thin adapter over [`RedBlackTree`] with `()` values and unique
/// insertion. Lookup, iteration and erasure are O(log n).
pub struct Set<K> {
    tree: RedBlackTree<K, ()>,
}

impl<K> Set<K> {
    pub fn new() -> Self {
        Self {
            tree: RedBlackTree::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.tree.max_size()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Cursor at the smallest key, end when the set is empty.
    pub fn begin(&self) -> Cursor {
        self.tree.begin()
    }

    pub fn end(&self) -> Cursor {
        self.tree.end()
    }

    pub fn next(&self, cur: Cursor) -> Cursor {
        self.tree.next(cur)
    }

    pub fn prev(&self, cur: Cursor) -> Cursor {
        self.tree.prev(cur)
    }

    /// Key under the cursor, `None` at end.
    pub fn get(&self, cur: Cursor) -> Option<&K> {
        self.tree.get_at(cur).map(|(k, ())| k)
    }
}

impl<K: Ord> Set<K> {
    /// Inserts `key`, returning a cursor to it and whether it was new.
    /// When the key is already present nothing changes and the cursor
    /// addresses the existing element.
    pub fn insert(&mut self, key: K) -> (Cursor, bool) {
        let (id, inserted) = self.tree.insert(key, (), true);
        (self.tree.cursor_of(id), inserted)
    }

    /// Inserts every key from `keys`, returning per-key results in input
    /// order.
    pub fn insert_many<I>(&mut self, keys: I) -> Vec<(Cursor, bool)>
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().map(|key| self.insert(key)).collect()
    }

    /// Removes the key under the cursor and returns it. Erasing end is a
    /// no-op.
    pub fn erase(&mut self, cur: Cursor) -> Option<K> {
        self.tree.erase_at(cur).map(|(k, ())| k)
    }

    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.find_cursor(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.contains(key)
    }

    /// Moves the elements of `other` into `self`. Keys already present stay
    /// as they are and the incoming duplicates are dropped; `other` is left
    /// empty either way.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge_unique(&mut other.tree);
    }
}

impl<K> Default for Set<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> Clone for Set<K> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Set<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: PartialEq> PartialEq for Set<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq> Eq for Set<K> {}

impl<K: Ord> FromIterator<K> for Set<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for Set<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl<K: Ord> Extend<K> for Set<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

/// In-order iterator over a set's keys.
pub struct Iter<'a, K> {
    inner: red_black_tree::Iter<'a, K, ()>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, ())| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K> DoubleEndedIterator for Iter<'a, K> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, ())| k)
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<'a, K> IntoIterator for &'a Set<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut set = Set::new();
        assert!(set.is_empty());
        let (_, inserted) = set.insert(3);
        assert!(inserted);
        let (_, inserted) = set.insert(3);
        assert!(!inserted);
        set.insert(1);
        set.insert(2);
        assert_eq!(set.len(), 3);
        assert!(set.contains(&1));
        assert!(!set.contains(&5));
    }

    #[test]
    fn duplicate_insert_points_at_existing() {
        let mut set = Set::new();
        let (first, _) = set.insert(10);
        let (second, inserted) = set.insert(10);
        assert!(!inserted);
        assert_eq!(first, second);
        assert_eq!(set.get(second), Some(&10));
    }

    #[test]
    fn iteration_is_sorted() {
        let set: Set<i32> = [5, 1, 4, 2, 3].into();
        let items: Vec<i32> = set.iter().copied().collect();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn erase_by_find() {
        let mut set: Set<i32> = [1, 2, 3].into();
        assert_eq!(set.erase(set.find(&2)), Some(2));
        assert_eq!(set.erase(set.find(&2)), None);
        assert_eq!(set.len(), 2);
        // erasing end changes nothing
        assert_eq!(set.erase(set.end()), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn cursor_navigation() {
        let set: Set<i32> = [10, 20, 30].into();
        let mut cur = set.begin();
        assert_eq!(set.get(cur), Some(&10));
        cur = set.next(cur);
        assert_eq!(set.get(cur), Some(&20));
        cur = set.prev(cur);
        assert_eq!(set.get(cur), Some(&10));
        assert_eq!(set.get(set.prev(set.end())), Some(&30));
    }

    #[test]
    fn insert_many_reports_per_key() {
        let mut set = Set::new();
        set.insert(2);
        let results = set.insert_many([1, 2, 3]);
        let flags: Vec<bool> = results.iter().map(|(_, inserted)| *inserted).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn merge_drops_duplicates_and_drains_source() {
        let mut a: Set<i32> = [1, 2, 3].into();
        let mut b: Set<i32> = [3, 4].into();
        a.merge(&mut b);
        assert!(b.is_empty());
        let items: Vec<i32> = a.iter().copied().collect();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[test]
    fn swap_and_clear() {
        let mut a: Set<i32> = [1].into();
        let mut b: Set<i32> = [2, 3].into();
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        a.clear();
        assert!(a.is_empty());
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a: Set<i32> = [3, 1, 2].into();
        let b: Set<i32> = [1, 2, 3].into();
        assert_eq!(a, b);
        let c: Set<i32> = [1, 2].into();
        assert_ne!(a, c);
    }

    #[test]
    fn debug_output() {
        let set: Set<i32> = [2, 1].into();
        assert_eq!(format!("{set:?}"), "{1, 2}");
    }
}
