use core::fmt;
use std::borrow::Borrow;

use crate::red_black_tree::{self, Cursor, RedBlackTree};
use crate::set::Set;

/// An ordered collection of keys where equal keys may repeat.
///
/// Same engine as [`Set`], but insertion never rejects: equal keys are kept
/// adjacent in the in-order sequence, so a run of duplicates can be walked
/// with [`equal_range`] or counted in O(log n + matches) with [`count`].
///
/// [`equal_range`]: MultiSet::equal_range
/// [`count`]: MultiSet::count
pub struct MultiSet<K> {
    tree: RedBlackTree<K, ()>,
}

impl<K> MultiSet<K> {
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

    pub fn get(&self, cur: Cursor) -> Option<&K> {
        self.tree.get_at(cur).map(|(k, ())| k)
    }
}

impl<K: Ord> MultiSet<K> {
    /// Inserts `key` unconditionally and returns a cursor to the new
    /// element.
    pub fn insert(&mut self, key: K) -> Cursor {
        let (id, _) = self.tree.insert(key, (), false);
        self.tree.cursor_of(id)
    }

    /// Inserts every key from `keys`, returning cursors in input order.
    pub fn insert_many<I>(&mut self, keys: I) -> Vec<Cursor>
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().map(|key| self.insert(key)).collect()
    }

    /// Removes the single element under the cursor; other elements with an
    /// equal key stay. Erasing end is a no-op.
    pub fn erase(&mut self, cur: Cursor) -> Option<K> {
        self.tree.erase_at(cur).map(|(k, ())| k)
    }

    /// Cursor to some element equal to `key`, end when absent. With
    /// duplicates present any one of them may be returned; use
    /// [`equal_range`] to see the whole run.
    ///
    /// [`equal_range`]: MultiSet::equal_range
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

    /// Number of elements equal to `key`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.count(key)
    }

    /// First element not less than `key`, end when every element is
    /// smaller.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        Cursor::new(self.tree.lower_bound(key))
    }

    /// First element strictly greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        Cursor::new(self.tree.upper_bound(key))
    }

    /// Half-open cursor range covering every element equal to `key`.
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor, Cursor)
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        let (low, high) = self.tree.equal_range(key);
        (Cursor::new(low), Cursor::new(high))
    }

    /// Moves every element of `other` into `self`, duplicates included.
    /// `other` is left empty.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge(&mut other.tree);
    }
}

impl<K> Default for MultiSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> Clone for MultiSet<K> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for MultiSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: PartialEq> PartialEq for MultiSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq> Eq for MultiSet<K> {}

impl<K: Ord> FromIterator<K> for MultiSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for MultiSet<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl<K: Ord> Extend<K> for MultiSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + Clone> From<&Set<K>> for MultiSet<K> {
    fn from(set: &Set<K>) -> Self {
        set.iter().cloned().collect()
    }
}

/// In-order iterator over a multiset's keys, duplicates included.
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

impl<'a, K> IntoIterator for &'a MultiSet<K> {
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
    fn duplicates_are_kept_and_counted() {
        let ms: MultiSet<i32> =
            [2, -3, 20, -5, 1, -6, 8, 42, 26, 1, 1, 1, 8, 8, 8].into();
        assert_eq!(ms.len(), 15);
        assert_eq!(ms.count(&1), 4);
        assert_eq!(ms.count(&8), 4);
        assert_eq!(ms.count(&42), 1);
        assert_eq!(ms.count(&7), 0);
    }

    #[test]
    fn lower_bound_then_step_back() {
        let ms: MultiSet<i32> = [2, -3, 20, -5, 1, -6, 8, 42, 26, 1, 1, 1].into();
        // first element >= 8 is 8 itself; stepping back from it lands on 2
        let cur = ms.lower_bound(&8);
        assert_eq!(ms.get(cur), Some(&8));
        let back = ms.prev(cur);
        assert_eq!(ms.get(back), Some(&2));
    }

    #[test]
    fn iteration_is_sorted_with_duplicates() {
        let ms: MultiSet<i32> = [3, 1, 3, 2, 1].into();
        let items: Vec<i32> = ms.iter().copied().collect();
        assert_eq!(items, vec![1, 1, 2, 3, 3]);
    }

    #[test]
    fn erase_removes_one_duplicate() {
        let mut ms: MultiSet<i32> = [5, 5, 5].into();
        assert_eq!(ms.erase(ms.find(&5)), Some(5));
        assert_eq!(ms.count(&5), 2);
        assert_eq!(ms.erase(ms.end()), None);
        assert_eq!(ms.len(), 2);
    }

    #[test]
    fn equal_range_walk() {
        let ms: MultiSet<i32> = [1, 3, 3, 3, 7].into();
        let (mut cur, stop) = ms.equal_range(&3);
        let mut run = Vec::new();
        while cur != stop {
            run.push(*ms.get(cur).unwrap());
            cur = ms.next(cur);
        }
        assert_eq!(run, vec![3, 3, 3]);

        // absent key: an empty range positioned at the next larger element
        let (low, high) = ms.equal_range(&5);
        assert_eq!(low, high);
        assert_eq!(ms.get(low), Some(&7));
    }

    #[test]
    fn bounds() {
        let ms: MultiSet<i32> = [2, 4, 4, 6].into();
        assert_eq!(ms.get(ms.lower_bound(&4)), Some(&4));
        assert_eq!(ms.get(ms.upper_bound(&4)), Some(&6));
        assert!(ms.lower_bound(&7).is_end());
    }

    #[test]
    fn insert_many_returns_cursor_per_key() {
        let mut ms = MultiSet::new();
        let cursors = ms.insert_many([4, 4, 1]);
        assert_eq!(cursors.len(), 3);
        assert_eq!(ms.get(cursors[2]), Some(&1));
        assert_eq!(ms.len(), 3);
    }

    #[test]
    fn merge_keeps_duplicates() {
        let mut a: MultiSet<i32> = [1, 2, 2].into();
        let mut b: MultiSet<i32> = [2, 3].into();
        a.merge(&mut b);
        assert!(b.is_empty());
        assert_eq!(a.count(&2), 3);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn from_set_copies_unique_keys() {
        let set: Set<i32> = [3, 1, 2].into();
        let ms = MultiSet::from(&set);
        let items: Vec<i32> = ms.iter().copied().collect();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
