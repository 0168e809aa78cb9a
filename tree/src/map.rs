use core::fmt;
use std::borrow::Borrow;
use std::error::Error;

use crate::red_black_tree::{Cursor, Iter, RedBlackTree};

/// Error returned by [`Map::at`] for a key that is not in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found in map")
    }
}

impl Error for KeyNotFound {}

/// An ordered key-value map with unique keys.
///
/// Entries are ordered by key alone; the value plays no part in comparisons.
/// Backed by the same [`RedBlackTree`] engine as [`Set`] and [`MultiSet`].
///
/// [`Set`]: crate::Set
/// [`MultiSet`]: crate::MultiSet
pub struct Map<K, V> {
    tree: RedBlackTree<K, V>,
}

impl<K, V> Map<K, V> {
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

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
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

    /// Entry under the cursor, `None` at end.
    pub fn get_at(&self, cur: Cursor) -> Option<(&K, &V)> {
        self.tree.get_at(cur)
    }

    pub fn get_at_mut(&mut self, cur: Cursor) -> Option<(&K, &mut V)> {
        self.tree.get_at_mut(cur)
    }

    /// In-order visit of every entry with a mutable value reference.
    pub fn for_each_mut<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V),
    {
        self.tree.for_each_mut(f);
    }
}

impl<K: Ord, V> Map<K, V> {
    /// Inserts the entry, returning a cursor to the key and whether a new
    /// entry was created. An already-present key rejects the insertion and
    /// keeps its current value.
    pub fn insert(&mut self, key: K, value: V) -> (Cursor, bool) {
        let (id, inserted) = self.tree.insert(key, value, true);
        (self.tree.cursor_of(id), inserted)
    }

    /// Like [`insert`], but an already-present key gets the new value
    /// instead of keeping the old one.
    ///
    /// [`insert`]: Map::insert
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Cursor, bool) {
        let (id, inserted) = self.tree.insert_or_assign(key, value);
        (self.tree.cursor_of(id), inserted)
    }

    /// Inserts every entry from `entries`, returning per-entry results in
    /// input order.
    pub fn insert_many<I>(&mut self, entries: I) -> Vec<(Cursor, bool)>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries
            .into_iter()
            .map(|(key, value)| self.insert(key, value))
            .collect()
    }

    /// Checked access: the value for `key`, or [`KeyNotFound`].
    pub fn at<Q>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.get(key).map(|(_, v)| v).ok_or(KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.get_mut(key).map(|(_, v)| v).ok_or(KeyNotFound)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.get(key).map(|(_, v)| v)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.tree.get_mut(key).map(|(_, v)| v)
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

    /// Removes the entry under the cursor. Erasing end is a no-op.
    pub fn erase(&mut self, cur: Cursor) -> Option<(K, V)> {
        self.tree.erase_at(cur)
    }

    /// Moves the entries of `other` into `self`. Entries whose key is
    /// already present are dropped; `other` is left empty either way.
    pub fn merge(&mut self, other: &mut Self) {
        self.tree.merge_unique(&mut other.tree);
    }
}

impl<K: Ord, V: Default> Map<K, V> {
    /// Value for `key`, inserting a default-constructed value first when the
    /// key is absent. The unchecked-access counterpart of [`at_mut`].
    ///
    /// [`at_mut`]: Map::at_mut
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V {
        // only build the default on the insert path
        let id = match self.tree.find(&key) {
            Some(id) => id,
            None => self.tree.insert(key, V::default(), true).0,
        };
        let cur = self.tree.cursor_of(id);
        // the entry was either found or just created
        self.tree.get_at_mut(cur).unwrap().1
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for Map<K, V> {}

impl<K: Ord, V> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for Map<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Ord, V> Extend<(K, V)> for Map<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
