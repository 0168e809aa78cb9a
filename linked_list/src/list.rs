use core::marker::PhantomData;
use core::ptr::NonNull;
use core::{fmt, mem};

/// A doubly linked list.
///
/// `push`/`pop` at either end are O(1); index-based access walks from the
/// head and is O(n). Out-of-range `insert` hands the value back in the
/// error; out-of-range `erase` is a no-op.
pub struct List<T> {
    // Head and tail can only be None both at once (when count == 0).
    // If count == 1 both point to the same item.
    head_tail: Option<HeadTail<T>>,
    count: usize,
    marker: PhantomData<T>,
}

struct HeadTail<T> {
    head: NonNull<Node<T>>,
    tail: NonNull<Node<T>>,
}

struct Node<T> {
    data: T,
    next: Option<NonNull<Node<T>>>,
    prev: Option<NonNull<Node<T>>>,
}

impl<T> fmt::Debug for List<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("count", &self.count)
            .field(
                "items",
                &DebugNodes {
                    node: self.head_ptr(),
                },
            )
            .finish()
    }
}

struct DebugNodes<T> {
    node: Option<NonNull<Node<T>>>,
}

impl<T> fmt::Debug for DebugNodes<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmt = f.debug_list();

        let mut maybe_current = self.node;
        while let Some(current) = maybe_current {
            let data = unsafe { &(*current.as_ptr()).data };
            fmt.entry(data);
            maybe_current = unsafe { (*current.as_ptr()).next };
        }

        fmt.finish()
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        if let Some(HeadTail { head, .. }) = self.head_tail.as_mut() {
            let mut current = *head;

            loop {
                let c = unsafe { Box::from_raw(current.as_ptr()) };
                let Node { next, .. } = *c;
                match next {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
    }
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self {
            head_tail: None,
            count: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn tail_ptr(&self) -> Option<NonNull<Node<T>>> {
        self.head_tail.as_ref().map(|a| a.tail)
    }

    fn head_ptr(&self) -> Option<NonNull<Node<T>>> {
        self.head_tail.as_ref().map(|a| a.head)
    }

    fn set_tail(&mut self, tail: NonNull<Node<T>>) {
        self.head_tail.as_mut().unwrap().tail = tail;
    }

    fn set_head(&mut self, head: NonNull<Node<T>>) {
        self.head_tail.as_mut().unwrap().head = head
    }

    pub fn push_back(&mut self, val: T) {
        let new = Node {
            data: val,
            next: None,
            prev: self.tail_ptr(),
        };

        let new = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(new))) };
        match &mut self.head_tail {
            Some(HeadTail { tail, .. }) => {
                unsafe { (*tail.as_ptr()).next = Some(new) };
                *tail = new;
            }
            None => {
                debug_assert_eq!(self.count, 0);
                self.head_tail = Some(HeadTail {
                    head: new,
                    tail: new,
                });
            }
        }

        self.count += 1;
    }

    pub fn push_front(&mut self, val: T) {
        let new = Node {
            data: val,
            next: self.head_ptr(),
            prev: None,
        };
        let new = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(new))) };
        match &mut self.head_tail {
            Some(HeadTail { head, .. }) => {
                unsafe { (*head.as_ptr()).prev = Some(new) };
                *head = new;
            }
            None => {
                debug_assert_eq!(self.count, 0);
                self.head_tail = Some(HeadTail {
                    head: new,
                    tail: new,
                });
            }
        }

        self.count += 1;
    }

    /// Inserts `val` before position `index`. `index == len` appends; past
    /// the end the value comes back in the error.
    pub fn insert(&mut self, index: usize, val: T) -> Result<(), T> {
        match index {
            0 => self.push_front(val),
            i if i == self.count => self.push_back(val),
            _ => {
                let Some(current) = self.get_raw(index) else {
                    return Err(val);
                };
                // not head and not past the end, so a prev node exists
                let prev = unsafe { (*current.as_ptr()).prev.unwrap() };

                let new = Node {
                    data: val,
                    next: Some(current),
                    prev: Some(prev),
                };
                let new = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(new))) };

                unsafe { (*current.as_ptr()).prev = Some(new) };
                unsafe { (*prev.as_ptr()).next = Some(new) }

                self.count += 1;
            }
        }
        Ok(())
    }

    /// # SAFETY
    ///
    /// `val` must be a node owned by this list; it is freed here and must
    /// never be dereferenced again.
    unsafe fn remove_raw(&mut self, val: NonNull<Node<T>>) -> T {
        let val = unsafe { Box::from_raw(val.as_ptr()) };
        let Node { data, next, prev } = *val;
        match (prev, next) {
            (None, None) => {
                // only item
                debug_assert_eq!(self.count, 1);
                self.head_tail = None;
            }
            (Some(prev), Some(next)) => {
                // middle
                unsafe {
                    (*prev.as_ptr()).next = Some(next);
                    (*next.as_ptr()).prev = Some(prev);
                }
            }
            (Some(prev), None) => {
                // tail
                unsafe { (*prev.as_ptr()).next = None };
                self.set_tail(prev);
            }
            (None, Some(next)) => {
                // head
                unsafe { (*next.as_ptr()).prev = None };
                self.set_head(next);
            }
        }

        self.count -= 1;
        data
    }

    /// Removes the element at position `index`. Out of range is a no-op
    /// returning `None`.
    pub fn erase(&mut self, index: usize) -> Option<T> {
        self.get_raw(index)
            .map(|node| unsafe { self.remove_raw(node) })
    }

    pub fn pop_back(&mut self) -> Option<T> {
        match self.head_tail.as_mut() {
            Some(HeadTail { tail, .. }) => {
                let tail = *tail;
                Some(unsafe { self.remove_raw(tail) })
            }
            None => None,
        }
    }

    pub fn pop_front(&mut self) -> Option<T> {
        match self.head_tail.as_mut() {
            Some(HeadTail { head, .. }) => {
                let head = *head;
                Some(unsafe { self.remove_raw(head) })
            }
            None => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.get_raw(index).map(|a| unsafe { &(*a.as_ptr()).data })
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.get_raw(index)
            .map(|a| unsafe { &mut (*a.as_ptr()).data })
    }

    pub fn front(&self) -> Option<&T> {
        self.head_tail
            .as_ref()
            .map(|ht| unsafe { &(*ht.head.as_ptr()).data })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.head_tail
            .as_ref()
            .map(|ht| unsafe { &mut (*ht.head.as_ptr()).data })
    }

    pub fn back(&self) -> Option<&T> {
        self.head_tail
            .as_ref()
            .map(|ht| unsafe { &(*ht.tail.as_ptr()).data })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.head_tail
            .as_ref()
            .map(|ht| unsafe { &mut (*ht.tail.as_ptr()).data })
    }

    /// Drops every element, front to back, without recursion.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// O(1) exchange of the entire contents with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.head_tail, &mut other.head_tail);
        mem::swap(&mut self.count, &mut other.count);
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            node: self.head_ptr(),
            remaining: self.count,
            marker: PhantomData,
        }
    }

    fn get_raw(&self, index: usize) -> Option<NonNull<Node<T>>> {
        if index >= self.count {
            return None;
        }

        let mut current = self.head_ptr().unwrap();
        for _ in 0..index {
            current = unsafe { (*current.as_ptr()).next.unwrap() };
        }

        Some(current)
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for List<T> {
    fn clone(&self) -> Self {
        let mut list = Self::new();
        for item in self.iter() {
            list.push_back(item.clone());
        }
        list
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq> Eq for List<T> {}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.push_back(item);
        }
        list
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T, const N: usize> From<[T; N]> for List<T> {
    fn from(items: [T; N]) -> Self {
        items.into_iter().collect()
    }
}

/// Front-to-back iterator over a list's elements.
pub struct Iter<'a, T> {
    node: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.node?;
        // SAFETY: the node belongs to the list the iterator borrows, so it
        // stays alive for 'a and nobody mutates it while we hold the borrow
        let node = unsafe { &*current.as_ptr() };
        self.node = node.next;
        self.remaining -= 1;
        Some(&node.data)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_erase_by_index() {
        let mut list = List::new();

        list.push_back(5);
        list.push_back(6);
        list.push_front(8);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![8, 5, 6]);

        list.insert(0, 11).unwrap();
        assert_eq!(list.erase(0), Some(11));
        assert_eq!(list.erase(1), Some(5));
        assert_eq!(list.erase(1), Some(6));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![8]);

        list.push_front(9);
        assert_eq!(list.erase(0), Some(9));
        assert_eq!(list.pop_front(), Some(8));
        assert!(list.is_empty());
    }

    #[test]
    fn test_basic_front() {
        let mut list = List::new();

        // Try to break an empty list
        assert_eq!(list.len(), 0);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.len(), 0);

        // Try to break a one item list
        list.push_front(10);
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_front(), Some(10));
        assert_eq!(list.len(), 0);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.len(), 0);

        // Mess around
        list.push_front(10);
        assert_eq!(list.len(), 1);
        list.push_front(20);
        assert_eq!(list.len(), 2);
        list.push_front(30);
        assert_eq!(list.len(), 3);
        assert_eq!(list.pop_front(), Some(30));
        assert_eq!(list.len(), 2);
        list.push_front(40);
        assert_eq!(list.len(), 3);
        assert_eq!(list.pop_front(), Some(40));
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_front(), Some(20));
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_front(), Some(10));
        assert_eq!(list.len(), 0);
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn test_basic() {
        let mut m = List::new();
        assert_eq!(m.pop_front(), None);
        assert_eq!(m.pop_back(), None);
        m.push_front(1);
        assert_eq!(m.pop_front(), Some(1));
        m.push_back(2);
        m.push_back(3);
        assert_eq!(m.len(), 2);
        assert_eq!(m.pop_front(), Some(2));
        assert_eq!(m.pop_front(), Some(3));
        assert_eq!(m.len(), 0);
        assert_eq!(m.pop_front(), None);

        let mut n = List::new();
        n.push_front(2);
        n.push_front(3);
        {
            assert_eq!(n.front().unwrap(), &3);
            let x = n.front_mut().unwrap();
            assert_eq!(*x, 3);
            *x = 0;
        }
        {
            assert_eq!(n.back().unwrap(), &2);
            let y = n.back_mut().unwrap();
            assert_eq!(*y, 2);
            *y = 1;
        }
        assert_eq!(n.pop_front(), Some(0));
        assert_eq!(n.pop_front(), Some(1));
    }

    #[test]
    fn insert_out_of_range_returns_value() {
        let mut list: List<i32> = [1, 2].into();
        assert_eq!(list.insert(5, 9), Err(9));
        assert_eq!(list.len(), 2);
        list.insert(1, 9).unwrap();
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 9, 2]);
    }

    #[test]
    fn erase_out_of_range_is_noop() {
        let mut list: List<i32> = [1].into();
        assert_eq!(list.erase(3), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn clear_and_swap() {
        let mut a: List<i32> = [1, 2, 3].into();
        let mut b: List<i32> = [9].into();
        a.swap(&mut b);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 3);
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.pop_back(), None);
    }

    #[test]
    fn clone_and_eq() {
        let a: List<i32> = [1, 2, 3].into();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.push_back(4);
        assert_ne!(a, b);
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn drops_owned_values() {
        let mut list = List::new();
        list.push_back(String::from("a"));
        list.push_back(String::from("b"));
        list.pop_front();
        // remaining node is freed by Drop
    }

    mod proptests {
        use std::collections::VecDeque;

        use proptest::prelude::*;

        use super::*;

        proptest!(
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn behaves_like_vec_deque(
                ops in proptest::collection::vec((0u8..6, any::<i32>(), 0usize..20), 0..200),
            ) {
                let mut list = List::new();
                let mut reference = VecDeque::new();
                for (op, val, index) in ops {
                    match op {
                        0 => {
                            list.push_back(val);
                            reference.push_back(val);
                        }
                        1 => {
                            list.push_front(val);
                            reference.push_front(val);
                        }
                        2 => {
                            prop_assert_eq!(list.pop_back(), reference.pop_back());
                        }
                        3 => {
                            prop_assert_eq!(list.pop_front(), reference.pop_front());
                        }
                        4 => {
                            if index <= reference.len() {
                                prop_assert!(list.insert(index, val).is_ok());
                                reference.insert(index, val);
                            } else {
                                prop_assert_eq!(list.insert(index, val), Err(val));
                            }
                        }
                        _ => {
                            prop_assert_eq!(list.erase(index), reference.remove(index));
                        }
                    }
                    prop_assert_eq!(list.len(), reference.len());
                    prop_assert_eq!(list.front(), reference.front());
                    prop_assert_eq!(list.back(), reference.back());
                }

                let items: Vec<i32> = list.iter().copied().collect();
                let expected: Vec<i32> = reference.iter().copied().collect();
                prop_assert_eq!(items, expected);
            }
        );
    }
}
