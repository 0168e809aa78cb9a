extern crate alloc as crate_alloc;

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::{fmt, mem, ptr, slice};

use crate_alloc::alloc;

use crate::Error;

/// A growable array with a raw heap buffer and doubling growth.
///
/// `push_back` is amortized O(1); index access is O(1); `insert` and
/// `erase` shift the tail and are O(n). Out-of-range checked access goes
/// through [`at`], which reports [`Error::OutOfBounds`] instead of
/// panicking.
///
/// [`at`]: Vector::at
pub struct Vector<T> {
    // INVARIANTS:
    //  * `len <= cap <= isize::MAX`
    //  * first `len` elements in `buf` are initialized
    //  * `buf` is valid pointer to contiguous memory to store `cap` `T`s
    //    (`buf` can only be `NonNull::dangling` if `cap == 0`)
    //  * we never allocate more than `isize::MAX` bytes, that is
    //    `cap * mem::size_of::<T>() <= isize::MAX`
    buf: NonNull<T>,
    len: usize,
    cap: usize,
    marker: PhantomData<T>,
}

impl<T> fmt::Debug for Vector<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("len", &self.len)
            .field("cap", &self.cap)
            .field("buf", &self.as_slice())
            .finish()
    }
}

impl<T> Drop for Vector<T> {
    fn drop(&mut self) {
        if self.cap == 0 {
            return;
        }

        /// Drop guard in case T::drop panics.
        ///
        /// In the case of unwinding we try to drop the remaining items.
        /// If that succeeds we deallocate our buffer and the caller could
        /// catch the unwinding, if not we abort due to double panic.
        struct Guard<'a, U>(&'a mut Vector<U>);

        impl<'a, U> Drop for Guard<'a, U> {
            fn drop(&mut self) {
                while self.0.pop_back().is_some() {}

                assert_eq!(self.0.len, 0);

                let layout = self.0.current_layout();
                self.0.cap = 0;
                let buf = mem::replace(&mut self.0.buf, NonNull::dangling())
                    .as_ptr()
                    .cast::<u8>();

                unsafe { alloc::dealloc(buf, layout) };
            }
        }

        let g = Guard(self);
        while g.0.pop_back().is_some() {}
    }
}

impl<T> Vector<T> {
    // Notes:
    //  * On any allocation error we panic for now
    const INITIAL_CAP: usize = 2;

    pub fn new() -> Self {
        assert!(mem::size_of::<T>() != 0, "we don't (yet) support ZST");
        Self {
            // SAFETY: self.buf is never touched before actually initializing it
            buf: NonNull::dangling(),
            len: 0,
            cap: 0,
            marker: PhantomData,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        let mut s = Self::new();
        s.grow_to(cap);
        s
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Grows the buffer so at least `additional` more elements fit without
    /// reallocation. Panics when the required capacity overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        // an overflowing capacity could never be allocated
        let new_cap = self
            .len
            .checked_add(additional)
            .expect("capacity overflow");
        self.grow_to(new_cap);
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY:
        //  * if `cap == 0` then `self.buf == NonNull::dangling`,
        //    this is valid pointer for zero-len slice (see docs of `slice::from_raw_parts`)
        //  * otherwise `self.buf` is a valid pointer to `self.len` `T`s
        //    gotten from `alloc::alloc` with `Layout::array<T>(cap)` which is non-null and properly aligned.
        //    First `self.len` `T`s in that memory are properly initialized.
        unsafe { slice::from_raw_parts(self.buf.as_ptr().cast_const(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: same as as_slice; taking `&mut self` invalidates any
        // previously returned references
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    pub fn push_back(&mut self, val: T) {
        if self.len == self.cap {
            self.grow()
        }

        assert!(self.len < self.cap);
        // SAFETY:
        //  * self.len < self.cap, is in bounds
        //  * `ptr` points to the first uninitialized `T` and thus `self.len + 1`
        //    first items will be initialized after this write
        unsafe {
            self.write_at(self.len, val);
            self.set_len(self.len + 1);
        }
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        // Want to read at last index, so decrement before reading
        self.len -= 1;
        // SAFETY:
        //  * self.len = orig_len - 1 is the index of last item, is in bounds
        //  * no-one has references to this item
        //  * this item will never be read again, only written over
        let val = unsafe { self.read_at(self.len) };
        Some(val)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if !self.is_in_bounds(index) {
            return None;
        }

        // SAFETY: index is in bounds (checked above)
        let ptr = unsafe { self.get_raw_unchecked(index) };
        // SAFETY:
        //  * lifetime of returned reference is bound to the borrow of `self`
        //  * `ptr` is non-null and properly aligned because self.buf is and
        //    ptr::add keeps it aligned
        //  * `ptr` points to an initialized T since `index < self.len` and first
        //    `self.len` items in `self.buf` are initialized (see INVARIANTS)
        unsafe { Some(&*ptr) }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.is_in_bounds(index) {
            return None;
        }

        let ptr = unsafe { self.get_raw_unchecked(index) };
        // SAFETY: same as get; `&mut self` invalidates previously returned
        // references so the mutable reference is unique
        unsafe { Some(&mut *ptr) }
    }

    /// Checked element access.
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        self.get(index).ok_or(Error::OutOfBounds {
            index,
            len: self.len,
        })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len;
        self.get_mut(index).ok_or(Error::OutOfBounds { index, len })
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len.checked_sub(1).and_then(|i| self.get_mut(i))
    }

    /// Removes the element at `index`, shifting the tail down. Out of
    /// range is a no-op returning `None`.
    pub fn erase(&mut self, index: usize) -> Option<T> {
        if !self.is_in_bounds(index) {
            return None;
        }

        // SAFETY:
        //  * index is in bounds (checked above) and no-one has references to it
        //  * this item will never be read again, only written over
        let val = unsafe { self.read_at(index) };

        // shift tail down by 1 position
        // [head] [empty_slot] [tail]     [after]
        //        ^-index      ^-index+1  ^-self.len
        self.len -= 1;
        // Number of items in tail: if we removed the last item then
        // index = orig_len - 1 = self.len and tail_count must equal 0,
        // thus tail_count = self.len - index
        let tail_count = self.len - index;
        if tail_count > 0 {
            // SAFETY:
            //  * [index + 1, index + 1 + tail_count = orig_len) items are initialized and valid to be read
            //  * by taking `&mut self` we invalidate any previously returned references
            //  * since amount == -1 and index is in bounds, dst must be in bounds
            unsafe { self.shift_items(index + 1, tail_count, -1) }
        }

        Some(val)
    }

    /// Inserts `val` before `index`, shifting the tail up. `index == len`
    /// appends. Past the end the value comes back in the error.
    pub fn insert(&mut self, index: usize, val: T) -> Result<(), T> {
        if index > self.len {
            return Err(val);
        }

        if index == self.len {
            self.push_back(val);
            return Ok(());
        }

        if self.len == self.cap {
            self.grow()
        }

        assert!(self.len < self.cap);

        let tail_count = self.len - index;
        // SAFETY:
        //  * [index, index + tail_count = self.len) items are initialized,
        //    previous references are invalidated and thus valid to be read
        //  * we checked that there is room for one more item, thus items at
        //    [index + 1, self.len + 1 <= self.cap) are valid to be written to
        unsafe { self.shift_items(index, tail_count, 1) }

        // SAFETY:
        //  * `index < self.cap`, is in bounds
        //  * previous item at `index` was shifted away, `index` is an empty slot
        unsafe { self.write_at(index, val) }

        // SAFETY:
        //  * as we moved [index, self.len) items up by one and filled the gap
        //    at index, `self.len + 1` first items are now initialized
        unsafe { self.set_len(self.len + 1) };

        Ok(())
    }

    /// Drops every element. Capacity is kept.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// O(1) exchange of the entire contents with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// # SAFETY
    ///
    ///  * first `new_len` elements in `self.buf` must be properly initialized
    unsafe fn set_len(&mut self, new_len: usize) {
        self.len = new_len
    }

    /// # SAFETY
    ///
    /// New buffer must uphold the invariants of our type (see type definition).
    ///
    /// This means that:
    /// * `new_buf` is valid pointer to contiguous memory to store `new_cap` `T`s
    ///    (it can only be `NonNull::dangling` if `new_cap == self.len == 0`)
    /// * first `self.len` elements in `new_buf` must be properly initialized
    /// * `self.len <= new_cap <= isize::MAX`
    unsafe fn set_buf(&mut self, new_buf: NonNull<T>, new_cap: usize) {
        self.buf = new_buf;
        self.cap = new_cap;
    }

    #[inline(always)]
    fn is_in_bounds(&self, index: usize) -> bool {
        index < self.len
    }

    /// Returns a pointer to item at `index` in `self.buf`.
    ///
    /// The returned pointer is non-null and properly aligned.
    /// The pointed item may be uninitialized.
    ///
    /// # SAFETY
    ///
    /// * `index` must be in bounds of buffer (`index < self.cap`)
    unsafe fn get_raw_unchecked(&self, index: usize) -> *mut T {
        // SAFETY:
        //  * `self.buf` is valid pointer for `self.cap > index` `T`s so the
        //    resulting pointer is in bounds
        //  * computed offset `index * mem::size_of::<T>() < isize::MAX`
        //    because our allocation size is checked to be `< isize::MAX`
        //    in allocation code (see `self.grow_to`)
        unsafe { self.buf.as_ptr().add(index) }
    }

    /// Write `val` at `index`.
    ///
    /// # SAFETY
    ///
    /// * `index < self.cap`
    /// * item at `index` must be valid to be written to
    unsafe fn write_at(&mut self, index: usize, val: T) {
        let ptr = unsafe { self.get_raw_unchecked(index) };
        // SAFETY:
        //  * get_raw_unchecked returns non-null and properly aligned pointers into self.buf
        //  * any references given out before are invalidated by taking
        //    `&mut self` (all returned references are bound to a borrow of `self`)
        unsafe { ptr.write(val) };
    }

    /// Read the item at `index`.
    ///
    /// # SAFETY
    ///
    /// * item at `index` must be valid to be read
    /// * item at `index` must never be read from again
    unsafe fn read_at(&mut self, index: usize) -> T {
        // SAFETY: index is in bounds
        let ptr = unsafe { self.get_raw_unchecked(index) };
        // SAFETY:
        //  * this item will never be read again, only written over
        //  * `ptr` is valid to be read from
        //    - get_raw_unchecked returns non-null and properly aligned pointers
        //    - any references given out before are invalidated by taking `&mut self`
        //  * `ptr` points to a properly initialized `T` since first `self.len`
        //    items in `self.buf` are initialized (see INVARIANTS)
        unsafe { ptr.read() }
    }

    /// # SAFETY
    ///
    /// * src = [start, start + count) must be initialized items valid to be read
    /// * dst = [start + amount, start + amount + count) must be valid to be written to
    unsafe fn shift_items(&mut self, start: usize, count: usize, amount: isize) {
        unsafe {
            // SAFETY: start < self.cap
            let src = self.get_raw_unchecked(start);
            // SAFETY: 0 <= start + amount < self.cap
            let dst = src.offset(amount);
            // SAFETY:
            //  * src and dst may overlap, use ptr::copy
            //  * `src` and `dst` are properly aligned and non-null
            //  * `src` is valid for count reads because self.buf must have at least start + count initialized items
            //  * `dst` is valid for count writes because self.buf has memory for at least start + amount + count items
            ptr::copy(src, dst, count)
        }
    }

    #[inline]
    fn current_layout(&self) -> Layout {
        // This cannot return Err variant as we have already checked it
        Layout::array::<T>(self.cap).unwrap()
    }

    fn grow_to(&mut self, new_cap: usize) {
        if new_cap <= self.cap {
            return;
        }

        let (buf, layout) = if self.cap == 0 {
            let layout = Layout::array::<T>(new_cap).unwrap();
            debug_assert_ne!(layout.size(), 0);
            // SAFETY: `new_cap * mem::size_of<T>() > 0` because `new_cap > 0`
            //  (new_cap > cap == 0 by combining two if statements) and we
            //  don't support ZST
            let buf = unsafe { alloc::alloc(layout) };
            (buf, layout)
        } else {
            let new_layout = Layout::array::<T>(new_cap).unwrap();
            // SAFETY:
            //  * we allocate only with Global allocator (we don't support custom allocators)
            //  * `self.current_layout()` returns the layout of current `self.buf`
            //  * `new_size = new_layout.size() > 0` because (`new_cap > cap != 0`) and we don't support ZST
            //  * `new_size = new_layout.size() < isize::MAX` because `Layout::array` would panic if this is not the case.
            let buf = unsafe {
                alloc::realloc(
                    self.buf.as_ptr().cast::<u8>(),
                    self.current_layout(),
                    new_layout.size(),
                )
            };
            (buf, new_layout)
        };

        if buf.is_null() {
            alloc::handle_alloc_error(layout)
        } else {
            // SAFETY:
            //  * we just checked that buf is not null.
            let new_buf = unsafe { NonNull::new_unchecked(buf.cast::<T>()) };
            // SAFETY:
            //  * `new_buf` is allocated with Layout::array::<T>(new_cap) which
            //    is properly aligned (by alloc::alloc) and non-null pointer to
            //    contiguous memory to store `new_cap` `T`s
            //  * If there were items in previous buffer, they have all been
            //    moved into the new buffer.
            //  * `new_cap <= isize::MAX` because otherwise `Layout::array` would panic
            unsafe { self.set_buf(new_buf, new_cap) }
        }
    }

    fn grow(&mut self) {
        let new_cap = if self.cap == 0 {
            Self::INITIAL_CAP
        } else {
            // Cannot overflow because Layout::array constraints the total
            // number of bytes allocated to be less than isize::MAX.
            // Thus at most self.cap == isize::MAX and isize::MAX * 2 == usize::MAX - 1
            self.cap * 2
        };
        self.grow_to(new_cap);
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Vector<T> {
    fn clone(&self) -> Self {
        let mut v = Self::with_capacity(self.len);
        for item in self.iter() {
            v.push_back(item.clone());
        }
        v
    }
}

impl<T: PartialEq> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Vector<T> {}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut v = Self::new();
        v.extend(iter);
        v
    }
}

impl<T> Extend<T> for Vector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T> {
    fn from(items: [T; N]) -> Self {
        items.into_iter().collect()
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
