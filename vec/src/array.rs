use core::fmt;
use core::slice;

use crate::Error;

/// A fixed-arity array of exactly `N` elements.
///
/// Construction only succeeds from input of exactly `N` elements;
/// [`try_from_vec`] and [`from_slice`] report [`Error::LengthMismatch`]
/// otherwise, so a size mismatch can never leave tail slots in an
/// unspecified state.
///
/// [`try_from_vec`]: Array::try_from_vec
/// [`from_slice`]: Array::from_slice
pub struct Array<T, const N: usize> {
    items: [T; N],
}

impl<T, const N: usize> Array<T, N> {
    /// Builds each element from its index.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        Self {
            items: core::array::from_fn(f),
        }
    }

    /// Takes ownership of a `Vec` holding exactly `N` elements.
    pub fn try_from_vec(items: Vec<T>) -> Result<Self, Error> {
        let got = items.len();
        match <[T; N]>::try_from(items) {
            Ok(items) => Ok(Self { items }),
            Err(_) => Err(Error::LengthMismatch { expected: N, got }),
        }
    }

    /// Number of elements; always `N`.
    #[inline]
    pub fn size(&self) -> usize {
        N
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        N == 0
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        N
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Checked element access.
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        self.items
            .get(index)
            .ok_or(Error::OutOfBounds { index, len: N })
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        self.items
            .get_mut(index)
            .ok_or(Error::OutOfBounds { index, len: N })
    }

    pub fn front(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn back(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Element-wise exchange with another array of the same arity.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.items, &mut other.items);
    }
}

impl<T: Clone, const N: usize> Array<T, N> {
    /// Fills every slot with clones of `value`.
    pub fn fill(&mut self, value: T) {
        self.items.fill(value);
    }

    /// Copies from a slice holding exactly `N` elements.
    pub fn from_slice(items: &[T]) -> Result<Self, Error> {
        if items.len() != N {
            return Err(Error::LengthMismatch {
                expected: N,
                got: items.len(),
            });
        }
        Ok(Self::from_fn(|i| items[i].clone()))
    }
}

impl<T, const N: usize> From<[T; N]> for Array<T, N> {
    fn from(items: [T; N]) -> Self {
        Self { items }
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for Array<T, N> {
    type Error = Error;

    fn try_from(items: Vec<T>) -> Result<Self, Error> {
        Self::try_from_vec(items)
    }
}

impl<T: Default, const N: usize> Default for Array<T, N> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T: Clone, const N: usize> Clone for Array<T, N> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for Array<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize> PartialEq for Array<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq, const N: usize> Eq for Array<T, N> {}

impl<'a, T, const N: usize> IntoIterator for &'a Array<T, N> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
