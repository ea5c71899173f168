//! Backing storage contract.
//!
//! The layout engine only produces pointers; reading and writing elements is
//! delegated to whatever flat buffer holds them.

use crate::{LayoutError, Result};

/// Flat element buffer addressed by pointers.
///
/// Out-of-range pointers fail with [`LayoutError::IndexOutOfBounds`].
pub trait Storage {
    type Item: Copy;

    /// Number of addressable elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, pointer: usize) -> Result<Self::Item>;

    fn set(&mut self, pointer: usize, value: Self::Item) -> Result<()>;
}

impl<T: Copy> Storage for [T] {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    #[inline]
    fn get(&self, pointer: usize) -> Result<T> {
        <[T]>::get(self, pointer)
            .copied()
            .ok_or(LayoutError::IndexOutOfBounds {
                index: pointer,
                dim: <[T]>::len(self),
            })
    }

    #[inline]
    fn set(&mut self, pointer: usize, value: T) -> Result<()> {
        let len = <[T]>::len(self);
        let slot = <[T]>::get_mut(self, pointer)
            .ok_or(LayoutError::IndexOutOfBounds { index: pointer, dim: len })?;
        *slot = value;
        Ok(())
    }
}

impl<T: Copy> Storage for Vec<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        Storage::len(self.as_slice())
    }

    #[inline]
    fn get(&self, pointer: usize) -> Result<T> {
        Storage::get(self.as_slice(), pointer)
    }

    #[inline]
    fn set(&mut self, pointer: usize, value: T) -> Result<()> {
        Storage::set(self.as_mut_slice(), pointer, value)
    }
}
