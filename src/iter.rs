//! Flat pointer iterators.
//!
//! A pointer iterator walks a layout in a requested [`Order`] and yields one
//! flat pointer per element. The layout is compacted first, and the variant is
//! picked from the compacted rank:
//!
//! - rank 0: [`ScalarPointerIterator`], a single pointer
//! - rank 1: [`LoopPointerIterator`], one constant-step run
//! - otherwise: [`StridePointerIterator`], an odometer over all axes
//!
//! Iterators are single pass and not meant to be shared between threads
//! while being advanced.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::layout::StrideLayout;
use crate::order::Order;
use crate::{LayoutError, Result, INLINE_RANK};

/// Per-axis vectors kept inline for common ranks.
pub(crate) type SVec<T> = SmallVec<[T; INLINE_RANK]>;

/// Forward-only traversal producing flat pointers.
///
/// `has_next` never changes the iterator state. Advancing past the end with
/// [`next_pointer`](PointerIterator::next_pointer) fails with
/// [`LayoutError::IteratorExhausted`]; the [`Iterator`] impl returns `None`.
pub trait PointerIterator: Iterator<Item = usize> {
    /// Whether another pointer is available.
    fn has_next(&self) -> bool;

    /// Next pointer of the traversal.
    fn next_pointer(&mut self) -> Result<usize>;

    /// Number of pointers produced so far.
    fn position(&self) -> usize;
}

// ============================================================================
// Odometer
// ============================================================================

/// Mixed-radix counter over axes listed fastest first, tracking the pointer
/// of the current index incrementally.
#[derive(Clone, Debug)]
pub(crate) struct Odometer {
    dims: SVec<usize>,
    strides: SVec<isize>,
    index: SVec<usize>,
    pointer: usize,
}

impl Odometer {
    pub(crate) fn new(base: usize, dims: &[usize], strides: &[isize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
            strides: SmallVec::from_slice(strides),
            index: SmallVec::from_elem(0, dims.len()),
            pointer: base,
        }
    }

    #[inline]
    pub(crate) fn pointer(&self) -> usize {
        self.pointer
    }

    /// Step to the next index, carrying into slower axes on overflow.
    ///
    /// Returns `false` once every axis wrapped around (the odometer is back at
    /// its start).
    #[inline]
    pub(crate) fn advance(&mut self) -> bool {
        for axis in 0..self.dims.len() {
            let stride = self.strides[axis];
            self.index[axis] += 1;
            if self.index[axis] < self.dims[axis] {
                self.pointer = self.pointer.wrapping_add_signed(stride);
                return true;
            }
            let rewind = stride.wrapping_mul((self.dims[axis] - 1) as isize);
            self.pointer = self.pointer.wrapping_add_signed(rewind.wrapping_neg());
            self.index[axis] = 0;
        }
        false
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// Iterator over a rank-0 layout: exactly one pointer.
#[derive(Clone, Debug)]
pub struct ScalarPointerIterator {
    pointer: usize,
    done: bool,
}

impl ScalarPointerIterator {
    pub fn new(pointer: usize) -> Self {
        Self {
            pointer,
            done: false,
        }
    }
}

impl PointerIterator for ScalarPointerIterator {
    #[inline]
    fn has_next(&self) -> bool {
        !self.done
    }

    fn next_pointer(&mut self) -> Result<usize> {
        if self.done {
            return Err(LayoutError::IteratorExhausted);
        }
        self.done = true;
        Ok(self.pointer)
    }

    #[inline]
    fn position(&self) -> usize {
        usize::from(self.done)
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Iterator over a single run of `len` pointers spaced by `step`.
#[derive(Clone, Debug)]
pub struct LoopPointerIterator {
    start: usize,
    step: isize,
    len: usize,
    position: usize,
}

impl LoopPointerIterator {
    pub fn new(start: usize, step: isize, len: usize) -> Self {
        Self {
            start,
            step,
            len,
            position: 0,
        }
    }
}

impl PointerIterator for LoopPointerIterator {
    #[inline]
    fn has_next(&self) -> bool {
        self.position < self.len
    }

    #[inline]
    fn next_pointer(&mut self) -> Result<usize> {
        if self.position >= self.len {
            return Err(LayoutError::IteratorExhausted);
        }
        let pointer = self
            .start
            .wrapping_add_signed(self.step.wrapping_mul(self.position as isize));
        self.position += 1;
        Ok(pointer)
    }

    #[inline]
    fn position(&self) -> usize {
        self.position
    }
}

// ============================================================================
// Stride (odometer)
// ============================================================================

/// General iterator: odometer over the axes of the compacted layout.
#[derive(Clone, Debug)]
pub struct StridePointerIterator {
    odometer: Odometer,
    size: usize,
    position: usize,
}

impl StridePointerIterator {
    /// Walk `layout` in `order`.
    pub fn new(layout: &StrideLayout, order: Order) -> Self {
        let compact = layout.compact(order);
        Self::from_fastest_first(&compact)
    }

    /// Walk a layout whose axes are already listed fastest first.
    fn from_fastest_first(layout: &StrideLayout) -> Self {
        Self {
            odometer: Odometer::new(layout.offset(), layout.dims(), layout.strides()),
            size: layout.size(),
            position: 0,
        }
    }
}

impl PointerIterator for StridePointerIterator {
    #[inline]
    fn has_next(&self) -> bool {
        self.position < self.size
    }

    fn next_pointer(&mut self) -> Result<usize> {
        if self.position >= self.size {
            return Err(LayoutError::IteratorExhausted);
        }
        let pointer = self.odometer.pointer();
        self.position += 1;
        if self.position < self.size {
            self.odometer.advance();
        }
        Ok(pointer)
    }

    #[inline]
    fn position(&self) -> usize {
        self.position
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Pointer iterator chosen from the compacted rank of a layout.
#[derive(Clone, Debug)]
pub enum PointerIter {
    Scalar(ScalarPointerIterator),
    Loop(LoopPointerIterator),
    Stride(StridePointerIterator),
}

impl PointerIter {
    /// Traverse `layout` in `order`.
    pub fn new(layout: &StrideLayout, order: Order) -> Self {
        let compact = layout.compact(order);
        match compact.rank() {
            0 => PointerIter::Scalar(ScalarPointerIterator::new(compact.offset())),
            1 => PointerIter::Loop(LoopPointerIterator::new(
                compact.offset(),
                compact.strides()[0],
                compact.dims()[0],
            )),
            _ => PointerIter::Stride(StridePointerIterator::from_fastest_first(&compact)),
        }
    }
}

impl PointerIterator for PointerIter {
    #[inline]
    fn has_next(&self) -> bool {
        match self {
            PointerIter::Scalar(it) => it.has_next(),
            PointerIter::Loop(it) => it.has_next(),
            PointerIter::Stride(it) => it.has_next(),
        }
    }

    #[inline]
    fn next_pointer(&mut self) -> Result<usize> {
        match self {
            PointerIter::Scalar(it) => it.next_pointer(),
            PointerIter::Loop(it) => it.next_pointer(),
            PointerIter::Stride(it) => it.next_pointer(),
        }
    }

    #[inline]
    fn position(&self) -> usize {
        match self {
            PointerIter::Scalar(it) => it.position(),
            PointerIter::Loop(it) => it.position(),
            PointerIter::Stride(it) => it.position(),
        }
    }
}

impl ScalarPointerIterator {
    #[inline]
    fn remaining(&self) -> usize {
        usize::from(!self.done)
    }
}

impl LoopPointerIterator {
    #[inline]
    fn remaining(&self) -> usize {
        self.len - self.position
    }
}

impl StridePointerIterator {
    #[inline]
    fn remaining(&self) -> usize {
        self.size - self.position
    }
}

impl PointerIter {
    #[inline]
    fn remaining(&self) -> usize {
        match self {
            PointerIter::Scalar(it) => it.remaining(),
            PointerIter::Loop(it) => it.remaining(),
            PointerIter::Stride(it) => it.remaining(),
        }
    }
}

/// `Iterator`, `ExactSizeIterator` and `FusedIterator` on top of the
/// `PointerIterator` primitives.
macro_rules! impl_std_iterator {
    ($($ty:ty),*) => {
        $(
            impl Iterator for $ty {
                type Item = usize;

                #[inline]
                fn next(&mut self) -> Option<usize> {
                    self.next_pointer().ok()
                }

                #[inline]
                fn size_hint(&self) -> (usize, Option<usize>) {
                    let remaining = self.remaining();
                    (remaining, Some(remaining))
                }
            }

            impl ExactSizeIterator for $ty {}

            impl FusedIterator for $ty {}
        )*
    };
}

impl_std_iterator!(
    ScalarPointerIterator,
    LoopPointerIterator,
    StridePointerIterator,
    PointerIter
);
