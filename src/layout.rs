//! Strided layouts: the address function from logical indices to pointers.
//!
//! A [`StrideLayout`] is a `(shape, offset, strides)` triple. The pointer of
//! the logical index `(i0, .., ik)` is `offset + Σ ij * strides[j]`. Layouts
//! are lightweight values; views created by slicing, transposing or
//! broadcasting an array get a new layout over the same backing storage.

use std::fmt;

use crate::chunk::{ChunkDescriptor, ChunkIterator};
use crate::fuse::{compact_axes, fastest_first_axes, permute_by};
use crate::iter::PointerIter;
use crate::order::Order;
use crate::shape::Shape;
use crate::{LayoutError, Result};

const C_DENSE: u8 = 1;
const F_DENSE: u8 = 2;

/// Compute row-major strides (C default: last index varies fastest).
fn row_major_strides(dims: &[usize]) -> Result<Vec<isize>> {
    let rank = dims.len();
    let mut strides = vec![1isize; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = scaled_stride(strides[i + 1], dims[i + 1])?;
    }
    Ok(strides)
}

/// Compute column-major strides (Fortran: first index varies fastest).
fn col_major_strides(dims: &[usize]) -> Result<Vec<isize>> {
    let rank = dims.len();
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = scaled_stride(strides[i - 1], dims[i - 1])?;
    }
    Ok(strides)
}

#[inline]
fn scaled_stride(stride: isize, dim: usize) -> Result<isize> {
    isize::try_from(dim)
        .ok()
        .and_then(|d| stride.checked_mul(d.max(1)))
        .ok_or_else(|| LayoutError::invalid_shape("dense strides overflow isize"))
}

/// Lowest and highest pointer reachable by a non-empty layout.
fn address_range(dims: &[usize], strides: &[isize], offset: usize) -> Result<(isize, isize)> {
    let overflow = || LayoutError::UnsupportedLayout("pointer arithmetic overflows".into());
    let base = isize::try_from(offset).map_err(|_| overflow())?;
    let mut lo = base;
    let mut hi = base;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let last = isize::try_from(dim - 1).map_err(|_| overflow())?;
            let end = stride.checked_mul(last).ok_or_else(overflow)?;
            if end >= 0 {
                hi = hi.checked_add(end).ok_or_else(overflow)?;
            } else {
                lo = lo.checked_add(end).ok_or_else(overflow)?;
            }
        }
    }
    Ok((lo, hi))
}

/// Immutable strided layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrideLayout {
    shape: Shape,
    offset: usize,
    strides: Box<[isize]>,
    flags: u8,
}

impl StrideLayout {
    /// Create a layout from a shape, base offset and per-axis strides.
    ///
    /// Fails with [`LayoutError::InvalidShape`] if `strides.len() != shape.rank()`
    /// and with [`LayoutError::UnsupportedLayout`] if some logical index maps
    /// below pointer 0 or outside the `isize` range.
    pub fn new(shape: Shape, offset: usize, strides: &[isize]) -> Result<Self> {
        if shape.rank() != strides.len() {
            return Err(LayoutError::invalid_shape(format!(
                "rank {} does not match {} strides",
                shape.rank(),
                strides.len()
            )));
        }
        if !shape.is_empty() {
            let (lo, _) = address_range(shape.dims(), strides, offset)?;
            if lo < 0 {
                return Err(LayoutError::UnsupportedLayout(format!(
                    "layout {shape} offset {offset} strides {strides:?} reaches pointer {lo}"
                )));
            }
        }
        Ok(Self::from_parts(shape, offset, strides.into()))
    }

    /// Create a layout from raw dimension sizes.
    pub fn from_dims(dims: &[usize], offset: usize, strides: &[isize]) -> Result<Self> {
        Self::new(Shape::new(dims)?, offset, strides)
    }

    /// Dense layout of a freshly allocated array stored in `order`.
    ///
    /// `S` and `A` resolve to the default order.
    pub fn dense(shape: Shape, offset: usize, order: Order) -> Result<Self> {
        let strides = match Order::auto_fc(order) {
            Order::F => col_major_strides(shape.dims())?,
            _ => row_major_strides(shape.dims())?,
        };
        Self::new(shape, offset, &strides)
    }

    /// Rank-0 layout addressing the single pointer `offset`.
    pub fn scalar(offset: usize) -> Self {
        Self::from_parts(Shape::scalar(), offset, Box::new([]))
    }

    /// Build a layout known to be valid (derived from a validated layout
    /// without changing its set of addresses).
    fn from_parts(shape: Shape, offset: usize, strides: Box<[isize]>) -> Self {
        let mut layout = Self {
            shape,
            offset,
            strides,
            flags: 0,
        };
        layout.flags = layout.compute_flags();
        layout
    }

    /// Layout over the same storage with other dims/strides/offset, validated.
    fn derive(&self, dims: &[usize], offset: usize, strides: &[isize]) -> Result<Self> {
        Self::from_dims(dims, offset, strides)
    }

    fn compute_flags(&self) -> u8 {
        if self.rank() < 2 {
            return C_DENSE | F_DENSE;
        }
        let mut flags = 0;
        if self.is_valid_c_order() {
            flags |= C_DENSE;
        }
        if self.is_valid_f_order() {
            flags |= F_DENSE;
        }
        flags
    }

    fn is_valid_c_order(&self) -> bool {
        let dims = self.dims();
        (0..self.rank() - 1).all(|i| {
            isize::try_from(dims[i + 1])
                .ok()
                .and_then(|d| self.strides[i + 1].checked_mul(d))
                == Some(self.strides[i])
        })
    }

    fn is_valid_f_order(&self) -> bool {
        let dims = self.dims();
        (1..self.rank()).all(|i| {
            isize::try_from(dims[i - 1])
                .ok()
                .and_then(|d| self.strides[i - 1].checked_mul(d))
                == Some(self.strides[i])
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    #[inline]
    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.shape.dim(axis)
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn stride(&self, axis: usize) -> Result<isize> {
        self.strides
            .get(axis)
            .copied()
            .ok_or(LayoutError::InvalidAxis {
                axis,
                rank: self.rank(),
            })
    }

    /// Base pointer of the logical origin.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Strides chain in row-major fashion (not necessarily with a unit last stride).
    #[inline]
    pub fn is_c_ordered(&self) -> bool {
        self.flags & C_DENSE == C_DENSE
    }

    /// Strides chain in column-major fashion (not necessarily with a unit first stride).
    #[inline]
    pub fn is_f_ordered(&self) -> bool {
        self.flags & F_DENSE == F_DENSE
    }

    /// Whether the layout covers `size()` consecutive pointers exactly once.
    ///
    /// True iff some permutation of the axes makes the strides the standard
    /// dense strides of the shape, i.e. storage-order compaction leaves at
    /// most one axis and that axis has unit stride.
    pub fn is_dense(&self) -> bool {
        let (dims, strides) = compact_axes(self.dims(), &self.strides, Order::S);
        match (dims.as_slice(), strides.as_slice()) {
            ([], []) => true,
            ([d], [s]) => *d == 0 || s.unsigned_abs() == 1,
            _ => false,
        }
    }

    /// The order the elements are stored in, `S` when neither C nor F.
    pub fn storage_fast_order(&self) -> Order {
        if self.rank() < 2 {
            return Order::default();
        }
        if self.is_f_ordered() {
            return Order::F;
        }
        if self.is_c_ordered() {
            return Order::C;
        }
        Order::S
    }

    /// Resolve `A` (don't care) to a concrete order for this layout.
    ///
    /// The storage order is chosen: it sorts axes by stride, which is what
    /// lets compaction fuse the most axes.
    pub fn resolve_order(&self, order: Order) -> Order {
        match order {
            Order::A => self.storage_fast_order(),
            other => other,
        }
    }

    // ========================================================================
    // Address mapping
    // ========================================================================

    /// Pointer of a logical index.
    pub fn pointer(&self, index: &[usize]) -> Result<usize> {
        self.shape.check_index(index)?;
        let mut pointer = self.offset as isize;
        for (&i, &s) in index.iter().zip(self.strides.iter()) {
            pointer += i as isize * s;
        }
        Ok(pointer as usize)
    }

    /// Logical index addressed by `pointer`.
    ///
    /// Axes are peeled off from the largest stride down. Only layouts with
    /// non-negative, nested strides are supported (every stride exceeds the
    /// farthest pointer reachable through the smaller ones); zero-stride axes
    /// report index 0.
    pub fn index(&self, pointer: usize) -> Result<Vec<usize>> {
        if self.strides.iter().any(|&s| s < 0) {
            return Err(LayoutError::UnsupportedLayout(
                "inverse mapping of negative strides".into(),
            ));
        }
        if !self.has_nested_strides() {
            return Err(LayoutError::UnsupportedLayout(
                "inverse mapping needs nested strides".into(),
            ));
        }
        if self.shape.is_empty() || pointer < self.offset {
            return Err(LayoutError::PointerNotInLayout(pointer));
        }

        let dims = self.dims();
        let mut axes: Vec<usize> = (0..self.rank()).collect();
        axes.sort_by(|&a, &b| {
            self.strides[b]
                .cmp(&self.strides[a])
                .then_with(|| dims[b].cmp(&dims[a]))
        });

        let mut rest = pointer - self.offset;
        let mut index = vec![0usize; self.rank()];
        for axis in axes {
            let stride = self.strides[axis] as usize;
            if stride == 0 {
                continue;
            }
            let i = rest / stride;
            if i >= dims[axis] {
                return Err(LayoutError::PointerNotInLayout(pointer));
            }
            index[axis] = i;
            rest -= i * stride;
        }
        if rest != 0 || self.pointer(&index)? != pointer {
            return Err(LayoutError::PointerNotInLayout(pointer));
        }
        Ok(index)
    }

    /// Whether each positive stride is larger than the span covered by all
    /// smaller ones, which makes the greedy inverse mapping exact.
    fn has_nested_strides(&self) -> bool {
        let dims = self.dims();
        let mut axes: Vec<usize> = (0..self.rank())
            .filter(|&a| self.strides[a] > 0 && dims[a] > 1)
            .collect();
        axes.sort_by_key(|&a| self.strides[a]);
        let mut span = 0usize;
        for axis in axes {
            let stride = self.strides[axis].unsigned_abs();
            if span >= stride {
                return false;
            }
            span += (dims[axis] - 1) * stride;
        }
        true
    }

    // ========================================================================
    // Compaction
    // ========================================================================

    /// Reorder axes fastest first for `order` (`F`-style layout), optionally
    /// compacting it.
    ///
    /// Without compaction the result is a pure axis permutation. With
    /// compaction unit axes are removed and stride-compatible neighbours are
    /// fused, so axis 0 is the longest contiguous run available for `order`.
    pub fn compute_f_layout(&self, order: Order, compact: bool) -> StrideLayout {
        let order = self.resolve_order(order);
        let (dims, strides) = if compact {
            compact_axes(self.dims(), &self.strides, order)
        } else {
            let axes = fastest_first_axes(self.dims(), &self.strides, order);
            (
                permute_by(self.dims(), &axes),
                permute_by(&self.strides, &axes),
            )
        };
        Self::from_parts(Shape::from_valid(dims), self.offset, strides.into())
    }

    /// Same as [`compute_f_layout`](Self::compute_f_layout) with the axes
    /// listed slowest first (`C`-style layout).
    pub fn compute_c_layout(&self, order: Order, compact: bool) -> StrideLayout {
        self.compute_f_layout(order, compact).revert()
    }

    /// Equivalent layout whose axis 0 is the maximal contiguous run for `order`.
    pub fn compact(&self, order: Order) -> StrideLayout {
        self.compute_f_layout(order, true)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Flat pointer iterator visiting every element in `order`.
    pub fn ptr_iter(&self, order: Order) -> PointerIter {
        PointerIter::new(self, order)
    }

    /// Eager chunk decomposition for `order`.
    pub fn chunks(&self, order: Order) -> ChunkDescriptor {
        ChunkDescriptor::of(self, order)
    }

    /// Lazy chunk decomposition for `order`.
    pub fn chunk_iter(&self, order: Order) -> ChunkIterator {
        ChunkIterator::new(self, order)
    }

    // ========================================================================
    // View algebra
    // ========================================================================

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.rank() {
            return Err(LayoutError::InvalidAxis {
                axis,
                rank: self.rank(),
            });
        }
        Ok(())
    }

    /// Drop every size-1 axis.
    pub fn squeeze(&self) -> StrideLayout {
        if self.shape.unit_dim_count() == 0 {
            return self.clone();
        }
        let (dims, strides): (Vec<usize>, Vec<isize>) = self
            .dims()
            .iter()
            .zip(self.strides.iter())
            .filter(|(&d, _)| d != 1)
            .map(|(&d, &s)| (d, s))
            .unzip();
        Self::from_parts(Shape::from_valid(dims), self.offset, strides.into())
    }

    /// Drop `axis` if it has size 1, otherwise return the layout unchanged.
    pub fn squeeze_axis(&self, axis: usize) -> Result<StrideLayout> {
        self.check_axis(axis)?;
        if self.dims()[axis] != 1 {
            return Ok(self.clone());
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.to_vec();
        dims.remove(axis);
        strides.remove(axis);
        Ok(Self::from_parts(
            Shape::from_valid(dims),
            self.offset,
            strides.into(),
        ))
    }

    /// Insert a size-1 axis at position `axis` (`0..=rank`).
    ///
    /// The new stride is chosen so that C or F ordering flags survive.
    pub fn unsqueeze(&self, axis: usize) -> Result<StrideLayout> {
        let rank = self.rank();
        if axis > rank {
            return Err(LayoutError::InvalidAxis { axis, rank });
        }
        let dims = self.dims();
        let stride = if rank == 0 {
            1
        } else if self.is_c_ordered() {
            if axis > 0 {
                self.strides[axis - 1]
            } else {
                self.strides[0].saturating_mul(dims[0] as isize)
            }
        } else if self.is_f_ordered() {
            if axis < rank {
                self.strides[axis]
            } else {
                self.strides[rank - 1].saturating_mul(dims[rank - 1] as isize)
            }
        } else {
            1
        };
        let mut new_dims = dims.to_vec();
        let mut new_strides = self.strides.to_vec();
        new_dims.insert(axis, 1);
        new_strides.insert(axis, stride);
        Ok(Self::from_parts(
            Shape::from_valid(new_dims),
            self.offset,
            new_strides.into(),
        ))
    }

    /// Reverse the axis order (full transpose).
    pub fn revert(&self) -> StrideLayout {
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.to_vec();
        dims.reverse();
        strides.reverse();
        Self::from_parts(Shape::from_valid(dims), self.offset, strides.into())
    }

    /// Move axis `src` to position `dst`, shifting the axes in between.
    pub fn move_axis(&self, src: usize, dst: usize) -> Result<StrideLayout> {
        self.check_axis(src)?;
        self.check_axis(dst)?;
        let mut perm: Vec<usize> = (0..self.rank()).collect();
        let moved = perm.remove(src);
        perm.insert(dst, moved);
        self.permute(&perm)
    }

    /// Exchange two axes.
    pub fn swap_axis(&self, a: usize, b: usize) -> Result<StrideLayout> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        let mut perm: Vec<usize> = (0..self.rank()).collect();
        perm.swap(a, b);
        self.permute(&perm)
    }

    /// Permute axes: axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<StrideLayout> {
        let rank = self.rank();
        if perm.len() != rank {
            return Err(LayoutError::InvalidPermutation(perm.to_vec()));
        }
        let mut seen = vec![false; rank];
        for &p in perm {
            if p >= rank || seen[p] {
                return Err(LayoutError::InvalidPermutation(perm.to_vec()));
            }
            seen[p] = true;
        }
        let dims = permute_by(self.dims(), perm);
        let strides = permute_by(&self.strides, perm);
        Ok(Self::from_parts(
            Shape::from_valid(dims),
            self.offset,
            strides.into(),
        ))
    }

    /// Restrict `axis` to the half-open range `start..end`.
    ///
    /// With `keepdim == false` a resulting size-1 axis is dropped.
    pub fn narrow(&self, axis: usize, keepdim: bool, start: usize, end: usize) -> Result<StrideLayout> {
        self.check_axis(axis)?;
        let dim = self.dims()[axis];
        if start > end || end > dim {
            return Err(LayoutError::InvalidRange { start, end, dim });
        }
        let mut dims = self.dims().to_vec();
        dims[axis] = end - start;
        let offset = self.shifted_offset(&[(axis, start)], end > start)?;
        let narrowed = self.derive(&dims, offset, &self.strides)?;
        if keepdim {
            Ok(narrowed)
        } else {
            narrowed.squeeze_axis(axis)
        }
    }

    /// Restrict every axis to `starts[i]..ends[i]`.
    ///
    /// With `keepdim == false` every resulting size-1 axis is dropped.
    pub fn narrow_all(
        &self,
        keepdim: bool,
        starts: &[usize],
        ends: &[usize],
    ) -> Result<StrideLayout> {
        let rank = self.rank();
        if starts.len() != rank || ends.len() != rank {
            return Err(LayoutError::invalid_shape(format!(
                "narrow bounds of length {}/{} for rank {rank}",
                starts.len(),
                ends.len()
            )));
        }
        let mut dims = Vec::with_capacity(rank);
        let mut shifts = Vec::with_capacity(rank);
        for axis in 0..rank {
            let (start, end, dim) = (starts[axis], ends[axis], self.dims()[axis]);
            if start > end || end > dim {
                return Err(LayoutError::InvalidRange { start, end, dim });
            }
            dims.push(end - start);
            shifts.push((axis, start));
        }
        let non_empty = dims.iter().all(|&d| d > 0);
        let offset = self.shifted_offset(&shifts, non_empty)?;
        let narrowed = self.derive(&dims, offset, &self.strides)?;
        if keepdim {
            Ok(narrowed)
        } else {
            Ok(narrowed.squeeze())
        }
    }

    /// Offset moved by `start * stride` along the given axes.
    ///
    /// For an empty result the base offset is kept; it is never dereferenced.
    fn shifted_offset(&self, shifts: &[(usize, usize)], non_empty: bool) -> Result<usize> {
        if !non_empty {
            return Ok(self.offset);
        }
        let mut offset = self.offset as isize;
        for &(axis, start) in shifts {
            offset += start as isize * self.strides[axis];
        }
        usize::try_from(offset).map_err(|_| {
            LayoutError::UnsupportedLayout(format!("narrowed offset {offset} is negative"))
        })
    }

    /// Broadcast the size-1 `axis` to `size` elements with stride 0.
    pub fn expand(&self, axis: usize, size: usize) -> Result<StrideLayout> {
        self.check_axis(axis)?;
        let dim = self.dims()[axis];
        if dim != 1 {
            return Err(LayoutError::NonUnitAxis { axis, dim });
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.to_vec();
        dims[axis] = size;
        strides[axis] = 0;
        self.derive(&dims, self.offset, &strides)
    }

    /// Broadcast to `target` dims: equal axes are kept, size-1 axes get stride 0.
    pub fn broadcast(&self, target: &[usize]) -> Result<StrideLayout> {
        let dims = self.dims();
        if dims.len() != target.len() {
            return Err(LayoutError::ShapeMismatch(dims.to_vec(), target.to_vec()));
        }
        let mut strides = Vec::with_capacity(dims.len());
        for ((&d, &t), &s) in dims.iter().zip(target.iter()).zip(self.strides.iter()) {
            if d == t {
                strides.push(s);
            } else if d == 1 {
                strides.push(0);
            } else {
                return Err(LayoutError::ShapeMismatch(dims.to_vec(), target.to_vec()));
            }
        }
        self.derive(target, self.offset, &strides)
    }
}

impl fmt::Display for StrideLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrideLayout({},{},[", self.shape, self.offset)?;
        for (i, s) in self.strides.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(dims: &[usize], offset: usize, strides: &[isize]) -> StrideLayout {
        StrideLayout::from_dims(dims, offset, strides).unwrap()
    }

    #[test]
    fn test_rank_stride_mismatch() {
        let err = StrideLayout::from_dims(&[2, 3], 0, &[1]).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidShape { .. }));
    }

    #[test]
    fn test_negative_address_rejected() {
        let err = StrideLayout::from_dims(&[3], 1, &[-1]).unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedLayout(_)));
        // Reversed view ending on pointer 0 is fine.
        let rev = layout(&[3], 2, &[-1]);
        assert_eq!(rev.pointer(&[2]).unwrap(), 0);
    }

    #[test]
    fn test_dense_strides() {
        let shape = Shape::new(&[2, 3, 4]).unwrap();
        let c = StrideLayout::dense(shape.clone(), 0, Order::C).unwrap();
        assert_eq!(c.strides(), &[12, 4, 1]);
        let f = StrideLayout::dense(shape.clone(), 5, Order::F).unwrap();
        assert_eq!(f.strides(), &[1, 2, 6]);
        assert_eq!(f.offset(), 5);
        let a = StrideLayout::dense(shape, 0, Order::A).unwrap();
        assert_eq!(a.strides(), &[12, 4, 1]);
    }

    #[test]
    fn test_order_flags() {
        let c = layout(&[2, 3], 0, &[3, 1]);
        assert!(c.is_c_ordered());
        assert!(!c.is_f_ordered());
        assert_eq!(c.storage_fast_order(), Order::C);

        let f = layout(&[2, 3], 0, &[1, 2]);
        assert!(f.is_f_ordered());
        assert_eq!(f.storage_fast_order(), Order::F);

        let padded = layout(&[3, 3], 0, &[9, 1]);
        assert!(!padded.is_c_ordered());
        assert!(!padded.is_f_ordered());
        assert_eq!(padded.storage_fast_order(), Order::S);

        let vector = layout(&[5], 0, &[2]);
        assert!(vector.is_c_ordered() && vector.is_f_ordered());
    }

    #[test]
    fn test_is_dense() {
        assert!(layout(&[2, 3], 0, &[3, 1]).is_dense());
        assert!(layout(&[2, 3], 0, &[1, 2]).is_dense());
        // transposed 3d dense array
        assert!(layout(&[3, 2, 4], 0, &[4, 12, 1]).is_dense());
        assert!(!layout(&[3, 3], 0, &[9, 1]).is_dense());
        assert!(!layout(&[2, 3], 0, &[6, 2]).is_dense());
        assert!(!layout(&[4, 3], 0, &[0, 1]).is_dense());
        assert!(StrideLayout::scalar(7).is_dense());
    }

    #[test]
    fn test_pointer() {
        let l = layout(&[2, 3], 4, &[3, 1]);
        assert_eq!(l.pointer(&[0, 0]).unwrap(), 4);
        assert_eq!(l.pointer(&[1, 2]).unwrap(), 9);
        assert!(matches!(
            l.pointer(&[2, 0]),
            Err(LayoutError::IndexOutOfBounds { index: 2, dim: 2 })
        ));
        assert!(l.pointer(&[0]).is_err());
    }

    #[test]
    fn test_index_round_trip() {
        let l = layout(&[3, 2, 4], 1, &[4, 12, 1]);
        for i in 0..3 {
            for j in 0..2 {
                for k in 0..4 {
                    let p = l.pointer(&[i, j, k]).unwrap();
                    assert_eq!(l.index(p).unwrap(), vec![i, j, k]);
                }
            }
        }
    }

    #[test]
    fn test_index_not_in_layout() {
        let padded = layout(&[3, 3], 0, &[9, 1]);
        assert_eq!(padded.index(10).unwrap(), vec![1, 1]);
        assert_eq!(padded.index(12), Err(LayoutError::PointerNotInLayout(12)));
        assert_eq!(padded.index(100), Err(LayoutError::PointerNotInLayout(100)));
        let shifted = layout(&[3], 5, &[1]);
        assert_eq!(shifted.index(2), Err(LayoutError::PointerNotInLayout(2)));
        let reversed = layout(&[3], 2, &[-1]);
        assert!(matches!(
            reversed.index(1),
            Err(LayoutError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_index_overlapping_strides_unsupported() {
        // strides 2 and 3 interleave: pointer 4 is [2, 0] but greedy peeling
        // from stride 3 would miss it
        let l = layout(&[3, 2], 0, &[2, 3]);
        assert_eq!(l.pointer(&[2, 0]).unwrap(), 4);
        assert!(matches!(l.index(4), Err(LayoutError::UnsupportedLayout(_))));

        let repeated = layout(&[2, 2], 0, &[1, 1]);
        assert!(matches!(repeated.index(1), Err(LayoutError::UnsupportedLayout(_))));

        // non-dividing but nested strides still invert
        let nested = layout(&[2, 2], 0, &[3, 1]);
        assert!(nested.has_nested_strides());
        for i in 0..2 {
            for j in 0..2 {
                let p = nested.pointer(&[i, j]).unwrap();
                assert_eq!(nested.index(p).unwrap(), vec![i, j]);
            }
        }
        let spread = layout(&[2, 2], 0, &[5, 2]);
        assert_eq!(spread.index(7).unwrap(), vec![1, 1]);
        assert_eq!(spread.index(4), Err(LayoutError::PointerNotInLayout(4)));
    }

    #[test]
    fn test_index_broadcast_axis() {
        let l = layout(&[4, 3], 0, &[0, 1]);
        assert_eq!(l.index(2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_compact_dense_round_trip() {
        let l = StrideLayout::dense(Shape::new(&[2, 3]).unwrap(), 0, Order::C).unwrap();
        let c = l.compact(Order::C);
        assert_eq!(c.dims(), &[6]);
        assert_eq!(c.strides(), &[1]);

        let f = l.compact(Order::F);
        assert_eq!(f.dims(), &[2, 3]);
        assert_eq!(f.strides(), &[3, 1]);
    }

    #[test]
    fn test_compute_layouts_uncompacted() {
        let l = layout(&[2, 3, 4], 0, &[12, 4, 1]);
        let f = l.compute_f_layout(Order::C, false);
        assert_eq!(f.dims(), &[4, 3, 2]);
        assert_eq!(f.strides(), &[1, 4, 12]);
        let c = l.compute_c_layout(Order::C, false);
        assert_eq!(c.dims(), &[2, 3, 4]);
        assert_eq!(c.strides(), &[12, 4, 1]);
        let c = l.compute_c_layout(Order::C, true);
        assert_eq!(c.dims(), &[24]);
    }

    #[test]
    fn test_compact_padded_does_not_merge() {
        let l = layout(&[3, 3], 0, &[9, 1]);
        let c = l.compact(Order::C);
        assert_eq!(c.dims(), &[3, 3]);
        assert_eq!(c.strides(), &[1, 9]);
    }

    #[test]
    fn test_compact_resolves_dont_care() {
        // F-dense layout traversed "don't care" fuses fully.
        let l = layout(&[2, 3, 4], 0, &[1, 2, 6]);
        assert_eq!(l.compact(Order::A).dims(), &[24]);
        // transposed dense layout goes through storage order
        let t = layout(&[3, 2, 4], 0, &[4, 12, 1]);
        assert_eq!(t.compact(Order::A).dims(), &[24]);
        assert_eq!(t.compact(Order::C).dims(), &[4, 2, 3]);
    }

    #[test]
    fn test_squeeze_unsqueeze() {
        let l = layout(&[1, 3, 1], 0, &[3, 1, 1]);
        assert_eq!(l.squeeze().dims(), &[3]);
        assert_eq!(l.squeeze_axis(0).unwrap().dims(), &[3, 1]);
        assert_eq!(l.squeeze_axis(1).unwrap().dims(), &[1, 3, 1]);
        assert!(l.squeeze_axis(3).is_err());

        let c = layout(&[2, 3], 0, &[3, 1]);
        for axis in 0..=2 {
            let u = c.unsqueeze(axis).unwrap();
            assert_eq!(u.rank(), 3);
            assert!(u.is_c_ordered(), "axis {axis}: {u}");
        }
        let f = layout(&[2, 3], 0, &[1, 2]);
        for axis in 0..=2 {
            assert!(f.unsqueeze(axis).unwrap().is_f_ordered());
        }
        assert!(c.unsqueeze(3).is_err());
    }

    #[test]
    fn test_permute_and_axes() {
        let l = layout(&[2, 3, 4], 0, &[12, 4, 1]);
        let p = l.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.dims(), &[4, 2, 3]);
        assert_eq!(p.strides(), &[1, 12, 4]);
        assert!(l.permute(&[0, 0, 1]).is_err());
        assert!(l.permute(&[0, 1]).is_err());

        let m = l.move_axis(0, 2).unwrap();
        assert_eq!(m.dims(), &[3, 4, 2]);
        assert_eq!(m.strides(), &[4, 1, 12]);

        let s = l.swap_axis(0, 2).unwrap();
        assert_eq!(s.dims(), &[4, 3, 2]);
        assert_eq!(s, l.revert());
    }

    #[test]
    fn test_narrow() {
        let l = layout(&[4, 9], 0, &[9, 1]);
        let n = l.narrow(1, true, 2, 5).unwrap();
        assert_eq!(n.dims(), &[4, 3]);
        assert_eq!(n.offset(), 2);
        assert_eq!(n.strides(), &[9, 1]);

        let row = l.narrow(0, false, 1, 2).unwrap();
        assert_eq!(row.dims(), &[9]);
        assert_eq!(row.offset(), 9);

        assert!(matches!(
            l.narrow(1, true, 5, 10),
            Err(LayoutError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_narrow_all() {
        let l = layout(&[4, 9], 0, &[9, 1]);
        let n = l.narrow_all(true, &[1, 3], &[4, 6]).unwrap();
        assert_eq!(n.dims(), &[3, 3]);
        assert_eq!(n.offset(), 12);
        assert!(l.narrow_all(true, &[0], &[1]).is_err());

        let column = l.narrow_all(false, &[0, 4], &[4, 5]).unwrap();
        assert_eq!(column.dims(), &[4]);
        assert_eq!(column.strides(), &[9]);
        assert_eq!(column.offset(), 4);
        let kept = l.narrow_all(true, &[0, 4], &[4, 5]).unwrap();
        assert_eq!(kept.dims(), &[4, 1]);

        let element = l.narrow_all(false, &[2, 7], &[3, 8]).unwrap();
        assert_eq!(element.rank(), 0);
        assert_eq!(element.pointer(&[]).unwrap(), 25);
    }

    #[test]
    fn test_expand_and_broadcast() {
        let row = layout(&[1, 3], 0, &[3, 1]);
        let e = row.expand(0, 4).unwrap();
        assert_eq!(e.dims(), &[4, 3]);
        assert_eq!(e.strides(), &[0, 1]);
        assert!(matches!(
            e.expand(1, 2),
            Err(LayoutError::NonUnitAxis { axis: 1, dim: 3 })
        ));

        let b = row.broadcast(&[4, 3]).unwrap();
        assert_eq!(b, e);
        assert!(row.broadcast(&[4, 2]).is_err());
        assert!(row.broadcast(&[3]).is_err());
    }

    #[test]
    fn test_display() {
        let l = layout(&[2, 3], 1, &[3, 1]);
        assert_eq!(l.to_string(), "StrideLayout([2,3],1,[3,1])");
    }
}
