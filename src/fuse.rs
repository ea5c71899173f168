//! Axis ordering and fusion for layout compaction.
//!
//! Compaction works on a "fastest axis first" view of the layout: the axes are
//! permuted so that axis 0 is the one the requested order varies fastest, then
//! adjacent axes are fused greedily from the inside out. Two neighbours fuse
//! when stepping off the end of the inner one lands exactly on the next
//! element of the outer one:
//!
//! ```text
//! dims[k] * strides[k] == strides[k + 1]
//! ```
//!
//! The fused axis keeps the inner stride and the product of both sizes. The
//! pass is linear with no backtracking; a rejected pair is never revisited.

use crate::order::Order;

/// Axis permutation that visits axes fastest first for `order`.
///
/// `A` has to be resolved against the layout beforehand; if it reaches this
/// function it is treated like `S`.
pub(crate) fn fastest_first_axes(dims: &[usize], strides: &[isize], order: Order) -> Vec<usize> {
    let rank = dims.len();
    match order {
        Order::F => (0..rank).collect(),
        Order::C => (0..rank).rev().collect(),
        Order::S | Order::A => storage_axes(dims, strides),
    }
}

/// Axes sorted by increasing absolute stride, zero strides last, ties by size.
///
/// The sort is stable, so fully tied axes keep their logical order.
pub(crate) fn storage_axes(dims: &[usize], strides: &[isize]) -> Vec<usize> {
    let mut axes: Vec<usize> = (0..dims.len()).collect();
    axes.sort_by_key(|&i| (strides[i] == 0, strides[i].unsigned_abs(), dims[i]));
    axes
}

/// Apply an axis permutation to a slice.
pub(crate) fn permute_by<T: Copy>(data: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&i| data[i]).collect()
}

/// Remove size-1 axes; they never change the set or order of pointers.
pub(crate) fn compress_dims(dims: &[usize], strides: &[isize]) -> (Vec<usize>, Vec<isize>) {
    dims.iter()
        .zip(strides.iter())
        .filter(|(&d, _)| d != 1)
        .map(|(&d, &s)| (d, s))
        .unzip()
}

/// Fuse adjacent axes of a fastest-first layout.
///
/// Zero strides are boundaries: a broadcast axis never fuses with a
/// neighbour, even with another broadcast axis.
///
/// # Returns
/// The fused dims and strides, still fastest first.
pub(crate) fn fuse_dims(dims: &[usize], strides: &[isize]) -> (Vec<usize>, Vec<isize>) {
    let mut fused_dims: Vec<usize> = Vec::with_capacity(dims.len());
    let mut fused_strides: Vec<isize> = Vec::with_capacity(strides.len());

    for (&d, &s) in dims.iter().zip(strides.iter()) {
        if let (Some(last_dim), Some(&last_stride)) = (fused_dims.last_mut(), fused_strides.last()) {
            if composes(*last_dim, last_stride, s) {
                *last_dim *= d;
                continue;
            }
        }
        fused_dims.push(d);
        fused_strides.push(s);
    }

    (fused_dims, fused_strides)
}

#[inline]
fn composes(inner_dim: usize, inner_stride: isize, outer_stride: isize) -> bool {
    if inner_stride == 0 || outer_stride == 0 {
        return false;
    }
    isize::try_from(inner_dim)
        .ok()
        .and_then(|d| d.checked_mul(inner_stride))
        == Some(outer_stride)
}

/// Full compaction of a layout's axes for a concrete order.
///
/// Returns fastest-first dims and strides with unit axes removed and
/// stride-compatible neighbours fused. An empty layout (some dim is 0)
/// collapses to the single axis `[0]` with stride 1.
pub(crate) fn compact_axes(dims: &[usize], strides: &[isize], order: Order) -> (Vec<usize>, Vec<isize>) {
    if dims.iter().any(|&d| d == 0) {
        return (vec![0], vec![1]);
    }
    let axes = fastest_first_axes(dims, strides, order);
    let ordered_dims = permute_by(dims, &axes);
    let ordered_strides = permute_by(strides, &axes);
    let (compressed_dims, compressed_strides) = compress_dims(&ordered_dims, &ordered_strides);
    let (fused_dims, fused_strides) = fuse_dims(&compressed_dims, &compressed_strides);

    tracing::trace!(
        ?order,
        ?dims,
        ?strides,
        ?fused_dims,
        ?fused_strides,
        "compacted layout axes"
    );

    (fused_dims, fused_strides)
}
