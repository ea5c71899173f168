//! Chunked traversal: contiguous inner runs plus an outer enumeration of
//! run starts.
//!
//! After compaction axis 0 of a layout is the inner run (`loop_size` pointers
//! spaced by `loop_step`) and the remaining axes are "outer". Their cartesian
//! product gives `chunk_count` run starts, one per combination of outer
//! indices, in odometer order (the first outer axis varies fastest).
//!
//! A vectorized consumer looks like:
//!
//! ```rust
//! use strided_layout::{Order, StrideLayout};
//!
//! let data: Vec<f64> = (0..27).map(f64::from).collect();
//! // 3x3 window of a 3x9 buffer
//! let layout = StrideLayout::from_dims(&[3, 3], 0, &[9, 1]).unwrap();
//! let loops = layout.chunks(Order::C);
//!
//! let mut sum = 0.0;
//! for &start in loops.offsets() {
//!     let run = &data[start..start + loops.loop_size()];
//!     sum += run.iter().sum::<f64>();
//! }
//! assert_eq!(sum, 0.0 + 1.0 + 2.0 + 9.0 + 10.0 + 11.0 + 18.0 + 19.0 + 20.0);
//! ```
//!
//! [`ChunkDescriptor`] materializes every start eagerly, [`ChunkIterator`]
//! produces them lazily. Both are computed from the same compacted layout.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::iter::{Odometer, SVec};
use crate::layout::StrideLayout;
use crate::order::Order;
use crate::{LayoutError, Result};

/// Run starts of a cartesian product of axes, listed fastest first.
///
/// Iterative mixed-radix sweep: the output is preloaded with `base`, then each
/// axis in turn adds `k * stride` to consecutive segments of the already
/// placed entries. After processing axis `i`, every block of
/// `dims[0] * .. * dims[i]` entries holds the correct addresses over axes
/// `0..=i`. Cost is linear in the number of starts and independent of rank
/// depth; no recursion.
///
/// Fails with [`LayoutError::UnsupportedLayout`] if some start would fall
/// below 0 or overflow.
///
/// # Example
/// ```rust
/// use strided_layout::chunk_offsets;
///
/// // outer axes of a row-major [2, 3, 4] array, fastest first: [3, 2] x [4, 12]
/// let starts = chunk_offsets(0, &[3, 2], &[4, 12]).unwrap();
/// assert_eq!(starts, vec![0, 4, 8, 12, 16, 20]);
/// ```
pub fn chunk_offsets(base: usize, dims: &[usize], strides: &[isize]) -> Result<Vec<usize>> {
    // Validates the address range of the product (and dims/strides lengths).
    StrideLayout::from_dims(dims, base, strides)?;
    Ok(sweep_offsets(base, dims, strides))
}

/// Sweep over axes of an already validated layout.
pub(crate) fn sweep_offsets(base: usize, dims: &[usize], strides: &[isize]) -> Vec<usize> {
    let count: usize = dims.iter().product();
    let mut out = vec![base; count];
    let mut inner = 1usize;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        let mut p = 0usize;
        while p < count {
            for k in 0..dim {
                let add = stride.wrapping_mul(k as isize);
                for slot in &mut out[p..p + inner] {
                    *slot = slot.wrapping_add_signed(add);
                }
                p += inner;
            }
        }
        inner *= dim;
    }
    out
}

/// Inner run and outer axes of a compacted layout.
#[derive(Clone, Debug)]
struct LoopPlan {
    offset: usize,
    loop_size: usize,
    loop_step: isize,
    chunk_count: usize,
    outer_dims: SVec<usize>,
    outer_strides: SVec<isize>,
}

impl LoopPlan {
    fn new(layout: &StrideLayout, order: Order) -> Self {
        let compact = layout.compact(order);
        let offset = compact.offset();
        let (dims, strides) = (compact.dims(), compact.strides());
        let plan = if dims.is_empty() {
            LoopPlan {
                offset,
                loop_size: 1,
                loop_step: 1,
                chunk_count: 1,
                outer_dims: SmallVec::new(),
                outer_strides: SmallVec::new(),
            }
        } else if compact.size() == 0 {
            LoopPlan {
                offset,
                loop_size: 0,
                loop_step: 1,
                chunk_count: 0,
                outer_dims: SmallVec::new(),
                outer_strides: SmallVec::new(),
            }
        } else {
            LoopPlan {
                offset,
                loop_size: dims[0],
                loop_step: strides[0],
                chunk_count: dims[1..].iter().product(),
                outer_dims: SmallVec::from_slice(&dims[1..]),
                outer_strides: SmallVec::from_slice(&strides[1..]),
            }
        };
        tracing::debug!(
            ?order,
            loop_size = plan.loop_size,
            loop_step = plan.loop_step,
            chunk_count = plan.chunk_count,
            "planned chunked traversal"
        );
        plan
    }

    fn offsets(&self) -> Vec<usize> {
        if self.chunk_count == 0 {
            return Vec::new();
        }
        sweep_offsets(self.offset, &self.outer_dims, &self.outer_strides)
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// One contiguous run: `len` pointers from `start` spaced by `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub len: usize,
    pub step: isize,
}

impl Chunk {
    /// Pointers of the run.
    pub fn pointers(&self) -> impl Iterator<Item = usize> {
        let Chunk { start, len, step } = *self;
        (0..len).map(move |i| start.wrapping_add_signed(step.wrapping_mul(i as isize)))
    }
}

// ============================================================================
// ChunkDescriptor (eager)
// ============================================================================

/// Chunk decomposition with every run start materialized.
///
/// `chunk_count * loop_size == layout.size()`; a rank-0 layout is one chunk
/// of one pointer at the layout offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkDescriptor {
    loop_size: usize,
    loop_step: isize,
    chunk_count: usize,
    offsets: Vec<usize>,
}

impl ChunkDescriptor {
    /// Decompose the traversal of `layout` in `order`.
    pub fn of(layout: &StrideLayout, order: Order) -> Self {
        let plan = LoopPlan::new(layout, order);
        let offsets = plan.offsets();
        Self {
            loop_size: plan.loop_size,
            loop_step: plan.loop_step,
            chunk_count: plan.chunk_count,
            offsets,
        }
    }

    /// Pointers per run.
    #[inline]
    pub fn loop_size(&self) -> usize {
        self.loop_size
    }

    /// Distance between consecutive pointers of a run.
    #[inline]
    pub fn loop_step(&self) -> isize {
        self.loop_step
    }

    /// Number of runs.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Start pointer of every run, in traversal order.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn into_offsets(self) -> Vec<usize> {
        self.offsets
    }

    /// Traversal position at which each run starts (`k * loop_size`).
    pub fn chunk_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.chunk_count).map(move |k| k * self.loop_size)
    }

    /// Runs in traversal order.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        self.offsets.iter().map(move |&start| Chunk {
            start,
            len: self.loop_size,
            step: self.loop_step,
        })
    }

    /// All pointers, run after run.
    pub fn pointers(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks().flat_map(|chunk| chunk.pointers())
    }
}

// ============================================================================
// ChunkIterator (lazy)
// ============================================================================

/// Chunk decomposition producing run starts one at a time.
///
/// `loop_size`, `loop_step` and `chunk_count` are known up front; starts are
/// generated by an odometer over the outer axes.
#[derive(Clone, Debug)]
pub struct ChunkIterator {
    plan: LoopPlan,
    odometer: Odometer,
    position: usize,
}

impl ChunkIterator {
    /// Lazily decompose the traversal of `layout` in `order`.
    pub fn new(layout: &StrideLayout, order: Order) -> Self {
        let plan = LoopPlan::new(layout, order);
        let odometer = Odometer::new(plan.offset, &plan.outer_dims, &plan.outer_strides);
        Self {
            plan,
            odometer,
            position: 0,
        }
    }

    #[inline]
    pub fn loop_size(&self) -> usize {
        self.plan.loop_size
    }

    #[inline]
    pub fn loop_step(&self) -> isize {
        self.plan.loop_step
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.plan.chunk_count
    }

    /// Number of run starts produced so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.position < self.plan.chunk_count
    }

    /// Start pointer of the next run.
    pub fn next_offset(&mut self) -> Result<usize> {
        if self.position >= self.plan.chunk_count {
            return Err(LayoutError::IteratorExhausted);
        }
        let start = self.odometer.pointer();
        self.position += 1;
        if self.position < self.plan.chunk_count {
            self.odometer.advance();
        }
        Ok(start)
    }

    /// Next run as a [`Chunk`].
    pub fn next_chunk(&mut self) -> Result<Chunk> {
        let start = self.next_offset()?;
        Ok(Chunk {
            start,
            len: self.plan.loop_size,
            step: self.plan.loop_step,
        })
    }

    /// Every run start, computed eagerly with the mixed-radix sweep.
    ///
    /// Independent of how far the iterator has advanced.
    pub fn compute_chunk_offsets(&self) -> Vec<usize> {
        self.plan.offsets()
    }
}

impl Iterator for ChunkIterator {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        self.next_offset().ok()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plan.chunk_count - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIterator {}

impl FusedIterator for ChunkIterator {}
