//! Strided N-dimensional array layouts and order-aware traversal.
//!
//! A [`StrideLayout`] maps a logical multi-dimensional index onto a flat
//! position ("pointer") in a backing buffer through a base offset and one
//! stride per axis. This crate answers a single question for the array layer
//! built on top of it: *in which sequence of pointers do I visit the elements
//! of this layout, for a requested traversal [`Order`], and how do I group
//! those pointers into the longest possible contiguous runs?*
//!
//! # Core Types
//!
//! - [`Shape`]: Immutable list of dimension sizes with rank and element count
//! - [`StrideLayout`]: Shape + offset + strides, with view algebra
//!   (`permute`, `narrow`, `expand`, ...) and order-aware compaction
//! - [`Order`]: Traversal preference (`C`, `F`, storage order `S`, don't care `A`)
//! - [`PointerIterator`] family ([`PointerIter`], [`ScalarPointerIterator`],
//!   [`LoopPointerIterator`], [`StridePointerIterator`]): one pointer at a time
//! - [`ChunkDescriptor`] / [`ChunkIterator`]: the traversal decomposed into
//!   `chunk_count` runs of `loop_size` pointers spaced by `loop_step`
//! - [`Storage`]: The flat get/set contract of the backing buffer
//!
//! # Example
//!
//! ```rust
//! use strided_layout::{ChunkDescriptor, Order, Shape, StrideLayout};
//!
//! // A dense row-major 2x3 array.
//! let layout = StrideLayout::dense(Shape::new(&[2, 3]).unwrap(), 0, Order::C).unwrap();
//!
//! // Traversed in row-major order, the whole array is one contiguous run.
//! let loops = ChunkDescriptor::of(&layout, Order::C);
//! assert_eq!((loops.loop_size(), loops.loop_step(), loops.chunk_count()), (6, 1, 1));
//!
//! // Traversed column-major, every column is a run of 2 pointers spaced by 3.
//! let loops = ChunkDescriptor::of(&layout, Order::F);
//! assert_eq!((loops.loop_size(), loops.loop_step()), (2, 3));
//! assert_eq!(loops.offsets(), &[0, 1, 2]);
//!
//! let pointers: Vec<usize> = layout.ptr_iter(Order::F).collect();
//! assert_eq!(pointers, vec![0, 3, 1, 4, 2, 5]);
//! ```
//!
//! # Compaction
//!
//! Before traversal a layout is re-expressed "fastest axis first" for the
//! requested order and adjacent axes are merged whenever
//! `dim[k] * stride[k] == stride[k + 1]`. Axis 0 of the compacted layout is
//! then the inner contiguous run and the remaining axes are enumerated with
//! an odometer to produce run start pointers.

mod chunk;
mod fuse;
mod iter;
pub mod kernel;
mod layout;
mod order;
mod shape;
mod storage;

// ============================================================================
// Layout model
// ============================================================================
pub use layout::StrideLayout;
pub use order::Order;
pub use shape::Shape;

// ============================================================================
// Traversal
// ============================================================================
pub use chunk::{chunk_offsets, Chunk, ChunkDescriptor, ChunkIterator};
pub use iter::{
    LoopPointerIterator, PointerIter, PointerIterator, ScalarPointerIterator,
    StridePointerIterator,
};

// ============================================================================
// Storage contract
// ============================================================================
pub use storage::Storage;

// ============================================================================
// Constants
// ============================================================================

/// Inline capacity of the per-axis vectors kept by iterators.
///
/// Layouts with more axes than this still work, they just spill to the heap.
pub const INLINE_RANK: usize = 8;

/// Minimum number of elements before [`kernel::for_each_chunk_parallel`]
/// splits work across threads.
pub const MIN_PARALLEL_LEN: usize = 1 << 15;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while building or traversing layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Negative dimension, rank/stride length mismatch or element count overflow.
    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    /// A pointer or chunk iterator was advanced past its last element.
    #[error("iterator exhausted")]
    IteratorExhausted,

    /// The layout cannot be expressed or traversed (e.g. addresses below zero).
    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Axis out of range for the layout rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Axis permutation is not a permutation of `0..rank`.
    #[error("invalid permutation {0:?}")]
    InvalidPermutation(Vec<usize>),

    /// Logical index outside of its dimension.
    #[error("index {index} out of bounds for dim {dim}")]
    IndexOutOfBounds { index: usize, dim: usize },

    /// Half-open range `start..end` does not fit in a dimension.
    #[error("invalid range {start}..{end} for dim {dim}")]
    InvalidRange { start: usize, end: usize, dim: usize },

    /// Operation requires a size-1 axis.
    #[error("axis {axis} must have size 1, found {dim}")]
    NonUnitAxis { axis: usize, dim: usize },

    /// Shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Pointer is not produced by any logical index of the layout.
    #[error("pointer {0} is not addressed by the layout")]
    PointerNotInLayout(usize),
}

impl LayoutError {
    pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
        LayoutError::InvalidShape {
            reason: reason.into(),
        }
    }
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
