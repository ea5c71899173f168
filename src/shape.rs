//! Array dimensionality: the ordered list of axis sizes.

use std::fmt;

use crate::order::Order;
use crate::{LayoutError, Result};

/// Immutable description of array dimensionality.
///
/// The element count is computed once at construction and always equals the
/// product of `dims` (`1` for a rank-0 scalar, `0` if any axis is empty).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Box<[usize]>,
    size: usize,
}

impl Shape {
    /// Create a shape from dimension sizes.
    ///
    /// Fails with [`LayoutError::InvalidShape`] if the element count does not
    /// fit in `usize`.
    pub fn new(dims: &[usize]) -> Result<Self> {
        let size = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                LayoutError::invalid_shape(format!("element count of {dims:?} overflows"))
            })?;
        Ok(Self {
            dims: dims.into(),
            size,
        })
    }

    /// Create a shape from signed dimension sizes, rejecting negative values.
    pub fn from_signed(dims: &[isize]) -> Result<Self> {
        let mut unsigned = Vec::with_capacity(dims.len());
        for (axis, &d) in dims.iter().enumerate() {
            if d < 0 {
                return Err(LayoutError::invalid_shape(format!(
                    "negative dimension {d} at axis {axis}"
                )));
            }
            unsigned.push(d as usize);
        }
        Self::new(&unsigned)
    }

    /// Shape derived from another valid shape by permuting, fusing or
    /// dropping unit axes; the element count cannot overflow.
    pub(crate) fn from_valid(dims: Vec<usize>) -> Self {
        let size = dims.iter().product();
        Self {
            dims: dims.into_boxed_slice(),
            size,
        }
    }

    /// The rank-0 shape of a single element.
    pub fn scalar() -> Self {
        Self {
            dims: Box::new([]),
            size: 1,
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of one axis.
    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.dims
            .get(axis)
            .copied()
            .ok_or(LayoutError::InvalidAxis {
                axis,
                rank: self.rank(),
            })
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of axes of size 1.
    pub fn unit_dim_count(&self) -> usize {
        self.dims.iter().filter(|&&d| d == 1).count()
    }

    /// Shape made of the axes `start..`; `narrow_dims(1)` drops the leading axis.
    pub fn narrow_dims(&self, start: usize) -> Result<Shape> {
        if start > self.rank() {
            return Err(LayoutError::InvalidAxis {
                axis: start,
                rank: self.rank(),
            });
        }
        Shape::new(&self.dims[start..])
    }

    /// Position of a logical index when the shape is enumerated in `order`.
    ///
    /// `S` and `A` fall back to the default order, a shape alone has no
    /// storage to consult.
    pub fn position(&self, order: Order, index: &[usize]) -> Result<usize> {
        self.check_index(index)?;
        let mut pos = 0usize;
        match Order::auto_fc(order) {
            Order::F => {
                for (&i, &d) in index.iter().zip(self.dims.iter()).rev() {
                    pos = pos * d + i;
                }
            }
            _ => {
                for (&i, &d) in index.iter().zip(self.dims.iter()) {
                    pos = pos * d + i;
                }
            }
        }
        Ok(pos)
    }

    /// Logical index found at `position` when the shape is enumerated in `order`.
    pub fn index(&self, order: Order, position: usize) -> Result<Vec<usize>> {
        if position >= self.size {
            return Err(LayoutError::IndexOutOfBounds {
                index: position,
                dim: self.size,
            });
        }
        let rank = self.rank();
        let mut index = vec![0usize; rank];
        let mut rest = position;
        match Order::auto_fc(order) {
            Order::F => {
                for axis in 0..rank {
                    index[axis] = rest % self.dims[axis];
                    rest /= self.dims[axis];
                }
            }
            _ => {
                for axis in (0..rank).rev() {
                    index[axis] = rest % self.dims[axis];
                    rest /= self.dims[axis];
                }
            }
        }
        Ok(index)
    }

    pub(crate) fn check_index(&self, index: &[usize]) -> Result<()> {
        if index.len() != self.rank() {
            return Err(LayoutError::invalid_shape(format!(
                "index of length {} for rank {}",
                index.len(),
                self.rank()
            )));
        }
        for (&i, &d) in index.iter().zip(self.dims.iter()) {
            if i >= d {
                return Err(LayoutError::IndexOutOfBounds { index: i, dim: d });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}
