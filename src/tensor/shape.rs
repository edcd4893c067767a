//! Shape type: dimensions of a tensor

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Stack allocation threshold for dimensions
/// Most tensors have 4 or fewer dimensions, so we stack-allocate up to 4
pub(crate) const STACK_DIMS: usize = 4;

/// Shape type: dimensions of a tensor
///
/// An empty shape denotes a scalar with one element.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Shape(SmallVec<[usize; STACK_DIMS]>);

impl Shape {
    /// Create an empty (scalar) shape.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Build a shape from signed dimensions
    ///
    /// Rejects negative dimensions and shapes whose element count does not
    /// fit in `usize`.
    pub fn from_dims(dims: &[i64]) -> Result<Self> {
        let invalid = || Error::InvalidShape {
            shape: dims.to_vec(),
        };
        let dims = dims
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<std::result::Result<SmallVec<[usize; STACK_DIMS]>, _>>()
            .map_err(|_| invalid())?;
        checked_numel(&dims).ok_or_else(invalid)?;
        Ok(Self(dims))
    }

    /// Build a shape from unsigned dimensions, rejecting element-count overflow.
    pub fn from_sizes(dims: &[usize]) -> Result<Self> {
        match checked_numel(dims) {
            Some(_) => Ok(Self::from(dims)),
            None => Err(Error::InvalidShape {
                shape: dims
                    .iter()
                    .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
                    .collect(),
            }),
        }
    }

    /// View shape as a slice.
    pub fn as_slice(&self) -> &[usize] {
        self.0.as_slice()
    }

    /// Number of dimensions in this shape.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Number of elements: 1 for a scalar, 0 if any dimension is 0.
    ///
    /// Shapes built with `From` are not checked; a count that overflows
    /// saturates at `usize::MAX`, which no runtime can allocate.
    #[inline]
    pub fn numel(&self) -> usize {
        checked_numel(&self.0).unwrap_or(usize::MAX)
    }
}

/// Product of `dims`, or `None` on overflow
fn checked_numel(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self.0.as_slice()
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Self(value.into_iter().collect())
    }
}
