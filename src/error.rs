//! Error types for optensor

use crate::dtype::DType;
use crate::place::Place;
use thiserror::Error;

/// Result type alias using optensor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tensor operations
///
/// Every variant is a synchronous, local failure. None of them are retried
/// internally and a failed operation leaves the tensor it was called on
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A dimension passed to `reshape` was negative
    #[error("Invalid shape {shape:?}: dimensions must be non-negative")]
    InvalidShape {
        /// The rejected shape
        shape: Vec<i64>,
    },

    /// Allocation requested before the tensor was ever reshaped
    #[error("Shape not set: call reshape() before mutable_data()")]
    ShapeNotSet,

    /// Read or transform requested before any allocation
    #[error("Tensor has no buffer: call mutable_data() before reading")]
    UninitializedBuffer,

    /// Typed access requested with a type other than the bound dtype
    #[error("DType mismatch: buffer holds {expected}, requested {got}")]
    DataTypeMismatch {
        /// Dtype bound to the buffer
        expected: DType,
        /// Dtype of the requested element type
        got: DType,
    },

    /// No runtime can allocate on the requested place
    #[error("Place {place} is not supported: no runtime registered")]
    PlaceUnsupported {
        /// The rejected place
        place: Place,
    },

    /// No numeric conversion is defined between the two dtypes
    #[error("Unsupported cast from {from} to {to}")]
    UnsupportedCast {
        /// Source dtype
        from: DType,
        /// Target dtype
        to: DType,
    },

    /// Buffer or data length does not match the current shape
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a dtype mismatch error
    pub fn dtype_mismatch(expected: DType, got: DType) -> Self {
        Self::DataTypeMismatch { expected, got }
    }

    /// Create an unsupported place error
    pub fn place_unsupported(place: Place) -> Self {
        Self::PlaceUnsupported { place }
    }

    /// Create an unsupported cast error
    pub fn unsupported_cast(from: DType, to: DType) -> Self {
        Self::UnsupportedCast { from, to }
    }
}
