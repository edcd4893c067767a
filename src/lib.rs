//! # optensor
//!
//! **Device-aware tensors for custom operator extensions.**
//!
//! optensor gives extension authors a small tensor handle: describe a shape,
//! get a typed pointer on a place (host memory or an accelerator device),
//! move data between places, convert between element types. Buffer management
//! stays behind the [`runtime::Runtime`] trait.
//!
//! ## Features
//!
//! - **Lazy allocation**: buffers are created on the first `mutable_data` call
//!   and reused while place, dtype and size stay the same
//! - **Places**: host memory, plus any device with a registered runtime
//! - **Dtypes**: f64, f32, f16, bf16, integers, bool, complex
//! - **Cast**: numeric conversions with well-defined truncation and wrapping
//! - **Interop**: zero-copy import/export of blocks owned by the host framework
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use optensor::prelude::*;
//!
//! let mut t = Tensor::new(Place::Host);
//! t.reshape(&[2, 3])?;
//! t.copy_from_host(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
//!
//! let copy = t.copy_to::<f32>(Place::Host)?;
//! let ints = copy.cast(DType::I32)?;
//! assert_eq!(ints.to_vec::<i32>()?, [1, 2, 3, 4, 5, 6]);
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded host cast for large tensors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod interop;
pub mod place;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::place::Place;
    pub use crate::runtime::Runtime;
    pub use crate::tensor::Tensor;
}
