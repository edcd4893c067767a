//! Tensor types and operations
//!
//! This module provides the core `Tensor` type, a lazily allocated
//! n-dimensional buffer bound to a place (host or device).

mod core;
mod shape;
mod storage;

pub use core::Tensor;
pub use shape::Shape;
pub use storage::Storage;
