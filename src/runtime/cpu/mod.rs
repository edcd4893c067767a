//! CPU runtime implementation
//!
//! The CPU runtime backs [`crate::place::Place::Host`]. Memory comes from the
//! system allocator with 64-byte alignment so every element type, including
//! `Complex128`, can be viewed in place.

mod runtime;

pub use runtime::CpuRuntime;
pub(crate) use runtime::{alloc_host, dealloc_host};
