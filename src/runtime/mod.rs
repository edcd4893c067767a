//! Runtime backends that own memory on a place
//!
//! A tensor never touches memory directly. Every allocation, transfer and
//! synchronization goes through the [`Runtime`] registered for the tensor's
//! [`Place`].
//!
//! # Architecture
//!
//! ```text
//! registry (Place -> Arc<dyn Runtime>)
//! ├── CpuRuntime       (Place::Host, always registered)
//! ├── EmulatedRuntime  (device contract on host memory, registered on demand)
//! └── <host runtime>   (real accelerators, registered by the embedding application)
//! ```
//!
//! Runtimes are trait objects because a tensor's place is a runtime value:
//! `mutable_data_on` and `copy_to` choose the target place per call.

mod allocator;
pub mod cpu;
pub mod emulated;
mod registry;

pub use allocator::{Allocator, TrackingAllocator};
pub use cpu::CpuRuntime;
pub use emulated::{EmulatedConfig, EmulatedRuntime};
pub use registry::{is_supported, register, register_if_absent, runtime_for, unregister};

use crate::error::Result;
use crate::place::Place;
use std::fmt;

/// Memory and transfer backend for one place
///
/// Device pointers are opaque `u64` handles. A runtime may execute transfers
/// asynchronously, but [`Runtime::synchronize`] must not return until every
/// previously issued transfer is complete and visible.
///
/// # Example
///
/// ```ignore
/// let runtime = optensor::runtime::runtime_for(Place::Host)?;
/// let ptr = runtime.allocate(1024)?;
/// // ... use memory ...
/// runtime.deallocate(ptr, 1024);
/// ```
pub trait Runtime: Send + Sync + fmt::Debug {
    /// Human-readable name of this runtime
    fn name(&self) -> &'static str;

    /// The place this runtime allocates on
    fn place(&self) -> Place;

    /// Allocate zero-filled memory
    ///
    /// Returns 0 for a zero-size request and `Err(OutOfMemory)` if the
    /// allocation cannot be satisfied.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Deallocate memory returned by [`Runtime::allocate`]
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Copy host bytes into memory owned by this runtime
    fn copy_to_device(&self, src: &[u8], dst: u64) -> Result<()>;

    /// Copy memory owned by this runtime into host bytes
    fn copy_from_device(&self, src: u64, dst: &mut [u8]) -> Result<()>;

    /// Copy between two blocks owned by this runtime
    fn copy_within_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()>;

    /// Wait for all pending operations to complete
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    /// Bytes currently allocated through this runtime
    fn allocated_bytes(&self) -> usize {
        0
    }
}
