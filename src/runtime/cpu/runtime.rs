//! CPU runtime implementation

use crate::error::{Error, Result};
use crate::place::Place;
use crate::runtime::{Allocator, Runtime, TrackingAllocator};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of every host block (AVX-512 width)
const HOST_ALIGN: usize = 64;

/// Allocate a zeroed, aligned host block
pub(crate) fn alloc_host(size_bytes: usize) -> Option<u64> {
    let layout = AllocLayout::from_size_align(size_bytes, HOST_ALIGN).ok()?;
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        None
    } else {
        Some(ptr as u64)
    }
}

/// Free a block returned by [`alloc_host`]
pub(crate) fn dealloc_host(ptr: u64, size_bytes: usize) {
    if ptr == 0 || size_bytes == 0 {
        return;
    }

    match AllocLayout::from_size_align(size_bytes, HOST_ALIGN) {
        Ok(layout) => unsafe { dealloc(ptr as *mut u8, layout) },
        Err(_) => log::warn!("dealloc_host: invalid layout for {} bytes", size_bytes),
    }
}

/// CPU compute runtime
///
/// This is the runtime behind `Place::Host` and works on any platform.
/// Transfers are plain memory copies and complete before returning.
#[derive(Debug)]
pub struct CpuRuntime {
    allocator: TrackingAllocator,
}

impl CpuRuntime {
    /// Create a new CPU runtime
    pub fn new() -> Self {
        Self {
            allocator: TrackingAllocator::new(alloc_host, dealloc_host, None),
        }
    }
}

impl Default for CpuRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for CpuRuntime {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn place(&self) -> Place {
        Place::Host
    }

    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        self.allocator.allocate(size_bytes)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        self.allocator.deallocate(ptr, size_bytes)
    }

    fn copy_to_device(&self, src: &[u8], dst: u64) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if dst == 0 {
            return Err(Error::Backend("cpu copy_to_device: null destination".into()));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(&self, src: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if src == 0 {
            return Err(Error::Backend("cpu copy_from_device: null source".into()));
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn copy_within_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        if src == 0 || dst == 0 {
            return Err(Error::Backend("cpu copy_within_device: null pointer".into()));
        }

        unsafe {
            // Use copy (not copy_nonoverlapping) in case src and dst overlap
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        Ok(())
    }

    fn allocated_bytes(&self) -> usize {
        self.allocator.allocated_bytes()
    }
}
