//! Emulated device runtime
//!
//! Implements the device contract on host memory: blocks are only reachable
//! through the runtime's copy functions, every pointer is checked against
//! the blocks this runtime handed out, and transfers are tracked as pending
//! until [`Runtime::synchronize`] drains them. Useful for device places in
//! tests and on machines without an accelerator.
//!
//! ```ignore
//! use optensor::prelude::*;
//! use optensor::runtime::{self, EmulatedConfig, EmulatedRuntime};
//!
//! runtime::register(Arc::new(EmulatedRuntime::new(0, EmulatedConfig::default())));
//! let mut t = Tensor::new(Place::Device(0));
//! ```

use super::cpu::{alloc_host, dealloc_host};
use super::{Allocator, Runtime, TrackingAllocator};
use crate::error::{Error, Result};
use crate::place::Place;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configuration for an [`EmulatedRuntime`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EmulatedConfig {
    /// Maximum bytes the device can hold at once (`None` = unlimited)
    pub capacity: Option<usize>,
}

impl EmulatedConfig {
    /// Config with a byte capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

/// Device runtime backed by host memory
#[derive(Debug)]
pub struct EmulatedRuntime {
    index: usize,
    allocator: TrackingAllocator,
    /// Live blocks: base pointer -> size in bytes
    blocks: Mutex<BTreeMap<u64, usize>>,
    /// Transfers issued since the last synchronize
    pending: AtomicUsize,
}

impl EmulatedRuntime {
    /// Create an emulated runtime for device slot `index`
    pub fn new(index: usize, config: EmulatedConfig) -> Self {
        Self {
            index,
            allocator: TrackingAllocator::new(alloc_host, dealloc_host, config.capacity),
            blocks: Mutex::new(BTreeMap::new()),
            pending: AtomicUsize::new(0),
        }
    }

    /// Device slot index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of transfers not yet synchronized
    pub fn pending_transfers(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of live blocks
    pub fn live_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Ensure `[ptr, ptr + len)` lies inside one block owned by this runtime
    fn check_range(&self, ptr: u64, len: usize, op: &str) -> Result<()> {
        let blocks = self.blocks.lock();
        let owned = blocks
            .range(..=ptr)
            .next_back()
            .is_some_and(|(&base, &size)| {
                match (ptr.checked_add(len as u64), base.checked_add(size as u64)) {
                    (Some(end), Some(limit)) => end <= limit,
                    _ => false,
                }
            });

        if owned {
            Ok(())
        } else {
            Err(Error::Backend(format!(
                "{} {}: {} bytes at 0x{:x} outside any live block",
                self.place(),
                op,
                len,
                ptr
            )))
        }
    }

    fn issue(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }
}

impl Runtime for EmulatedRuntime {
    fn name(&self) -> &'static str {
        "emulated"
    }

    fn place(&self) -> Place {
        Place::Device(self.index)
    }

    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        let ptr = self.allocator.allocate(size_bytes)?;
        if ptr != 0 {
            self.blocks.lock().insert(ptr, size_bytes);
        }
        Ok(ptr)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 {
            return;
        }

        match self.blocks.lock().remove(&ptr) {
            Some(size) if size == size_bytes => {}
            Some(size) => {
                log::warn!(
                    "{}: block 0x{:x} freed with size {} (allocated {})",
                    self.place(),
                    ptr,
                    size_bytes,
                    size
                );
            }
            None => {
                log::warn!("{}: ignoring free of unknown block 0x{:x}", self.place(), ptr);
                return;
            }
        }
        self.allocator.deallocate(ptr, size_bytes);
    }

    fn copy_to_device(&self, src: &[u8], dst: u64) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        self.check_range(dst, src.len(), "copy_to_device")?;

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        self.issue();
        Ok(())
    }

    fn copy_from_device(&self, src: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        self.check_range(src, dst.len(), "copy_from_device")?;

        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        self.issue();
        Ok(())
    }

    fn copy_within_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()> {
        if size_bytes == 0 {
            return Ok(());
        }
        self.check_range(src, size_bytes, "copy_within_device")?;
        self.check_range(dst, size_bytes, "copy_within_device")?;

        unsafe {
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        self.issue();
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.pending.store(0, Ordering::Release);
        Ok(())
    }

    fn allocated_bytes(&self) -> usize {
        self.allocator.allocated_bytes()
    }
}

impl Drop for EmulatedRuntime {
    fn drop(&mut self) {
        // Blocks outlive their runtime only if a Storage leaked; reclaim them.
        let blocks = std::mem::take(self.blocks.get_mut());
        for (ptr, size) in blocks {
            self.allocator.deallocate(ptr, size);
        }
    }
}
