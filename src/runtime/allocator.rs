//! Memory allocator trait and byte-accounting implementation

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory allocator for runtime backends
pub trait Allocator: Send + Sync {
    /// Allocate zero-filled memory of the given size
    ///
    /// Returns 0 for a zero-size request.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Deallocate memory
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Get the total allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

/// Allocator that delegates to raw allocation functions and tracks usage
///
/// An optional capacity turns requests that would exceed it into
/// `OutOfMemory` before the raw allocation function is called.
pub struct TrackingAllocator {
    allocate_fn: fn(usize) -> Option<u64>,
    deallocate_fn: fn(u64, usize),
    capacity: Option<usize>,
    allocated: AtomicUsize,
}

impl TrackingAllocator {
    /// Create a new tracking allocator
    pub fn new(
        allocate_fn: fn(usize) -> Option<u64>,
        deallocate_fn: fn(u64, usize),
        capacity: Option<usize>,
    ) -> Self {
        Self {
            allocate_fn,
            deallocate_fn,
            capacity,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Maximum number of bytes this allocator hands out, if limited
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn reserve(&self, size_bytes: usize) -> Result<()> {
        let capacity = self.capacity.unwrap_or(usize::MAX);
        self.allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(size_bytes)
                    .filter(|&total| total <= capacity)
            })
            .map(|_| ())
            .map_err(|_| Error::OutOfMemory { size: size_bytes })
    }
}

impl Allocator for TrackingAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        self.reserve(size_bytes)?;
        match (self.allocate_fn)(size_bytes) {
            Some(ptr) => Ok(ptr),
            None => {
                self.allocated.fetch_sub(size_bytes, Ordering::AcqRel);
                Err(Error::OutOfMemory { size: size_bytes })
            }
        }
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        (self.deallocate_fn)(ptr, size_bytes);
        self.allocated.fetch_sub(size_bytes, Ordering::AcqRel);
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TrackingAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingAllocator")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{alloc_host, dealloc_host};

    #[test]
    fn test_allocator_trait_bounds() {
        fn assert_allocator<A: Allocator>() {}
        assert_allocator::<TrackingAllocator>();
    }

    #[test]
    fn test_tracks_bytes() {
        let allocator = TrackingAllocator::new(alloc_host, dealloc_host, None);
        let a = allocator.allocate(128).unwrap();
        let b = allocator.allocate(64).unwrap();
        assert_eq!(allocator.allocated_bytes(), 192);

        allocator.deallocate(a, 128);
        assert_eq!(allocator.allocated_bytes(), 64);
        allocator.deallocate(b, 64);
        assert_eq!(allocator.allocated_bytes(), 0);
    }

    #[test]
    fn test_capacity_limit() {
        let allocator = TrackingAllocator::new(alloc_host, dealloc_host, Some(100));
        let a = allocator.allocate(80).unwrap();
        assert_eq!(
            allocator.allocate(40),
            Err(Error::OutOfMemory { size: 40 })
        );
        assert_eq!(allocator.allocated_bytes(), 80);

        allocator.deallocate(a, 80);
        let b = allocator.allocate(100).unwrap();
        allocator.deallocate(b, 100);
    }

    #[test]
    fn test_zero_allocation() {
        let allocator = TrackingAllocator::new(alloc_host, dealloc_host, Some(0));
        assert_eq!(allocator.allocate(0), Ok(0));
        allocator.deallocate(0, 0); // Should not panic
        assert_eq!(allocator.allocated_bytes(), 0);
    }
}
