//! Storage: place-bound memory blocks with Arc-based sharing

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::place::Place;
use crate::runtime::{self, Runtime};
use std::sync::Arc;

/// Reference-counted memory block on a place
///
/// Cloning a `Storage` shares the block. The block is returned to the runtime
/// that allocated it when the last reference is dropped, even if that runtime
/// has since been unregistered.
///
/// A block's dtype, place and size never change. Growing or retyping a tensor
/// binds a new block instead, so other holders never observe the change.
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    /// Raw pointer (device handle or host address cast to u64)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    /// Element type
    dtype: DType,
    /// Runtime that owns the memory
    runtime: Arc<dyn Runtime>,
    /// If true, we own this memory and should deallocate on drop
    owned: bool,
}

impl Storage {
    /// Allocate `len` zeroed elements of `dtype` on `place`
    ///
    /// Fails with `PlaceUnsupported` if no runtime is registered for `place`.
    pub fn new(len: usize, dtype: DType, place: Place) -> Result<Self> {
        Self::new_on(runtime::runtime_for(place)?, len, dtype)
    }

    /// Allocate `len` zeroed elements of `dtype` through `runtime`
    pub(crate) fn new_on(runtime: Arc<dyn Runtime>, len: usize, dtype: DType) -> Result<Self> {
        let size_bytes = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let ptr = runtime.allocate(size_bytes)?;
        log::debug!(
            "allocated {} bytes ({} x {}) on {}",
            size_bytes,
            len,
            dtype,
            runtime.place()
        );

        Ok(Self {
            inner: Arc::new(StorageInner {
                ptr,
                len,
                dtype,
                runtime,
                owned: true,
            }),
        })
    }

    /// Wrap existing memory without taking ownership
    ///
    /// # Safety
    /// - `ptr` must point to memory `runtime` can transfer from and to, valid
    ///   for `len` elements of `dtype` and aligned for that type
    /// - the memory must hold valid values of `dtype` (0 or 1 for `Bool`)
    /// - the memory must remain valid for the lifetime of this Storage and
    ///   every clone of it
    /// - the caller is responsible for eventual deallocation
    pub unsafe fn from_ptr(ptr: u64, len: usize, dtype: DType, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                ptr,
                len,
                dtype,
                runtime,
                owned: false,
            }),
        }
    }

    /// Get the raw pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.inner.ptr
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the place the block lives on
    #[inline]
    pub fn place(&self) -> Place {
        self.inner.runtime.place()
    }

    /// Get the runtime that owns the block
    #[inline]
    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.inner.runtime
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Whether this storage frees its memory on drop
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.inner.owned
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check if this is the only reference
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Check if two storages share one block
    #[inline]
    pub fn same_block(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copy the first `size_bytes` bytes of this block into `dst`
    ///
    /// Routes through the cheapest path for the pair of places and
    /// synchronizes both runtimes before returning, so `dst` is ready to read.
    pub(crate) fn copy_into(&self, dst: &Storage, size_bytes: usize) -> Result<()> {
        debug_assert!(size_bytes <= self.size_in_bytes());
        debug_assert!(size_bytes <= dst.size_in_bytes());
        if size_bytes == 0 {
            return Ok(());
        }

        let src_rt = self.runtime();
        let dst_rt = dst.runtime();
        let (from, to) = (self.place(), dst.place());
        log::debug!("copying {} bytes {} -> {}", size_bytes, from, to);

        if std::ptr::addr_eq(Arc::as_ptr(src_rt), Arc::as_ptr(dst_rt)) {
            src_rt.copy_within_device(self.ptr(), dst.ptr(), size_bytes)?;
        } else if from.is_host() {
            // SAFETY: host blocks are addressable and hold at least size_bytes.
            let src = unsafe { std::slice::from_raw_parts(self.ptr() as *const u8, size_bytes) };
            dst_rt.copy_to_device(src, dst.ptr())?;
        } else if to.is_host() {
            // SAFETY: as above; dst is a distinct block, so no aliasing.
            let out =
                unsafe { std::slice::from_raw_parts_mut(dst.ptr() as *mut u8, size_bytes) };
            src_rt.copy_from_device(self.ptr(), out)?;
        } else {
            let mut staging = vec![0u8; size_bytes];
            src_rt.copy_from_device(self.ptr(), &mut staging)?;
            src_rt.synchronize()?;
            dst_rt.copy_to_device(&staging, dst.ptr())?;
        }

        src_rt.synchronize()?;
        dst_rt.synchronize()
    }
}

impl Clone for Storage {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for StorageInner {
    fn drop(&mut self) {
        if self.owned && self.ptr != 0 {
            log::trace!(
                "releasing {} bytes on {}",
                self.len * self.dtype.size_in_bytes(),
                self.runtime.place()
            );
            self.runtime
                .deallocate(self.ptr, self.len * self.dtype.size_in_bytes());
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &format!("0x{:x}", self.inner.ptr))
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .field("place", &self.place())
            .field("owned", &self.inner.owned)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
