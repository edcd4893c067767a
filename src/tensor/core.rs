//! Core Tensor type

use super::{Shape, Storage};
use crate::dtype::cast::cast_kernel;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::place::Place;
use crate::runtime;
use std::fmt;
use std::ptr::NonNull;

/// N-dimensional array handle bound to a place
///
/// A `Tensor` moves through three states:
///
/// - **Empty**: constructed, no shape, no buffer
/// - **Shaped**: `reshape` set the dimensions, nothing allocated yet
/// - **Allocated**: `mutable_data` bound a buffer with a dtype on a place
///
/// Allocation is lazy and the buffer is reused as long as the place, dtype
/// and byte size stay the same. `reshape` on an allocated tensor only changes
/// the logical shape; the buffer is replaced at the next `mutable_data`.
///
/// Cloning a `Tensor` shares the buffer. A handle that reallocates binds a
/// new buffer and leaves the old one (and its bytes) to the other holders.
///
/// # Example
///
/// ```ignore
/// use optensor::prelude::*;
///
/// let mut t = Tensor::new(Place::Host);
/// t.reshape(&[2, 3])?;
/// let ptr = t.mutable_data::<f32>()?;
/// // ... a kernel writes 6 floats through ptr ...
/// let on_host = t.copy_to::<f32>(Place::Host)?;
/// let as_int = t.cast(DType::I32)?;
/// ```
#[derive(Clone)]
pub struct Tensor {
    /// Logical shape, `None` until the first reshape
    shape: Option<Shape>,
    /// Target place for the next allocation
    place: Place,
    /// Bound buffer, `None` until the first allocation
    storage: Option<Storage>,
}

impl Tensor {
    /// Create an empty tensor targeting `place`
    ///
    /// Nothing is allocated and the place is not validated until the first
    /// `mutable_data` call.
    pub fn new(place: Place) -> Self {
        Self {
            shape: None,
            place,
            storage: None,
        }
    }

    /// Create a tensor on `place` holding a copy of `data`
    ///
    /// # Example
    ///
    /// ```ignore
    /// let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2], Place::Host)?;
    /// ```
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize], place: Place) -> Result<Self> {
        let mut tensor = Self::new(place);
        tensor.shape = Some(Shape::from_sizes(shape)?);
        tensor.copy_from_host(data)?;
        Ok(tensor)
    }

    /// Assemble a tensor around an existing buffer
    pub(crate) fn from_parts(storage: Storage, shape: Shape) -> Self {
        Self {
            shape: Some(shape),
            place: storage.place(),
            storage: Some(storage),
        }
    }

    // ===== Shape & Place =====

    /// Set the logical shape
    ///
    /// Never allocates. Fails with `InvalidShape` if any dimension is
    /// negative or the element count overflows `usize`, leaving the tensor
    /// unchanged. Pointers obtained before the
    /// call must be re-acquired with `mutable_data`.
    pub fn reshape(&mut self, shape: &[i64]) -> Result<()> {
        self.shape = Some(Shape::from_dims(shape)?);
        Ok(())
    }

    /// Get the shape (empty if the tensor was never reshaped)
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.shape.as_deref().unwrap_or(&[])
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Get the total number of elements
    ///
    /// 1 for a scalar, 0 if any dimension is 0 or the tensor was never
    /// reshaped.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.as_ref().map_or(0, Shape::numel)
    }

    /// Get the place of the bound buffer (or the target place if none)
    #[inline]
    pub fn place(&self) -> Place {
        self.place
    }

    /// Get the dtype bound to the buffer, `None` before the first allocation
    #[inline]
    pub fn dtype(&self) -> Option<DType> {
        self.storage.as_ref().map(Storage::dtype)
    }

    /// Bytes the current shape occupies at the bound dtype
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.dtype()
            .map_or(0, |d| self.size().saturating_mul(d.size_in_bytes()))
    }

    /// Check if `reshape` has been called
    #[inline]
    pub fn is_shaped(&self) -> bool {
        self.shape.is_some()
    }

    /// Check if a buffer is bound
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Get the bound buffer
    #[inline]
    pub(crate) fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    // ===== Allocation & Typed Access =====

    /// Get a writable pointer to a buffer of `size()` elements of `T`
    ///
    /// Allocates on the tensor's place if no buffer is bound, or if the bound
    /// buffer differs in dtype or byte size. Fresh buffers are zero-filled.
    /// Fails with `ShapeNotSet` before the first `reshape`.
    pub fn mutable_data<T: Element>(&mut self) -> Result<*mut T> {
        self.mutable_data_on(self.place)
    }

    /// Like [`Tensor::mutable_data`], but allocates on `place`
    ///
    /// Moving to a different place discards the previous contents. On
    /// failure (including `PlaceUnsupported`) the tensor is unchanged.
    pub fn mutable_data_on<T: Element>(&mut self, place: Place) -> Result<*mut T> {
        let storage = self.acquire(place, T::DTYPE)?;
        let ptr = typed_ptr::<T>(&storage);
        self.bind(storage);
        Ok(ptr)
    }

    /// Get a read pointer to the bound buffer
    ///
    /// Never allocates: fails with `UninitializedBuffer` if nothing is bound
    /// and with `DataTypeMismatch` if `T` is not the bound dtype.
    pub fn data<T: Element>(&self) -> Result<*const T> {
        let storage = self.storage.as_ref().ok_or(Error::UninitializedBuffer)?;
        check_dtype::<T>(storage)?;
        Ok(typed_ptr::<T>(storage) as *const T)
    }

    /// Fill the tensor from host memory
    ///
    /// Allocates like [`Tensor::mutable_data`] for `T`, then uploads `data`.
    /// `data.len()` must equal `size()`.
    pub fn copy_from_host<T: Element>(&mut self, data: &[T]) -> Result<()> {
        let shape = self.shape.as_ref().ok_or(Error::ShapeNotSet)?;
        if data.len() != shape.numel() {
            return Err(Error::shape_mismatch(shape, &[data.len()]));
        }

        let storage = self.acquire(self.place, T::DTYPE)?;
        if !data.is_empty() {
            storage.runtime().copy_to_device(bytemuck::cast_slice(data), storage.ptr())?;
            storage.runtime().synchronize()?;
        }
        self.bind(storage);
        Ok(())
    }

    /// Copy the tensor's elements to a Vec on the host
    ///
    /// Bytes that are not a valid `T` (anything but 0 or 1 in a `Bool`
    /// buffer filled through a raw pointer) are rejected with `Backend`.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let storage = self.current_storage()?;
        check_dtype::<T>(storage)?;

        let mut bytes = vec![0u8; self.size() * T::DTYPE.size_in_bytes()];
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let runtime = storage.runtime();
        runtime.copy_from_device(storage.ptr(), &mut bytes)?;
        runtime.synchronize()?;

        bytes
            .chunks_exact(T::DTYPE.size_in_bytes())
            .map(|chunk| {
                bytemuck::checked::try_pod_read_unaligned::<T>(chunk).map_err(|e| {
                    Error::Backend(format!("invalid {} value in buffer: {:?}", T::DTYPE, e))
                })
            })
            .collect()
    }

    // ===== Cross-Place Copy & Cast =====

    /// Copy into a new, independently owned tensor on `place`
    ///
    /// The result has the same shape and dtype and byte-identical contents.
    /// The call returns only after the destination is fully populated.
    pub fn copy_to<T: Element>(&self, place: Place) -> Result<Tensor> {
        let src = self.current_storage()?;
        check_dtype::<T>(src)?;

        let dst = Storage::new(self.size(), T::DTYPE, place)?;
        src.copy_into(&dst, dst.size_in_bytes())?;
        Ok(Self::from_parts(dst, self.shape_or_scalar()))
    }

    /// Convert every element into a new tensor of `target` on the same place
    ///
    /// Fails with `UnsupportedCast` for complex to non-complex conversions.
    /// Casting to the current dtype still produces a separate buffer.
    pub fn cast(&self, target: DType) -> Result<Tensor> {
        let src = self.current_storage()?;
        let from = src.dtype();
        if !from.can_cast_to(target) {
            return Err(Error::unsupported_cast(from, target));
        }

        let numel = self.size();
        let place = src.place();
        log::debug!("casting {} elements {} -> {} on {}", numel, from, target, place);

        // The kernel runs on host memory; device buffers are staged through it.
        let host_src = if place.is_host() {
            src.clone()
        } else {
            let staged = Storage::new(numel, from, Place::Host)?;
            src.copy_into(&staged, staged.size_in_bytes())?;
            staged
        };

        let host_dst = Storage::new(numel, target, Place::Host)?;
        // SAFETY: both blocks are 64-byte aligned host memory of numel elements
        // of their dtypes, and host_src holds valid values of `from`.
        unsafe {
            cast_kernel(
                host_src.ptr() as *const u8,
                host_dst.ptr() as *mut u8,
                numel,
                from,
                target,
            )?;
        }

        let out = if place.is_host() {
            host_dst
        } else {
            let on_device = Storage::new_on(src.runtime().clone(), numel, target)?;
            host_dst.copy_into(&on_device, on_device.size_in_bytes())?;
            on_device
        };
        Ok(Self::from_parts(out, self.shape_or_scalar()))
    }

    // ===== Internals =====

    /// Find or allocate a buffer for `place`/`dtype` at the current shape
    ///
    /// Does not modify the tensor, so a failure leaves it untouched.
    fn acquire(&self, place: Place, dtype: DType) -> Result<Storage> {
        let shape = self.shape.as_ref().ok_or(Error::ShapeNotSet)?;
        let len = shape.numel();

        if let Some(existing) = &self.storage {
            if existing.place() == place && existing.dtype() == dtype && existing.len() == len {
                log::trace!("reusing {} byte buffer on {}", existing.size_in_bytes(), place);
                return Ok(existing.clone());
            }
            log::debug!(
                "reallocating {:?} {} on {} for {:?} {} on {}",
                existing.len(),
                existing.dtype(),
                existing.place(),
                shape,
                dtype,
                place
            );
        }

        let runtime = runtime::runtime_for(place)?;
        Storage::new_on(runtime, len, dtype)
    }

    fn bind(&mut self, storage: Storage) {
        self.place = storage.place();
        self.storage = Some(storage);
    }

    /// Bound buffer, checked to still cover the current shape
    fn current_storage(&self) -> Result<&Storage> {
        let storage = self.storage.as_ref().ok_or(Error::UninitializedBuffer)?;
        if storage.len() < self.size() {
            return Err(Error::shape_mismatch(self.shape(), &[storage.len()]));
        }
        Ok(storage)
    }

    fn shape_or_scalar(&self) -> Shape {
        self.shape.clone().unwrap_or_default()
    }
}

fn check_dtype<T: Element>(storage: &Storage) -> Result<()> {
    if storage.dtype() == T::DTYPE {
        Ok(())
    } else {
        Err(Error::dtype_mismatch(storage.dtype(), T::DTYPE))
    }
}

/// Typed pointer to the start of a block; dangling for zero-size blocks
#[inline]
fn typed_ptr<T>(storage: &Storage) -> *mut T {
    if storage.ptr() == 0 {
        NonNull::<T>::dangling().as_ptr()
    } else {
        storage.ptr() as *mut T
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype())
            .field("place", &self.place)
            .field("storage", &self.storage)
            .finish()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dtype() {
            Some(dtype) => write!(f, "Tensor({:?}, dtype={}, place={})", self.shape(), dtype, self.place),
            None => write!(f, "Tensor({:?}, unallocated, place={})", self.shape(), self.place),
        }
    }
}
