//! Import/export boundary for the host runtime
//!
//! The host framework hands buffers it already owns to an extension through
//! [`import`], and takes the extension's outputs back through [`export`].
//! Neither direction copies: both sides hold the same [`Storage`], and writes
//! through either are visible to the other until one of them reallocates.

use crate::error::{Error, Result};
use crate::tensor::{Shape, Storage, Tensor};

/// Wrap an existing block as a tensor of `shape`
///
/// The tensor's place and dtype are taken from the storage. Fails with
/// `InvalidShape` on a negative dimension and with `ShapeMismatch` if the
/// block holds fewer elements than `shape` requires.
///
/// A block larger than `shape` is accepted, but it stays shared only until
/// the tensor's next `mutable_data`: reuse needs an exact size match, so that
/// call binds a fresh block of `shape`'s size and the host's block no longer
/// sees the tensor's writes.
pub fn import(storage: Storage, shape: &[i64]) -> Result<Tensor> {
    let shape = Shape::from_dims(shape)?;
    if storage.len() < shape.numel() {
        return Err(Error::shape_mismatch(&shape, &[storage.len()]));
    }
    log::debug!(
        "importing {:?} {} block on {}",
        shape,
        storage.dtype(),
        storage.place()
    );
    Ok(Tensor::from_parts(storage, shape))
}

/// Hand a tensor's block back to the host runtime
///
/// Fails with `UninitializedBuffer` if the tensor has no buffer.
pub fn export(tensor: &Tensor) -> Result<ExportedTensor> {
    let storage = tensor.storage().ok_or(Error::UninitializedBuffer)?;
    Ok(ExportedTensor {
        storage: storage.clone(),
        shape: Shape::from(tensor.shape()),
    })
}

/// A tensor's block and shape as seen by the host runtime
#[derive(Clone, Debug)]
pub struct ExportedTensor {
    storage: Storage,
    shape: Shape,
}

impl ExportedTensor {
    /// The shared block
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Logical dimensions at the time of export
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Split into the block and its dimensions
    pub fn into_parts(self) -> (Storage, Shape) {
        (self.storage, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::place::Place;

    #[test]
    fn test_import_shares_block() {
        let storage = Storage::new(6, DType::F32, Place::Host).unwrap();
        let mut tensor = import(storage.clone(), &[2, 3]).unwrap();
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.dtype(), Some(DType::F32));
        assert_eq!(tensor.place(), Place::Host);

        // Same dtype and size: the imported block is reused, not replaced
        let ptr = tensor.mutable_data::<f32>().unwrap();
        assert_eq!(ptr as u64, storage.ptr());
        unsafe { *ptr.add(5) = 4.5 };

        let mut out = [0u8; 24];
        storage.runtime().copy_from_device(storage.ptr(), &mut out).unwrap();
        assert_eq!(&out[20..24], &4.5f32.to_ne_bytes());
    }

    #[test]
    fn test_import_errors() {
        let storage = Storage::new(4, DType::U8, Place::Host).unwrap();
        assert_eq!(
            import(storage.clone(), &[-1]).unwrap_err(),
            Error::InvalidShape { shape: vec![-1] }
        );
        assert_eq!(
            import(storage.clone(), &[2, 3]).unwrap_err(),
            Error::shape_mismatch(&[2, 3], &[4])
        );
        // A larger block is accepted until the next mutable_data
        let mut tensor = import(storage.clone(), &[3]).unwrap();
        assert_eq!(tensor.data::<u8>().unwrap() as u64, storage.ptr());
        let ptr = tensor.mutable_data::<u8>().unwrap();
        assert_ne!(ptr as u64, storage.ptr());
    }

    #[test]
    fn test_export() {
        let empty = Tensor::new(Place::Host);
        assert_eq!(export(&empty).unwrap_err(), Error::UninitializedBuffer);

        let tensor = Tensor::from_slice(&[1i64, 2, 3], &[3], Place::Host).unwrap();
        let exported = export(&tensor).unwrap();
        assert_eq!(exported.shape(), &[3]);
        assert_eq!(exported.storage().dtype(), DType::I64);
        assert_eq!(exported.storage().size_in_bytes(), 24);
        assert_eq!(exported.storage().ptr(), tensor.data::<i64>().unwrap() as u64);

        let (storage, shape) = exported.into_parts();
        assert_eq!(storage.ref_count(), 2);
        assert_eq!(shape.numel(), 3);
    }
}
