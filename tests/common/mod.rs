//! Common test utilities
#![allow(dead_code)]

use optensor::place::Place;
use optensor::runtime::{self, EmulatedConfig, EmulatedRuntime, Runtime};
use std::sync::Arc;

/// Make sure an emulated device runtime is registered for `index`
///
/// Tests in one binary share the registry, so the first registration wins
/// and later calls return that runtime.
pub fn emulated_device(index: usize) -> (Place, Arc<dyn Runtime>) {
    let runtime = runtime::register_if_absent(Arc::new(EmulatedRuntime::new(
        index,
        EmulatedConfig::default(),
    )));
    (Place::Device(index), runtime)
}

/// Every place exercised by the cross-place tests
pub fn all_places() -> Vec<Place> {
    vec![Place::Host, emulated_device(0).0, emulated_device(1).0]
}

/// Read a tensor's bytes regardless of where it lives
pub fn tensor_bytes(tensor: &optensor::tensor::Tensor) -> Vec<u8> {
    let exported = optensor::interop::export(tensor).unwrap();
    let storage = exported.storage();
    let mut out = vec![0u8; tensor.size_in_bytes()];
    storage.runtime().copy_from_device(storage.ptr(), &mut out).unwrap();
    storage.runtime().synchronize().unwrap();
    out
}
