//! Integration tests for dtype conversion

mod common;

use common::{all_places, emulated_device};
use half::f16;
use optensor::dtype::{Complex64, Complex128};
use optensor::prelude::*;

#[test]
fn test_end_to_end_scenario() {
    let mut t = Tensor::new(Place::Host);
    t.reshape(&[2, 3]).unwrap();
    let ptr = t.mutable_data::<f32>().unwrap();
    unsafe {
        for i in 0..6 {
            *ptr.add(i) = (i + 1) as f32;
        }
    }

    let copy = t.copy_to::<f32>(Place::Host).unwrap();
    assert_eq!(copy.shape(), &[2, 3]);
    assert_eq!(copy.to_vec::<f32>().unwrap(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    let ints = copy.cast(DType::I32).unwrap();
    assert_eq!(ints.shape(), &[2, 3]);
    assert_eq!(ints.dtype(), Some(DType::I32));
    assert_eq!(ints.to_vec::<i32>().unwrap(), [1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_standard_conversions() {
    let f = Tensor::from_slice(&[3.9f64, -3.9, 0.0], &[3], Place::Host).unwrap();
    assert_eq!(f.cast(DType::I64).unwrap().to_vec::<i64>().unwrap(), [3, -3, 0]);
    assert_eq!(
        f.cast(DType::Bool).unwrap().to_vec::<bool>().unwrap(),
        [true, true, false]
    );

    let b = Tensor::from_slice(&[true, false], &[2], Place::Host).unwrap();
    assert_eq!(b.cast(DType::I32).unwrap().to_vec::<i32>().unwrap(), [1, 0]);
    assert_eq!(b.cast(DType::F32).unwrap().to_vec::<f32>().unwrap(), [1.0, 0.0]);

    let i = Tensor::from_slice(&[300i32, -1], &[2], Place::Host).unwrap();
    assert_eq!(i.cast(DType::U8).unwrap().to_vec::<u8>().unwrap(), [44, 255]);
    assert_eq!(
        i.cast(DType::F16).unwrap().to_vec::<f16>().unwrap(),
        [f16::from_f32(300.0), f16::from_f32(-1.0)]
    );
}

#[test]
fn test_float_to_int_saturates() {
    let f = Tensor::from_slice(&[1e10f32, -1e10, f32::NAN], &[3], Place::Host).unwrap();
    assert_eq!(
        f.cast(DType::I32).unwrap().to_vec::<i32>().unwrap(),
        [i32::MAX, i32::MIN, 0]
    );
    assert_eq!(f.cast(DType::U16).unwrap().to_vec::<u16>().unwrap(), [u16::MAX, 0, 0]);
}

#[test]
fn test_complex_casts() {
    let r = Tensor::from_slice(&[2.0f32, -0.5], &[2], Place::Host).unwrap();
    assert_eq!(
        r.cast(DType::Complex128).unwrap().to_vec::<Complex128>().unwrap(),
        [Complex128::new(2.0, 0.0), Complex128::new(-0.5, 0.0)]
    );

    let c = Tensor::from_slice(&[Complex64::new(1.0, 2.0)], &[1], Place::Host).unwrap();
    assert_eq!(
        c.cast(DType::Complex128).unwrap().to_vec::<Complex128>().unwrap(),
        [Complex128::new(1.0, 2.0)]
    );
    assert_eq!(
        c.cast(DType::F32).unwrap_err(),
        Error::UnsupportedCast {
            from: DType::Complex64,
            to: DType::F32
        }
    );
}

#[test]
fn test_cast_keeps_place_and_shape() {
    for place in all_places() {
        let t = Tensor::from_slice(&[1u8, 2, 3, 4], &[2, 2], place).unwrap();
        let out = t.cast(DType::F64).unwrap();
        assert_eq!(out.place(), place);
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.to_vec::<f64>().unwrap(), [1.0, 2.0, 3.0, 4.0]);
    }
}

#[test]
fn test_same_dtype_cast_is_deep_copy() {
    let (device, _) = emulated_device(0);
    let mut t = Tensor::from_slice(&[1i16, 2], &[2], device).unwrap();
    let same = t.cast(DType::I16).unwrap();

    t.copy_from_host(&[8, 8]).unwrap();
    assert_eq!(same.to_vec::<i16>().unwrap(), [1, 2]);
}

#[test]
fn test_large_cast() {
    let n = 100_000;
    let data: Vec<i32> = (0..n).collect();
    let t = Tensor::from_slice(&data, &[n as usize], Place::Host).unwrap();
    let out = t.cast(DType::F64).unwrap().to_vec::<f64>().unwrap();
    assert_eq!(out.len(), n as usize);
    assert!(out.iter().enumerate().all(|(i, &x)| x == i as f64));
}
