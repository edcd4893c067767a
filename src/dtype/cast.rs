//! Element conversion rules and the host cast kernel
//!
//! Every element is routed through [`Scalar`], a lossless intermediate for
//! all supported dtypes (integers up to 64 bits fit in `i128`, every float
//! fits in `f64`). Conversion out of the intermediate follows Rust `as`
//! semantics: float to int truncates toward zero and saturates (NaN becomes
//! 0), int to int wraps, and bool maps to and from {0, 1}.

use super::{Complex64, Complex128, DType, Element};
use crate::error::{Error, Result};
use half::{bf16, f16};

/// Inputs at least this long are converted on the rayon pool
#[cfg(feature = "rayon")]
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Chunk size for parallel conversion
#[cfg(feature = "rayon")]
const PARALLEL_CHUNK: usize = 1 << 14;

/// Lossless intermediate value for one element
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Scalar {
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

/// Conversion of an element type to and from [`Scalar`]
pub(crate) trait CastElement: Element {
    fn to_scalar(self) -> Scalar;

    fn from_scalar(value: Scalar) -> Self;
}

macro_rules! impl_cast_int {
    ($($ty:ty),*) => {
        $(
            impl CastElement for $ty {
                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Int(self as i128)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => b as $ty,
                        Scalar::Int(i) => i as $ty,
                        Scalar::Float(f) => f as $ty,
                        Scalar::Complex(re, _) => re as $ty,
                    }
                }
            }
        )*
    };
}

impl_cast_int!(i64, i32, i16, i8, u64, u32, u16, u8);

macro_rules! impl_cast_float {
    ($($ty:ty),*) => {
        $(
            impl CastElement for $ty {
                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Float(self as f64)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => if b { 1.0 } else { 0.0 },
                        Scalar::Int(i) => i as $ty,
                        Scalar::Float(f) => f as $ty,
                        Scalar::Complex(re, _) => re as $ty,
                    }
                }
            }
        )*
    };
}

impl_cast_float!(f64, f32);

macro_rules! impl_cast_half {
    ($($ty:ty),*) => {
        $(
            impl CastElement for $ty {
                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Float(self.to_f64())
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => if b { <$ty>::ONE } else { <$ty>::ZERO },
                        Scalar::Int(i) => <$ty>::from_f64(i as f64),
                        Scalar::Float(f) => <$ty>::from_f64(f),
                        Scalar::Complex(re, _) => <$ty>::from_f64(re),
                    }
                }
            }
        )*
    };
}

impl_cast_half!(f16, bf16);

impl CastElement for bool {
    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(f) => f != 0.0,
            Scalar::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }
}

macro_rules! impl_cast_complex {
    ($($ty:ident => $float:ty),*) => {
        $(
            impl CastElement for $ty {
                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Complex(self.re as f64, self.im as f64)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => if b { $ty::ONE } else { $ty::ZERO },
                        Scalar::Int(i) => $ty::new(i as $float, 0.0),
                        Scalar::Float(f) => $ty::new(f as $float, 0.0),
                        Scalar::Complex(re, im) => $ty::new(re as $float, im as $float),
                    }
                }
            }
        )*
    };
}

impl_cast_complex!(Complex64 => f32, Complex128 => f64);

/// Binds `$T` to the Rust element type of `$dtype` and evaluates `$body`
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block) => {
        match $dtype {
            DType::F64 => {
                type $T = f64;
                $body
            }
            DType::F32 => {
                type $T = f32;
                $body
            }
            DType::F16 => {
                type $T = f16;
                $body
            }
            DType::BF16 => {
                type $T = bf16;
                $body
            }
            DType::I64 => {
                type $T = i64;
                $body
            }
            DType::I32 => {
                type $T = i32;
                $body
            }
            DType::I16 => {
                type $T = i16;
                $body
            }
            DType::I8 => {
                type $T = i8;
                $body
            }
            DType::U64 => {
                type $T = u64;
                $body
            }
            DType::U32 => {
                type $T = u32;
                $body
            }
            DType::U16 => {
                type $T = u16;
                $body
            }
            DType::U8 => {
                type $T = u8;
                $body
            }
            DType::Bool => {
                type $T = bool;
                $body
            }
            DType::Complex64 => {
                type $T = Complex64;
                $body
            }
            DType::Complex128 => {
                type $T = Complex128;
                $body
            }
        }
    };
}

/// Convert every element of `src` into `dst`
pub(crate) fn cast_elements<S: CastElement, D: CastElement>(src: &[S], dst: &mut [D]) {
    debug_assert_eq!(src.len(), dst.len());

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        if src.len() >= PARALLEL_THRESHOLD {
            dst.par_chunks_mut(PARALLEL_CHUNK)
                .zip(src.par_chunks(PARALLEL_CHUNK))
                .for_each(|(out, input)| {
                    for (o, &x) in out.iter_mut().zip(input) {
                        *o = D::from_scalar(x.to_scalar());
                    }
                });
            return;
        }
    }

    for (o, &x) in dst.iter_mut().zip(src) {
        *o = D::from_scalar(x.to_scalar());
    }
}

/// Cast `len` host elements from one dtype to another.
///
/// # Safety
/// - `src` must be valid for reads of `len` elements of `src_dtype`, aligned
///   for that type, and hold valid values of it
/// - `dst` must be valid for writes of `len` elements of `dst_dtype` and
///   aligned for that type
/// - `src` and `dst` must not overlap
pub(crate) unsafe fn cast_kernel(
    src: *const u8,
    dst: *mut u8,
    len: usize,
    src_dtype: DType,
    dst_dtype: DType,
) -> Result<()> {
    if !src_dtype.can_cast_to(dst_dtype) {
        return Err(Error::unsupported_cast(src_dtype, dst_dtype));
    }
    if len == 0 {
        return Ok(());
    }

    dispatch_dtype!(src_dtype, S => {
        dispatch_dtype!(dst_dtype, D => {
            let src_slice = unsafe { std::slice::from_raw_parts(src as *const S, len) };
            let dst_slice = unsafe { std::slice::from_raw_parts_mut(dst as *mut D, len) };
            cast_elements(src_slice, dst_slice);
        })
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast_vec<S: CastElement, D: CastElement>(src: &[S]) -> Vec<D> {
        let mut out = vec![D::zero(); src.len()];
        cast_elements(src, &mut out);
        out
    }

    #[test]
    fn test_float_to_int_truncates() {
        let out: Vec<i32> = cast_vec(&[3.9f32, -3.9, 0.5, -0.5]);
        assert_eq!(out, [3, -3, 0, 0]);
    }

    #[test]
    fn test_float_to_int_saturates() {
        let out: Vec<u8> = cast_vec(&[300.0f64, -5.0, f64::NAN]);
        assert_eq!(out, [255, 0, 0]);
    }

    #[test]
    fn test_int_to_int_wraps() {
        let out: Vec<i8> = cast_vec(&[200i32, -129]);
        assert_eq!(out, [-56, 127]);
        let out: Vec<u32> = cast_vec(&[-1i64]);
        assert_eq!(out, [u32::MAX]);
    }

    #[test]
    fn test_large_ints_stay_exact() {
        let big = i64::MAX - 1;
        let out: Vec<i64> = cast_vec(&[big]);
        assert_eq!(out, [big]);
        let out: Vec<u64> = cast_vec(&[u64::MAX]);
        assert_eq!(out, [u64::MAX]);
    }

    #[test]
    fn test_bool_conversions() {
        let out: Vec<f32> = cast_vec(&[true, false]);
        assert_eq!(out, [1.0, 0.0]);
        let out: Vec<bool> = cast_vec(&[0i32, 7, -1]);
        assert_eq!(out, [false, true, true]);
        let out: Vec<bool> = cast_vec(&[0.0f64, 0.25]);
        assert_eq!(out, [false, true]);
    }

    #[test]
    fn test_half_conversions() {
        let out: Vec<f16> = cast_vec(&[1.5f32, -2.0]);
        assert_eq!(out, [f16::from_f32(1.5), f16::from_f32(-2.0)]);
        let out: Vec<i16> = cast_vec(&[bf16::from_f32(7.75)]);
        assert_eq!(out, [7]);
    }

    #[test]
    fn test_real_to_complex() {
        let out: Vec<Complex128> = cast_vec(&[2i32, -1]);
        assert_eq!(out, [Complex128::new(2.0, 0.0), Complex128::new(-1.0, 0.0)]);
        let out: Vec<Complex64> = cast_vec(&[Complex128::new(1.5, -0.5)]);
        assert_eq!(out, [Complex64::new(1.5, -0.5)]);
    }

    #[test]
    fn test_kernel_rejects_complex_to_real() {
        let src = [Complex64::new(1.0, 1.0)];
        let mut dst = [0.0f32];
        let result = unsafe {
            cast_kernel(
                src.as_ptr() as *const u8,
                dst.as_mut_ptr() as *mut u8,
                1,
                DType::Complex64,
                DType::F32,
            )
        };
        assert_eq!(
            result,
            Err(Error::unsupported_cast(DType::Complex64, DType::F32))
        );
        assert_eq!(dst, [0.0]);
    }

    #[test]
    fn test_kernel_dispatch() {
        let src = [1.0f64, 2.5, -3.7];
        let mut dst = [0i64; 3];
        unsafe {
            cast_kernel(
                src.as_ptr() as *const u8,
                dst.as_mut_ptr() as *mut u8,
                3,
                DType::F64,
                DType::I64,
            )
            .unwrap();
        }
        assert_eq!(dst, [1, 2, -3]);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_path() {
        let src: Vec<i32> = (0..PARALLEL_THRESHOLD as i32 + 17).collect();
        let out: Vec<f64> = cast_vec(&src);
        assert_eq!(out.len(), src.len());
        assert!(out.iter().zip(&src).all(|(&o, &s)| o == s as f64));
    }
}
