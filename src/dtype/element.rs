//! Element trait for mapping Rust types to DType

use super::{Complex64, Complex128, DType};
use bytemuck::{CheckedBitPattern, NoUninit};
use half::{bf16, f16};

mod sealed {
    pub trait Sealed {}
}

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to the runtime dtype tag stored
/// next to every buffer. Typed accessors (`mutable_data`, `data`, `copy_to`)
/// use `DTYPE` to size allocations and to reject mismatched reads.
///
/// The trait is sealed: every implementor is a plain value type without
/// padding whose size equals `DTYPE.size_in_bytes()`. `NoUninit` lets host
/// slices be uploaded as bytes; `CheckedBitPattern` validates bytes read back
/// (only 0 and 1 are valid for `bool`).
pub trait Element:
    sealed::Sealed + NoUninit + CheckedBitPattern + Send + Sync + 'static
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Zero value (all bytes zero)
    fn zero() -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident, $zero:expr;)*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn zero() -> Self {
                    $zero
                }
            }
        )*
    };
}

impl_element! {
    f64 => F64, 0.0;
    f32 => F32, 0.0;
    f16 => F16, f16::ZERO;
    bf16 => BF16, bf16::ZERO;
    i64 => I64, 0;
    i32 => I32, 0;
    i16 => I16, 0;
    i8 => I8, 0;
    u64 => U64, 0;
    u32 => U32, 0;
    u16 => U16, 0;
    u8 => U8, 0;
    bool => Bool, false;
    Complex64 => Complex64, Complex64::ZERO;
    Complex128 => Complex128, Complex128::ZERO;
}
