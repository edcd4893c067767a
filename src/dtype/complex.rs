//! Complex number element types
//!
//! `Complex64` and `Complex128` are stored in interleaved format
//! (re, im, re, im...), the layout accelerator runtimes expect for
//! `float2` / `double2` buffers. Both are `Pod`, so buffers of them can be
//! viewed as bytes for transfers.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Implements a complex element type over one float width
macro_rules! impl_complex {
    ($name:ident, $float:ty, $doc_bits:literal) => {
        #[doc = concat!($doc_bits, "-bit complex number with ", stringify!($float), " real and imaginary parts")]
        #[repr(C)]
        #[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
        pub struct $name {
            /// Real part
            pub re: $float,
            /// Imaginary part
            pub im: $float,
        }

        impl $name {
            /// Zero complex number
            pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

            /// One (real unit)
            pub const ONE: Self = Self { re: 1.0, im: 0.0 };

            /// Create a new complex number
            #[inline]
            pub const fn new(re: $float, im: $float) -> Self {
                Self { re, im }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.im < 0.0 {
                    write!(f, "{}-{}i", self.re, -self.im)
                } else {
                    write!(f, "{}+{}i", self.re, self.im)
                }
            }
        }
    };
}

impl_complex!(Complex64, f32, "64");
impl_complex!(Complex128, f64, "128");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<Complex64>(), 8);
        assert_eq!(std::mem::size_of::<Complex128>(), 16);
        let data = [Complex64::new(1.0, 2.0)];
        let floats: &[f32] = bytemuck::cast_slice(&data);
        assert_eq!(floats, &[1.0, 2.0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Complex64::new(1.0, -2.0).to_string(), "1-2i");
        assert_eq!(Complex128::new(0.5, 3.0).to_string(), "0.5+3i");
    }
}
