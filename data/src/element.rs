//! Numeric element types

use std::{
    fmt::Debug,
    ops::{Add, Mul, Sub},
};

/// Floating-point type that fields can be made of
pub trait Element:
    Copy
    + Debug
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Additive identity
    const ZERO: Self;

    /// Human-readable precision name
    const PRECISION: &'static str;

    /// Convert a flat storage index into a value
    fn from_index(index: isize) -> Self;

    /// Convert a double-precision value, rounding if needed
    fn from_f64(value: f64) -> Self;

    /// Raw bit pattern, for exact comparisons
    fn to_bits_u64(self) -> u64;
}

macro_rules! impl_element {
    ($($ty:ty => $name:literal),*) => {
        $(
            impl Element for $ty {
                const ZERO: Self = 0.0;

                const PRECISION: &'static str = $name;

                #[inline]
                fn from_index(index: isize) -> Self {
                    index as $ty
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_bits_u64(self) -> u64 {
                    self.to_bits().into()
                }
            }
        )*
    };
}
impl_element!(f32 => "single", f64 => "double");
