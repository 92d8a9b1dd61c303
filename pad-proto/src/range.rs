//! Integer range remapping between controller-native and canonical ranges.
//!
//! Physical controllers report axes in all sorts of widths (8-bit unsigned
//! triggers, 10-bit signed sticks, 16-bit unsigned HID axes, ...). Input
//! adapters bring them into the canonical ranges ([`i16`] sticks, [`u8`]
//! triggers) with the helpers in this module.
//!
//! Values travel as `i64` and the scaling product is taken in `i128`, so no
//! intermediate can overflow, 32-bit ranges included.
//!
//! # Example
//!
//! ```
//! use pad_proto::range::{scale, scale_from_bits};
//!
//! // 8-bit trigger to a 16-bit signed axis
//! assert_eq!(scale::<i16, u8>(255), 32767);
//! assert_eq!(scale::<i16, u8>(0), -32768);
//!
//! // 10-bit signed stick to the canonical range
//! assert_eq!(scale_from_bits::<i16, i16>(511, 10), 32767);
//! ```

/// Integer type usable as a source or target range.
pub trait RangeInt: Copy + Ord {
    const MIN: Self;
    const MAX: Self;
    /// Center of the range: 0 for signed types, `MAX / 2 + 1` for unsigned.
    const MID: Self;
    const SIGNED: bool;
    const BITS: u32;

    fn to_i64(self) -> i64;

    /// Convert from `i64`, saturating at the type bounds.
    fn from_i64(value: i64) -> Self;
}

macro_rules! impl_range_int {
    ($($t:ty => $signed:expr),* $(,)?) => {
        $(
            impl RangeInt for $t {
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;
                const MID: Self = if $signed { 0 } else { <$t>::MAX / 2 + 1 };
                const SIGNED: bool = $signed;
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn from_i64(value: i64) -> Self {
                    value.clamp(<$t>::MIN as i64, <$t>::MAX as i64) as $t
                }
            }
        )*
    };
}

impl_range_int!(i8 => true, u8 => false, i16 => true, u16 => false, i32 => true, u32 => false);

/// Largest value representable in `bits` bits with the signedness of `T`.
#[must_use]
pub fn bits_max<T: RangeInt>(bits: u32) -> i64 {
    let bits = bits.clamp(1, T::BITS);
    if T::SIGNED {
        (1i64 << (bits - 1)) - 1
    } else {
        (1i64 << bits) - 1
    }
}

/// Smallest value representable in `bits` bits with the signedness of `T`.
#[must_use]
pub fn bits_min<T: RangeInt>(bits: u32) -> i64 {
    let bits = bits.clamp(1, T::BITS);
    if T::SIGNED {
        -(1i64 << (bits - 1))
    } else {
        0
    }
}

/// Clamp a wide value into `T`.
#[inline]
#[must_use]
pub fn clamp<T: RangeInt>(value: i64) -> T {
    T::from_i64(value)
}

/// Mirror a value around the center of its range.
///
/// Unsigned values map to `MAX - v`; signed values negate, with `MIN`
/// mapping to `MAX` so the result never overflows.
#[must_use]
pub fn invert<T: RangeInt>(value: T) -> T {
    if T::SIGNED {
        if value == T::MIN {
            T::MAX
        } else {
            T::from_i64(-value.to_i64())
        }
    } else {
        T::from_i64(T::MAX.to_i64() - value.to_i64())
    }
}

/// Linearly map `value` from `[min_from, max_from]` onto `[min_to, max_to]`.
///
/// The input is clamped to its source range first. A degenerate source range
/// maps everything to `min_to`.
#[must_use]
pub fn scale_between(value: i64, min_from: i64, max_from: i64, min_to: i64, max_to: i64) -> i64 {
    let span_from = i128::from(max_from) - i128::from(min_from);
    if span_from == 0 {
        return min_to;
    }
    let value = value.clamp(min_from.min(max_from), min_from.max(max_from));
    let offset = i128::from(value) - i128::from(min_from);
    let span_to = i128::from(max_to) - i128::from(min_to);
    // lies between min_to and max_to
    (offset * span_to / span_from + i128::from(min_to)) as i64
}

/// Map a value from the full range of `From` onto the full range of `To`.
#[must_use]
pub fn scale<To: RangeInt, From: RangeInt>(value: From) -> To {
    To::from_i64(scale_between(
        value.to_i64(),
        From::MIN.to_i64(),
        From::MAX.to_i64(),
        To::MIN.to_i64(),
        To::MAX.to_i64(),
    ))
}

/// Map a `bits`-wide value (carried in `From`) onto the full range of `To`.
#[must_use]
pub fn scale_from_bits<To: RangeInt, From: RangeInt>(value: From, bits: u32) -> To {
    To::from_i64(scale_between(
        value.to_i64(),
        bits_min::<From>(bits),
        bits_max::<From>(bits),
        To::MIN.to_i64(),
        To::MAX.to_i64(),
    ))
}

/// Map a value from the full range of `From` onto a `bits`-wide range carried in `To`.
#[must_use]
pub fn scale_to_bits<To: RangeInt, From: RangeInt>(value: From, bits: u32) -> To {
    To::from_i64(scale_between(
        value.to_i64(),
        From::MIN.to_i64(),
        From::MAX.to_i64(),
        bits_min::<To>(bits),
        bits_max::<To>(bits),
    ))
}

/// Shift-based conversions between the canonical widths.
///
/// These are cheaper than [`scale`] and are what most adapters use in their
/// per-report hot path. They differ from [`scale`] by at most one LSB.
pub mod shift {
    #[inline]
    #[must_use]
    pub const fn int16_to_uint8(value: i16) -> u8 {
        ((value as i32 + 32768) >> 8) as u8
    }

    #[inline]
    #[must_use]
    pub const fn uint8_to_int16(value: u8) -> i16 {
        ((value as i32) << 8).wrapping_sub(32768) as i16
    }

    #[inline]
    #[must_use]
    pub const fn int16_to_uint16(value: i16) -> u16 {
        (value as i32 + 32768) as u16
    }

    #[inline]
    #[must_use]
    pub const fn uint16_to_int16(value: u16) -> i16 {
        (value as i32 - 32768) as i16
    }

    #[inline]
    #[must_use]
    pub const fn uint16_to_uint8(value: u16) -> u8 {
        (value >> 8) as u8
    }

    #[inline]
    #[must_use]
    pub const fn uint8_to_uint16(value: u8) -> u16 {
        (value as u16) << 8
    }

    #[inline]
    #[must_use]
    pub const fn int8_to_int16(value: i8) -> i16 {
        (value as i16) << 8
    }

    #[inline]
    #[must_use]
    pub const fn int16_to_int8(value: i16) -> i8 {
        (value >> 8) as i8
    }
}
