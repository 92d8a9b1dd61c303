//! 16.16 fixed-point arithmetic for the shaping engine.
//!
//! [`Fix16`] wraps [`I16F16`] and pins down every rounding decision, so the
//! same input produces the same output bit-for-bit on every target:
//!
//! - `+`, `-` and negation saturate.
//! - `*` rounds the 64-bit product to nearest and saturates.
//! - `/` rounds half away from zero and saturates; dividing by zero yields
//!   [`Fix16::MIN`] instead of panicking. Use [`Fix16::checked_div`] where a
//!   zero divisor needs its own handling.
//! - Trigonometry is integer CORDIC with 24 iterations in Q2.30.

use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use fixed::types::I16F16;
use fixed_macro::fixed;

const FRAC_BITS: u32 = 16;
const ONE_BITS: i32 = 1 << FRAC_BITS;

/// Q16 to Q30 shift used by the CORDIC kernels.
const CORDIC_SHIFT: u32 = 14;
const CORDIC_ITERATIONS: usize = 24;

/// `atan(2^-i)` in Q2.30.
const CORDIC_ATAN: [i64; CORDIC_ITERATIONS] = [
    843_314_857,
    497_837_829,
    263_043_837,
    133_525_159,
    67_021_687,
    33_543_516,
    16_775_851,
    8_388_437,
    4_194_283,
    2_097_149,
    1_048_576,
    524_288,
    262_144,
    131_072,
    65_536,
    32_768,
    16_384,
    8_192,
    4_096,
    2_048,
    1_024,
    512,
    256,
    128,
];

/// CORDIC gain reciprocal for 24 iterations in Q2.30.
const CORDIC_K: i64 = 652_032_874;

const HALF_PI_Q30: i64 = 1_686_629_713;

const E_TO_FOURTH: i32 = 3_578_144;
const RAD_TO_DEG_MULT: i32 = 3_754_936;
const DEG_TO_RAD_MULT: i32 = 1_144;

/// Signed 16.16 fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fix16(I16F16);

impl Fix16 {
    pub const ZERO: Self = Self(fixed!(0: I16F16));
    pub const ONE: Self = Self(fixed!(1: I16F16));
    pub const MIN: Self = Self(I16F16::MIN);
    pub const MAX: Self = Self(I16F16::MAX);
    /// Smallest positive value.
    pub const DELTA: Self = Self(I16F16::DELTA);
    pub const PI: Self = Self::from_bits(205_887);
    pub const HALF_PI: Self = Self::from_bits(102_944);
    pub const TWO_PI: Self = Self::from_bits(411_775);
    pub const E: Self = Self::from_bits(178_145);

    /// Wrap raw 16.16 bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self(I16F16::from_bits(bits))
    }

    /// Wrap an `I16F16`.
    #[inline]
    #[must_use]
    pub const fn from_fixed(value: I16F16) -> Self {
        Self(value)
    }

    /// Raw 16.16 bits.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> i32 {
        self.0.to_bits()
    }

    /// Integer to fixed-point, saturating outside `[-32768, 32767]`.
    #[inline]
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        if value > i16::MAX as i32 {
            Self::MAX
        } else if value < i16::MIN as i32 {
            Self::MIN
        } else {
            Self::from_bits(value << FRAC_BITS)
        }
    }

    /// Round to the nearest integer, halves away from zero.
    #[inline]
    #[must_use]
    pub const fn to_int_round(self) -> i32 {
        let bits = self.to_bits() as i64;
        let half = (ONE_BITS >> 1) as i64;
        let rounded = if bits >= 0 {
            (bits + half) / ONE_BITS as i64
        } else {
            (bits - half) / ONE_BITS as i64
        };
        rounded as i32
    }

    #[inline]
    fn saturate(wide: i64) -> Self {
        Self::from_bits(wide.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Absolute value; `MIN` saturates to `MAX`.
    #[inline]
    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// `self * self`.
    #[inline]
    #[must_use]
    pub fn sq(self) -> Self {
        self * self
    }

    /// Clamp into `[lo, hi]`.
    #[inline]
    #[must_use]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    /// Division that reports a zero divisor instead of returning [`Fix16::MIN`].
    #[inline]
    #[must_use]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs == Self::ZERO {
            None
        } else {
            Some(self / rhs)
        }
    }

    /// Square root, floored. A negative input returns the negated root of
    /// its magnitude.
    #[must_use]
    pub fn sqrt(self) -> Self {
        let bits = self.to_bits() as i64;
        let magnitude = bits.unsigned_abs() << FRAC_BITS;
        let root = isqrt(magnitude) as i64;
        if bits < 0 {
            Self::saturate(-root)
        } else {
            Self::saturate(root)
        }
    }

    /// Four-quadrant arctangent of `self / x`, in radians.
    #[must_use]
    pub fn atan2(self, x: Self) -> Self {
        let (y, x) = (self.to_bits() as i64, x.to_bits() as i64);
        if y == 0 {
            return if x >= 0 { Self::ZERO } else { Self::PI };
        }
        if x == 0 {
            return if y > 0 { Self::HALF_PI } else { -Self::HALF_PI };
        }

        let (mut xi, mut yi) = (x << FRAC_BITS, y << FRAC_BITS);
        let mut z = 0i64;
        if xi < 0 {
            // rotate into the right half-plane
            if yi > 0 {
                (xi, yi) = (yi, -xi);
                z = HALF_PI_Q30;
            } else {
                (xi, yi) = (-yi, xi);
                z = -HALF_PI_Q30;
            }
        }

        for (i, &step) in CORDIC_ATAN.iter().enumerate() {
            let dx = yi >> i;
            let dy = xi >> i;
            if yi > 0 {
                xi += dx;
                yi -= dy;
                z += step;
            } else {
                xi -= dx;
                yi += dy;
                z -= step;
            }
        }
        Self::saturate(q30_to_q16(z))
    }

    /// Arctangent in radians.
    #[inline]
    #[must_use]
    pub fn atan(self) -> Self {
        self.atan2(Self::ONE)
    }

    /// Sine and cosine of an angle in radians.
    #[must_use]
    pub fn sin_cos(self) -> (Self, Self) {
        if self == Self::ZERO {
            return (Self::ZERO, Self::ONE);
        }

        let two_pi = Self::TWO_PI.to_bits() as i64;
        let pi = Self::PI.to_bits() as i64;
        let half_pi = Self::HALF_PI.to_bits() as i64;

        let mut a = (self.to_bits() as i64).rem_euclid(two_pi);
        if a > pi {
            a -= two_pi;
        }
        let mut flip_cos = false;
        if a > half_pi {
            a = pi - a;
            flip_cos = true;
        } else if a < -half_pi {
            a = -pi - a;
            flip_cos = true;
        }

        let mut x = CORDIC_K;
        let mut y = 0i64;
        let mut z = a << CORDIC_SHIFT;
        for (i, &step) in CORDIC_ATAN.iter().enumerate() {
            let dx = y >> i;
            let dy = x >> i;
            if z >= 0 {
                x -= dx;
                y += dy;
                z -= step;
            } else {
                x += dx;
                y -= dy;
                z += step;
            }
        }

        let sin = Self::saturate(q30_to_q16(y));
        let cos = Self::saturate(q30_to_q16(x));
        (sin, if flip_cos { -cos } else { cos })
    }

    /// Sine of an angle in radians.
    #[inline]
    #[must_use]
    pub fn sin(self) -> Self {
        self.sin_cos().0
    }

    /// Cosine of an angle in radians.
    #[inline]
    #[must_use]
    pub fn cos(self) -> Self {
        self.sin_cos().1
    }

    /// Tangent. At the poles the zero cosine yields [`Fix16::MIN`].
    #[inline]
    #[must_use]
    pub fn tan(self) -> Self {
        let (sin, cos) = self.sin_cos();
        sin / cos
    }

    /// Sine of an angle in degrees.
    #[inline]
    #[must_use]
    pub fn sin_deg(self) -> Self {
        self.deg_to_rad().sin()
    }

    /// Cosine of an angle in degrees, computed as `sin_deg(90 - a)` so that
    /// both components of a 45 degree angle are identical.
    #[inline]
    #[must_use]
    pub fn cos_deg(self) -> Self {
        (Self::from_int(90) - self).sin_deg()
    }

    /// Radians to degrees.
    #[inline]
    #[must_use]
    pub fn rad_to_deg(self) -> Self {
        self * Self::from_bits(RAD_TO_DEG_MULT)
    }

    /// Degrees to radians.
    #[inline]
    #[must_use]
    pub fn deg_to_rad(self) -> Self {
        self * Self::from_bits(DEG_TO_RAD_MULT)
    }

    /// `e^self` by power series.
    #[must_use]
    pub fn exp(self) -> Self {
        let bits = self.to_bits();
        if bits == 0 {
            return Self::ONE;
        }
        if bits == ONE_BITS {
            return Self::E;
        }
        if bits >= 681_391 {
            return Self::MAX;
        }
        if bits <= -772_243 {
            return Self::ZERO;
        }

        let neg = bits < 0;
        let value = self.abs();
        let mut result = value + Self::ONE;
        let mut term = value;
        for i in 2..30 {
            term = term * (value / Self::from_int(i));
            result += term;
            let t = term.to_bits();
            if t < 500 && (i > 15 || t < 20) {
                break;
            }
        }
        if neg {
            Self::ONE / result
        } else {
            result
        }
    }

    /// Natural logarithm by Newton iteration on [`Fix16::exp`].
    ///
    /// Non-positive input yields [`Fix16::MIN`].
    #[must_use]
    pub fn ln(self) -> Self {
        if self <= Self::ZERO {
            return Self::MIN;
        }

        let e_to_fourth = Self::from_bits(E_TO_FOURTH);
        let mut value = self;
        let mut scaling = 0;
        while value > Self::from_int(100) {
            value = value / e_to_fourth;
            scaling += 4;
        }
        while value < Self::ONE {
            value = value * e_to_fourth;
            scaling -= 4;
        }

        let mut guess = Self::from_int(2);
        let mut count = 0;
        loop {
            let e = guess.exp();
            let mut delta = (value - e) / e;
            if delta > Self::from_int(3) {
                delta = Self::from_int(3);
            }
            guess += delta;
            let d = delta.to_bits();
            let done = !(d > 1 || d < -1);
            count += 1;
            if count > 10 || done {
                break;
            }
        }
        guess + Self::from_int(scaling)
    }

    /// `self` raised to `exp`.
    ///
    /// Integer exponents are computed by repeated squaring, so `x.pow(1)` is
    /// exactly `x`. Other exponents go through `exp(exp * ln(self))`.
    #[must_use]
    pub fn pow(self, exp: Self) -> Self {
        if exp == Self::ZERO {
            return Self::ONE;
        }
        if self == Self::ZERO {
            return Self::ZERO;
        }

        let bits = exp.to_bits();
        if bits & (ONE_BITS - 1) == 0 {
            let n = bits >> FRAC_BITS;
            let mut base = self;
            let mut remaining = n.unsigned_abs();
            let mut result = Self::ONE;
            while remaining > 0 {
                if remaining & 1 == 1 {
                    result = result * base;
                }
                remaining >>= 1;
                if remaining > 0 {
                    base = base.sq();
                }
            }
            return if n < 0 { Self::ONE / result } else { result };
        }

        (exp * self.ln()).exp()
    }
}

/// Round a Q2.30 value to Q16.16.
#[inline]
fn q30_to_q16(value: i64) -> i64 {
    (value + (1 << (CORDIC_SHIFT - 1))) >> CORDIC_SHIFT
}

/// Floor of the integer square root.
fn isqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    let mut root = 0u64;
    let mut rem = value;
    let mut bit = 1u64 << ((63 - value.leading_zeros()) & !1);
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

impl From<i16> for Fix16 {
    #[inline]
    fn from(value: i16) -> Self {
        Self::from_int(i32::from(value))
    }
}

impl From<u8> for Fix16 {
    #[inline]
    fn from(value: u8) -> Self {
        Self::from_int(i32::from(value))
    }
}

impl Add for Fix16 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Fix16 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Fix16 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let product = self.to_bits() as i64 * rhs.to_bits() as i64;
        Self::saturate((product + (1 << (FRAC_BITS - 1))) >> FRAC_BITS)
    }
}

impl Div for Fix16 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let divisor = rhs.to_bits() as i64;
        if divisor == 0 {
            return Self::MIN;
        }
        let numerator = (self.to_bits() as i64) << FRAC_BITS;
        let quotient = (numerator.abs() + divisor.abs() / 2) / divisor.abs();
        match (numerator < 0) == (divisor < 0) {
            true => Self::saturate(quotient),
            false => Self::saturate(-quotient),
        }
    }
}

impl Neg for Fix16 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl AddAssign for Fix16 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fix16 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fix16 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Fix16 {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl core::fmt::Debug for Fix16 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Fix16({})", self.0)
    }
}

impl core::fmt::Display for Fix16 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Fix16 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.0.to_num::<f32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fix16, b: Fix16, tolerance: i32) -> bool {
        (a.to_bits() - b.to_bits()).abs() <= tolerance
    }

    #[test]
    fn test_constants() {
        assert_eq!(Fix16::ONE.to_bits(), 65536);
        assert_eq!(Fix16::from_int(-3).to_bits(), -3 * 65536);
        assert_eq!(Fix16::from(255u8).to_bits(), 255 * 65536);
        assert_eq!(Fix16::from_int(40_000), Fix16::MAX);
    }

    #[test]
    fn test_add_sub_saturate() {
        assert_eq!(Fix16::MAX + Fix16::ONE, Fix16::MAX);
        assert_eq!(Fix16::MIN - Fix16::ONE, Fix16::MIN);
        assert_eq!(-Fix16::MIN, Fix16::MAX);
    }

    #[test]
    fn test_mul_rounds_and_saturates() {
        assert_eq!(Fix16::from_int(3) * Fix16::from_int(-2), Fix16::from_int(-6));
        // 1.5 bits * 0.5 = 0.75 bits -> rounds to 1
        assert_eq!((Fix16::from_bits(3) * Fix16::from_bits(32768)).to_bits(), 2);
        assert_eq!(Fix16::from_int(300) * Fix16::from_int(300), Fix16::MAX);
        assert_eq!(Fix16::from_int(-300) * Fix16::from_int(300), Fix16::MIN);
    }

    #[test]
    fn test_div() {
        assert_eq!(Fix16::ONE / Fix16::from_int(4), Fix16::from_bits(16384));
        assert_eq!((Fix16::ONE / Fix16::from_int(3)).to_bits(), 21845);
        assert_eq!((-Fix16::ONE / Fix16::from_int(3)).to_bits(), -21845);
        assert_eq!((Fix16::from_int(2) / Fix16::from_int(3)).to_bits(), 43691);
        assert_eq!(Fix16::ONE / Fix16::ZERO, Fix16::MIN);
        assert_eq!(Fix16::ONE.checked_div(Fix16::ZERO), None);
        assert_eq!(Fix16::from_int(1000) / Fix16::from_bits(1), Fix16::MAX);
    }

    #[test]
    fn test_to_int_round() {
        assert_eq!(Fix16::from_bits(32768).to_int_round(), 1);
        assert_eq!(Fix16::from_bits(32767).to_int_round(), 0);
        assert_eq!(Fix16::from_bits(-32768).to_int_round(), -1);
        assert_eq!(Fix16::from_int(32767).to_int_round(), 32767);
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(Fix16::from_int(4).sqrt(), Fix16::from_int(2));
        assert_eq!(Fix16::ONE.sqrt(), Fix16::ONE);
        assert_eq!(Fix16::from_int(2).sqrt().to_bits(), 92681);
        assert_eq!(Fix16::from_int(-9).sqrt(), Fix16::from_int(-3));
        assert_eq!(Fix16::ZERO.sqrt(), Fix16::ZERO);
    }

    #[test]
    fn test_atan2_axes() {
        assert_eq!(Fix16::ZERO.atan2(Fix16::ONE), Fix16::ZERO);
        assert_eq!(Fix16::ZERO.atan2(-Fix16::ONE), Fix16::PI);
        assert_eq!(Fix16::ONE.atan2(Fix16::ZERO), Fix16::HALF_PI);
        assert_eq!((-Fix16::ONE).atan2(Fix16::ZERO), -Fix16::HALF_PI);
    }

    #[test]
    fn test_atan_values() {
        // pi/4 = 51471.85
        assert!(close(Fix16::ONE.atan(), Fix16::from_bits(51472), 2));
        assert!(close((-Fix16::ONE).atan(), Fix16::from_bits(-51472), 2));
        // atan2(1, -1) = 3pi/4
        assert!(close(Fix16::ONE.atan2(-Fix16::ONE), Fix16::from_bits(154416), 3));
        assert!(close((-Fix16::ONE).atan2(-Fix16::ONE), Fix16::from_bits(-154416), 3));
    }

    #[test]
    fn test_sin_cos() {
        assert_eq!(Fix16::ZERO.sin_cos(), (Fix16::ZERO, Fix16::ONE));
        let (s, c) = Fix16::HALF_PI.sin_cos();
        assert!(close(s, Fix16::ONE, 2));
        assert!(close(c, Fix16::ZERO, 2));
        let (s, c) = Fix16::PI.sin_cos();
        assert!(close(s, Fix16::ZERO, 2));
        assert!(close(c, -Fix16::ONE, 2));
        // sin(-pi/6) = -0.5
        let (s, _) = (-(Fix16::PI / Fix16::from_int(6))).sin_cos();
        assert!(close(s, Fix16::from_bits(-32768), 3));
        // far outside one turn
        let (s, _) = (Fix16::PI * Fix16::from_int(20) + Fix16::HALF_PI).sin_cos();
        assert!(close(s, Fix16::ONE, 20));
    }

    #[test]
    fn test_degrees() {
        let forty_five = Fix16::from_int(45);
        assert_eq!(forty_five.sin_deg(), forty_five.cos_deg());
        assert!(close(Fix16::from_int(90).sin_deg(), Fix16::ONE, 2));
        assert!(close(Fix16::from_int(30).sin_deg(), Fix16::from_bits(32768), 8));
        assert!(close(Fix16::PI.rad_to_deg(), Fix16::from_int(180), 32));
        assert!(close(Fix16::from_int(180).deg_to_rad(), Fix16::PI, 300));
    }

    #[test]
    fn test_exp_ln() {
        assert_eq!(Fix16::ZERO.exp(), Fix16::ONE);
        assert_eq!(Fix16::ONE.exp(), Fix16::E);
        assert!(close(Fix16::from_int(2).exp(), Fix16::from_bits(484249), 16));
        assert!(close((-Fix16::ONE).exp(), Fix16::from_bits(24109), 4));
        assert_eq!(Fix16::from_int(20).exp(), Fix16::MAX);
        assert!(close(Fix16::E.ln(), Fix16::ONE, 4));
        assert!(close(Fix16::ONE.ln(), Fix16::ZERO, 4));
        assert!(close(Fix16::from_bits(32768).ln(), Fix16::from_bits(-45426), 8));
        assert_eq!(Fix16::ZERO.ln(), Fix16::MIN);
    }

    #[test]
    fn test_pow() {
        let x = Fix16::from_bits(40000);
        assert_eq!(x.pow(Fix16::ONE), x);
        assert_eq!(x.pow(Fix16::ZERO), Fix16::ONE);
        assert_eq!(Fix16::ZERO.pow(Fix16::from_bits(32768)), Fix16::ZERO);
        assert_eq!(Fix16::from_int(3).pow(Fix16::from_int(3)), Fix16::from_int(27));
        assert_eq!(Fix16::from_int(2).pow(Fix16::from_int(-1)), Fix16::from_bits(32768));
        // 0.25 ^ 0.5 = 0.5
        let root = Fix16::from_bits(16384).pow(Fix16::from_bits(32768));
        assert!(close(root, Fix16::from_bits(32768), 32));
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX), u32::MAX as u64);
    }
}
