//! Saturating S16.15 fixed-point arithmetic
//!
//! Values are `i32` scaled by 2^15 (1 sign bit, 16 integer bits, 15 fractional
//! bits). Every operation saturates at [`Fixed::MIN`] / [`Fixed::MAX`] instead
//! of wrapping, and every rescaling (float conversion, product shift, quotient,
//! decay) rounds half to even.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

pub const FRACTIONAL_BITS: u32 = 15;
pub const SCALE: i32 = 1 << FRACTIONAL_BITS;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

#[inline]
fn saturate(x: i64) -> i32 {
    x.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Arithmetic shift right by `bits`, rounding half to even.
#[inline]
fn shr_round_even(x: i64, bits: u32) -> i64 {
    let floor = x >> bits;
    let rem = x - (floor << bits);
    let half = 1i64 << (bits - 1);
    if rem > half || (rem == half && floor & 1 == 1) {
        floor + 1
    } else {
        floor
    }
}

/// Integer division rounding half to even.
#[inline]
fn div_round_even(num: i64, den: i64) -> i64 {
    let q = num / den;
    let r = num % den;
    if r == 0 {
        return q;
    }
    let twice = r.abs() * 2;
    let d = den.abs();
    let step = if (num < 0) != (den < 0) { -1 } else { 1 };
    if twice > d || (twice == d && q & 1 != 0) {
        q + step
    } else {
        q
    }
}

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(SCALE);
    pub const MAX: Fixed = Fixed(i32::MAX);
    pub const MIN: Fixed = Fixed(i32::MIN);
    /// Smallest positive step (2^-15).
    pub const EPSILON: Fixed = Fixed(1);

    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Fixed(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Integer value, saturating outside the representable range.
    pub const fn from_int(x: i32) -> Self {
        let wide = (x as i64) << FRACTIONAL_BITS;
        if wide > i32::MAX as i64 {
            Fixed::MAX
        } else if wide < i32::MIN as i64 {
            Fixed::MIN
        } else {
            Fixed(wide as i32)
        }
    }

    /// Nearest representable value (ties to even). NaN maps to zero.
    pub fn from_f64(x: f64) -> Self {
        if x.is_nan() {
            return Fixed::ZERO;
        }
        let scaled = (x * SCALE as f64).round_ties_even();
        if scaled >= i32::MAX as f64 {
            Fixed::MAX
        } else if scaled <= i32::MIN as f64 {
            Fixed::MIN
        } else {
            Fixed(scaled as i32)
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Half of the value, rounded half to even.
    #[inline]
    pub fn half(self) -> Self {
        Fixed(shr_round_even(self.0 as i64, 1) as i32)
    }

    #[inline]
    pub fn abs(self) -> Self {
        Fixed(self.0.saturating_abs())
    }

    /// True when the value sits on either saturation rail.
    #[inline]
    pub fn is_saturated(self) -> bool {
        self.0 == i32::MAX || self.0 == i32::MIN
    }

    #[inline]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Fixed(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Fixed(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn saturating_mul(self, rhs: Self) -> Self {
        let wide = self.0 as i64 * rhs.0 as i64;
        Fixed(saturate(shr_round_even(wide, FRACTIONAL_BITS)))
    }

    /// Division saturating on overflow; `x / 0` saturates toward the sign of `x`.
    pub fn saturating_div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return match self.0.signum() {
                1 => Fixed::MAX,
                -1 => Fixed::MIN,
                _ => Fixed::ZERO,
            };
        }
        let num = (self.0 as i64) << FRACTIONAL_BITS;
        Fixed(saturate(div_round_even(num, rhs.0 as i64)))
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = self.saturating_sub(rhs);
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: Fixed) -> Fixed {
        self.saturating_mul(rhs)
    }
}

impl MulAssign for Fixed {
    #[inline]
    fn mul_assign(&mut self, rhs: Fixed) {
        *self = self.saturating_mul(rhs);
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, rhs: Fixed) -> Fixed {
        self.saturating_div(rhs)
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(self.0.saturating_neg())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

/// Unsigned 0.32 fraction used as an exponential decay multiplier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decay(u32);

impl Decay {
    /// Everything is cleared in one step.
    pub const ZERO: Decay = Decay(0);
    /// Closest representable value to 1.0.
    pub const ONE: Decay = Decay(u32::MAX);

    pub fn from_f64(x: f64) -> Self {
        if x.is_nan() || x <= 0.0 {
            return Decay::ZERO;
        }
        let scaled = (x * 4_294_967_296.0).round_ties_even();
        if scaled >= u32::MAX as f64 {
            Decay::ONE
        } else {
            Decay(scaled as u32)
        }
    }

    /// `exp(-dt / tau)`; a non-positive time constant decays to zero at once.
    pub fn exponential(dt: f64, tau: f64) -> Self {
        if tau <= 0.0 {
            return Decay::ZERO;
        }
        Decay::from_f64((-dt / tau).exp())
    }

    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 4_294_967_296.0
    }

    #[inline]
    pub fn apply(self, x: Fixed) -> Fixed {
        let wide = x.0 as i64 * self.0 as i64;
        Fixed(saturate(shr_round_even(wide, 32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_conversion_rounds_to_nearest() {
        assert_eq!(Fixed::from_f64(1.0), Fixed::ONE);
        assert_eq!(Fixed::from_f64(-100.0).to_bits(), -100 * SCALE);
        assert_eq!(Fixed::from_f64(0.04).to_bits(), 1311);
        // exactly half an lsb rounds to even
        assert_eq!(Fixed::from_f64(0.5 / SCALE as f64).to_bits(), 0);
        assert_eq!(Fixed::from_f64(1.5 / SCALE as f64).to_bits(), 2);
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
    }

    #[test]
    fn conversion_saturates() {
        assert_eq!(Fixed::from_f64(1.0e9), Fixed::MAX);
        assert_eq!(Fixed::from_f64(-1.0e9), Fixed::MIN);
        assert_eq!(Fixed::from_int(70_000), Fixed::MAX);
        assert_eq!(Fixed::from_int(-3), Fixed::from_f64(-3.0));
    }

    #[test]
    fn add_and_sub_saturate() {
        assert_eq!(Fixed::MAX + Fixed::ONE, Fixed::MAX);
        assert_eq!(Fixed::MIN - Fixed::ONE, Fixed::MIN);
        assert_eq!(-Fixed::MIN, Fixed::MAX);
        let x = Fixed::from_f64(2.5) + Fixed::from_f64(-1.25);
        assert_eq!(x, Fixed::from_f64(1.25));
    }

    #[test]
    fn mul_rounds_half_to_even() {
        let half = Fixed::from_f64(0.5);
        assert_eq!((Fixed::from_bits(1) * half).to_bits(), 0);
        assert_eq!((Fixed::from_bits(3) * half).to_bits(), 2);
        assert_eq!((Fixed::from_bits(-3) * half).to_bits(), -2);
        assert_eq!(Fixed::from_int(-7) * Fixed::from_int(6), Fixed::from_int(-42));
    }

    #[test]
    fn mul_saturates() {
        let big = Fixed::from_int(1_000);
        assert_eq!(big * big, Fixed::MAX);
        assert_eq!(big * -big, Fixed::MIN);
    }

    #[test]
    fn div_rounds_and_handles_zero() {
        assert_eq!(Fixed::from_int(1) / Fixed::from_int(4), Fixed::from_f64(0.25));
        assert_eq!(Fixed::from_int(-9) / Fixed::from_int(3), Fixed::from_int(-3));
        assert_eq!(Fixed::ONE / Fixed::ZERO, Fixed::MAX);
        assert_eq!(-Fixed::ONE / Fixed::ZERO, Fixed::MIN);
        assert_eq!(Fixed::ZERO / Fixed::ZERO, Fixed::ZERO);
        assert_eq!(Fixed::from_int(30_000) / Fixed::from_f64(0.001), Fixed::MAX);
    }

    #[test]
    fn half_rounds_to_even() {
        assert_eq!(Fixed::from_bits(3).half().to_bits(), 2);
        assert_eq!(Fixed::from_bits(5).half().to_bits(), 2);
        assert_eq!(Fixed::from_bits(-3).half().to_bits(), -2);
    }

    #[test]
    fn decay_multiplier() {
        let d = Decay::from_f64(0.5);
        assert_eq!(d.apply(Fixed::from_int(10)), Fixed::from_int(5));
        assert_eq!(Decay::ZERO.apply(Fixed::from_int(10)), Fixed::ZERO);
        assert_eq!(Decay::from_f64(1.5), Decay::ONE);
        let e = Decay::exponential(1.0, 1.0);
        assert!((e.to_f64() - (-1.0f64).exp()).abs() < 1e-9);
        assert_eq!(Decay::exponential(1.0, 0.0), Decay::ZERO);
    }

    #[test]
    fn saturation_rail_detection() {
        assert!(Fixed::MAX.is_saturated());
        assert!(Fixed::MIN.is_saturated());
        assert!(!Fixed::from_int(100).is_saturated());
    }
}
