//! Fixed-point arithmetic for deterministic simulation.
//!
//! Money, hit points, organization, war score and game time are all `Fixed`.
//! Floats only appear at the boundary: converting a frame delta on the way in
//! and formatting for display on the way out.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Fixed-point value with scale 10000.
///
/// 0.25 is stored as 2500, 1.0 as 10000. Products and quotients go through an
/// i128 intermediate so game-sized values never overflow.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed(pub i64);

impl Fixed {
    /// Scale factor: 10000 = 1.0
    pub const SCALE: i64 = 10000;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(10000);
    pub const HALF: Fixed = Fixed(5000);
    pub const HUNDRED: Fixed = Fixed(100 * 10000);

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Create from integer (e.g., 5 → 50_000)
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Fixed(v * Self::SCALE)
    }

    /// Exact `num / den` as a fixed value, truncated toward zero.
    ///
    /// `from_ratio(3, 10)` is 0.3. A zero denominator yields ZERO.
    #[inline]
    pub const fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Fixed::ZERO;
        }
        Fixed(((num as i128 * Self::SCALE as i128) / den as i128) as i64)
    }

    /// Convert from f64 (boundary only, not in sim logic).
    ///
    /// Rounds to the nearest raw step. NaN and infinities become ZERO,
    /// out-of-range values saturate.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        if !v.is_finite() {
            return Fixed::ZERO;
        }

        let scaled = (v * Self::SCALE as f64).round();
        if scaled >= i64::MAX as f64 {
            return Fixed(i64::MAX);
        }
        if scaled <= i64::MIN as f64 {
            return Fixed(i64::MIN);
        }

        Fixed(scaled as i64)
    }

    /// Convert to f64 (display only)
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Truncate to integer (rounds toward zero)
    #[inline]
    pub const fn to_int(self) -> i64 {
        self.0 / Self::SCALE
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Clamps negative values to ZERO.
    #[inline]
    pub fn non_negative(self) -> Fixed {
        if self.0 < 0 {
            Fixed::ZERO
        } else {
            self
        }
    }

    /// Multiply two fixed-point values: (a × b) / SCALE
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Fixed) -> Fixed {
        self * other
    }

    /// Multiply by a plain integer without rescaling.
    #[inline]
    pub const fn mul_int(self, k: i64) -> Fixed {
        Fixed(self.0 * k)
    }

    /// Divide by a plain integer without rescaling. Division by zero yields ZERO.
    #[inline]
    pub const fn div_int(self, k: i64) -> Fixed {
        if k == 0 {
            return Fixed::ZERO;
        }
        Fixed(self.0 / k)
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0 + other.0)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Fixed) {
        self.0 += other.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0 - other.0)
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Fixed) {
        self.0 -= other.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, other: Fixed) -> Fixed {
        Fixed((self.0 as i128 * other.0 as i128 / Fixed::SCALE as i128) as i64)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, other: Fixed) -> Fixed {
        if other.0 == 0 {
            return Fixed::ZERO;
        }
        Fixed((self.0 as i128 * Fixed::SCALE as i128 / other.0 as i128) as i64)
    }
}

impl std::iter::Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Fixed {
        iter.fold(Fixed::ZERO, |acc, x| acc + x)
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f64())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Fixed::ZERO.0, 0);
        assert_eq!(Fixed::ONE.0, 10000);
        assert_eq!(Fixed::HALF.0, 5000);
        assert_eq!(Fixed::HUNDRED, Fixed::from_int(100));
    }

    #[test]
    fn test_from_ratio() {
        assert_eq!(Fixed::from_ratio(3, 10), Fixed(3000));
        assert_eq!(Fixed::from_ratio(1, 3), Fixed(3333));
        assert_eq!(Fixed::from_ratio(7, 0), Fixed::ZERO);
    }

    #[test]
    fn test_from_float_edge_cases() {
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(f64::INFINITY), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(1e30), Fixed(i64::MAX));
        assert_eq!(Fixed::from_f64(-1e30), Fixed(i64::MIN));
        assert_eq!(Fixed::from_f64(0.016_666), Fixed(167));
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(Fixed::from_int(2) * Fixed::from_int(3), Fixed::from_int(6));
        assert_eq!(Fixed::HALF * Fixed::HALF, Fixed(2500));
        assert_eq!(Fixed::from_int(6) / Fixed::from_int(2), Fixed::from_int(3));
        assert_eq!(Fixed::from_int(6).div_int(4), Fixed(15000));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Fixed::from_int(-3).non_negative(), Fixed::ZERO);
        assert_eq!(Fixed::from_int(3).non_negative(), Fixed::from_int(3));
    }

    #[test]
    fn test_sum() {
        let total: Fixed = [Fixed::ONE, Fixed::HALF, Fixed::HALF].into_iter().sum();
        assert_eq!(total, Fixed::from_int(2));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn game_value() -> impl Strategy<Value = i64> {
            -1_000_000..=1_000_000i64
        }

        proptest! {
            #[test]
            fn mul_is_commutative(a in game_value(), b in game_value()) {
                let x = Fixed::from_int(a);
                let y = Fixed::from_int(b);
                prop_assert_eq!(x * y, y * x);
            }

            #[test]
            fn mul_one_is_identity(a in game_value()) {
                prop_assert_eq!(Fixed::from_int(a) * Fixed::ONE, Fixed::from_int(a));
            }

            #[test]
            fn div_zero_is_safe(a in game_value()) {
                prop_assert_eq!(Fixed::from_int(a) / Fixed::ZERO, Fixed::ZERO);
            }

            #[test]
            fn from_f64_never_panics(f in proptest::num::f64::ANY) {
                let _ = Fixed::from_f64(f);
            }

            /// Splitting a quantity into n equal shares never hands out more than the whole.
            #[test]
            fn div_int_shares_never_exceed_total(raw in 0..=1_000_000_000i64, n in 1..=64i64) {
                let total = Fixed::from_raw(raw);
                let share = total.div_int(n);
                prop_assert!(share.mul_int(n) <= total);
            }
        }
    }
}
