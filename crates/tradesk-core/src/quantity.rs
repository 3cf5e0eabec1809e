//! # Quantity Module
//!
//! Fixed-point quantities for stock and order lines.
//!
//! Traders buy 2.5 kg of sugar and sell 0.75 m of cloth, so quantities are
//! fractional. They are stored as thousandths of a unit (`milli`) so that
//! stock sums (`Σ purchased − Σ consumed`) are exact, same as `Money`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::parse_fixed;

/// A quantity in thousandths of a unit (`2.5 kg` = `2500`).
///
/// Signed: finished-goods stock may be oversold below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Number of `milli` in one whole unit.
    pub const SCALE: i64 = 1000;

    /// Largest quantity accepted on a single record (one billion units).
    pub const MAX: Quantity = Quantity(1_000_000_000 * Self::SCALE);

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 3)
            .map(Quantity)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "qty".to_string(),
                reason: format!("'{}' is not a decimal quantity with at most 3 decimals", s.trim()),
            })
    }
}

/// Shows the quantity without trailing zeros: `10`, `2.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let frac = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, frac.trim_end_matches('0'))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(self.0.saturating_neg())
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("10".parse::<Quantity>().unwrap(), Quantity::from_units(10));
        assert_eq!("2.5".parse::<Quantity>().unwrap().milli(), 2500);
        assert_eq!("0.125".parse::<Quantity>().unwrap().milli(), 125);
        assert!("0.0001".parse::<Quantity>().is_err());
        assert!("ten".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_display_trims_zeros() {
        assert_eq!(Quantity::from_units(10).to_string(), "10");
        assert_eq!(Quantity::from_milli(2500).to_string(), "2.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
        assert_eq!(Quantity::from_milli(-1500).to_string(), "-1.5");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let bought = [Quantity::from_milli(2500), Quantity::from_units(3)];
        let total: Quantity = bought.iter().sum();
        assert_eq!(total.milli(), 5500);

        let left = total - Quantity::from_units(6);
        assert!(left.is_negative());
        assert_eq!((-left).milli(), 500);
    }

    #[test]
    fn test_extreme_stock_movements_saturate() {
        let huge = Quantity::from_milli(i64::MAX - 1);
        assert_eq!((huge + Quantity::from_units(5)).milli(), i64::MAX);
        assert_eq!((Quantity::from_milli(i64::MIN) - Quantity::from_units(1)).milli(), i64::MIN);
        assert!(Quantity::MAX > Quantity::from_units(999_999_999));
    }
}
