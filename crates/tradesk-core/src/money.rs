//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A ₹100.10 bill paid in three instalments of ₹33.37, ₹33.37, ₹33.36:    │
//! │    33.37 + 33.37 + 33.36 = 100.10000000000001  ❌ "due ₹-0.00"          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    3337 + 3337 + 3336 = 10010 paise  → due is exactly 0                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! The only place a fraction of a paisa can appear is `unit price × quantity`
//! when the quantity is fractional (2.5 kg at ₹33.33/kg). That product is
//! rounded to the nearest paisa, **half away from zero**
//! (₹83.325 → ₹83.33, -₹83.325 → -₹83.33).
//!
//! ## Bounds
//! Any single amount accepted from the outside is at most [`Money::MAX`]
//! (₹1 lakh crore). Multiplications that would leave i64 return `None` from
//! [`Money::checked_multiply_quantity`] and are rejected by validation.
//! The `+`/`-` operators saturate instead of panicking, so aggregates over
//! stored rows never abort a report.
//!
//! ## Usage
//! ```rust
//! use tradesk_core::money::Money;
//! use tradesk_core::quantity::Quantity;
//!
//! let unit_cost = Money::from_paise(5000); // ₹50.00
//! let total = unit_cost.checked_multiply_quantity(Quantity::from_units(10));
//! assert_eq!(total, Some(Money::from_paise(50000)));
//!
//! let parsed: Money = "12.5".parse().unwrap();
//! assert_eq!(parsed.paise(), 1250);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `collected - purchases` can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **`sqlx(transparent)`**: stored as a plain INTEGER column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Largest amount accepted for a single price, payment or total.
    pub const MAX: Money = Money(100_000_000_000_000);

    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ```rust
    /// use tradesk_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
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

    /// Subtracts, clamping the result at zero.
    ///
    /// Used wherever the domain forbids a negative balance, e.g. the
    /// remaining refund of a returned sale.
    ///
    /// ```rust
    /// use tradesk_core::money::Money;
    ///
    /// let owe = Money::from_paise(500);
    /// assert_eq!(owe.saturating_sub(Money::from_paise(800)), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Purchase: Sugar 2.5 kg @ ₹33.33/kg
    ///      │
    ///      ▼
    /// checked_multiply_quantity(2.500) ← THIS FUNCTION
    ///      │   3333 paise × 2500 milli = 8_332_500 / 1000 = 8332.5
    ///      ▼
    /// Total: ₹83.33 (half away from zero)
    /// ```
    ///
    /// Returns `None` when the rounded product does not fit in i64.
    pub fn checked_multiply_quantity(&self, qty: Quantity) -> Option<Money> {
        let scaled = (self.0 as i128).checked_mul(qty.milli() as i128)?;
        let half = Quantity::SCALE as i128 / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / Quantity::SCALE as i128
        } else {
            (scaled - half) / Quantity::SCALE as i128
        };
        i64::try_from(rounded).ok().map(Money)
    }

    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sums amounts, returning `None` on i64 overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a signed decimal string into an integer scaled by `10^decimals`.
///
/// Accepts `"12"`, `"12.5"`, `"-0.05"`, `"+3."`. Rejects exponents, separators,
/// and more fractional digits than `decimals`.
pub(crate) fn parse_fixed(input: &str, decimals: u32) -> Option<i64> {
    let input = input.trim();
    let (negative, digits) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (digits, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > decimals as usize {
        return None;
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let scale = 10_i64.checked_pow(decimals)?;
    let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let padding = 10_i64.checked_pow(decimals - frac.len() as u32)?;
        frac.parse::<i64>().ok()?.checked_mul(padding)?
    };

    let magnitude = whole_value.checked_mul(scale)?.checked_add(frac_value)?;
    Some(if negative { -magnitude } else { magnitude })
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, 2)
            .map(Money)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: format!("'{}' is not a decimal amount with at most 2 decimals", s.trim()),
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹12.50`.
///
/// For logs and CLI output; the dashboard does its own locale formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0.saturating_mul(count))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
        assert_eq!(Money::from_rupees(50).paise(), 5000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);
        assert_eq!((b - a).paise(), -500);
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        let owe = Money::from_paise(500);
        assert_eq!(owe.saturating_sub(Money::from_paise(200)).paise(), 300);
        assert_eq!(owe.saturating_sub(Money::from_paise(500)), Money::zero());
        assert_eq!(owe.saturating_sub(Money::from_paise(900)), Money::zero());
    }

    #[test]
    fn test_multiply_whole_quantity() {
        let unit_cost = Money::from_rupees(50);
        let total = unit_cost.checked_multiply_quantity(Quantity::from_units(10));
        assert_eq!(total, Some(Money::from_rupees(500)));
    }

    #[test]
    fn test_multiply_reports_overflow_instead_of_clamping() {
        let unit_cost = Money::from_paise(i64::MAX / 10);
        assert_eq!(unit_cost.checked_multiply_quantity(Quantity::from_units(1000)), None);
        assert_eq!(
            Money::from_paise(-(i64::MAX / 10)).checked_multiply_quantity(Quantity::from_units(1000)),
            None
        );
        assert_eq!(
            Money::MAX.checked_multiply_quantity(Quantity::from_units(1)),
            Some(Money::MAX)
        );
    }

    #[test]
    fn test_large_totals_add_without_panicking() {
        let half = Money::from_paise(i64::MAX / 2 + 1);
        assert_eq!((half + half).paise(), i64::MAX);
        assert_eq!(half.checked_add(half), None);
        assert_eq!(Money::checked_sum([half, half]), None);
        assert_eq!([half, half].iter().sum::<Money>().paise(), i64::MAX);

        let mut running = half;
        running += half;
        assert_eq!(running.paise(), i64::MAX);
        assert_eq!((Money::from_paise(i64::MIN) - half).paise(), i64::MIN);

        let small = [Money::from_paise(250), Money::from_paise(750)];
        assert_eq!(Money::checked_sum(small), Some(Money::from_paise(1000)));
    }

    #[test]
    fn test_multiply_fractional_quantity_rounds_half_away_from_zero() {
        // 3333 × 2.5 = 8332.5 paise → 8333
        let price = Money::from_paise(3333);
        let qty = Quantity::from_milli(2500);
        assert_eq!(price.checked_multiply_quantity(qty).map(|m| m.paise()), Some(8333));

        // 3333 × 0.001 = 3.333 paise → 3
        assert_eq!(price.checked_multiply_quantity(Quantity::from_milli(1)).map(|m| m.paise()), Some(3));

        // Negative side rounds away from zero too
        let credit = Money::from_paise(-3333);
        assert_eq!(credit.checked_multiply_quantity(qty).map(|m| m.paise()), Some(-8333));
    }

    #[test]
    fn test_repeated_partial_payments_do_not_drift() {
        let total = Money::from_paise(10010);
        let payments = [3337, 3337, 3336].map(Money::from_paise);
        let paid: Money = payments.iter().sum();
        assert_eq!(total - paid, Money::zero());
    }

    #[test]
    fn test_parse() {
        assert_eq!("12".parse::<Money>().unwrap().paise(), 1200);
        assert_eq!("12.5".parse::<Money>().unwrap().paise(), 1250);
        assert_eq!(" 0.05 ".parse::<Money>().unwrap().paise(), 5);
        assert_eq!("-3.05".parse::<Money>().unwrap().paise(), -305);
        assert_eq!(".5".parse::<Money>().unwrap().paise(), 50);

        assert!("".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("1e3".parse::<Money>().is_err());
        assert!("1,000".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Money::from_paise(100) > Money::from_paise(99));
        assert!(Money::zero() < Money::from_paise(1));
        let max = [5, 9, 3].map(Money::from_paise).into_iter().max();
        assert_eq!(max, Some(Money::from_paise(9)));
    }
}
