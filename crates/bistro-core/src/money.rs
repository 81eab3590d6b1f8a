//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    38000 * 0.1 = 3800.0000000000005  ❌ WRONG!                          │
//! │                                                                         │
//! │  A bill that is off by a fraction of a đồng fails reconciliation.      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    38000 * 10 / 100 = 3800 exactly                                      │
//! │    Rounding happens once, explicitly, half-up                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::money::Money;
//!
//! let price = Money::from_minor(43_000);
//! let line = price * 2;
//! assert_eq!(line.minor(), 86_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (1 đồng for VND).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences between bills can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Saturating operators**: `+`, `-`, `*` and `sum` clamp at the `i64`
///   bounds instead of wrapping. Validated orders never get near them; use
///   [`Money::checked_add`] and [`Money::checked_mul`] where overflow has
///   to be reported.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.price_per_quantity ──► line total ──► subtotal                │
/// │                                                   │                     │
/// │                               promotion discount ─┤                     │
/// │                                                   ▼                     │
/// │                                   total ──► tax ──► total with tax      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// let price = Money::from_minor(38_000);
    /// assert_eq!(price.minor(), 38_000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(38_000);
    /// assert_eq!(unit_price.multiply_quantity(2).minor(), 76_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Returns `pct` percent of this amount, rounded half-up to the
    /// nearest minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * pct + 50) / 100`. Negative amounts round
    /// half away from zero so the result is symmetric.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(119_000).percentage(10).minor(), 11_900);
    /// // 12345 × 15% = 1851.75 → 1852
    /// assert_eq!(Money::from_minor(12_345).percentage(15).minor(), 1_852);
    /// // 25 × 10% = 2.5 → 3 (half-up)
    /// assert_eq!(Money::from_minor(25).percentage(10).minor(), 3);
    /// ```
    pub fn percentage(&self, pct: u32) -> Money {
        let scaled = i128::from(self.0) * i128::from(pct);
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        Money(rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Calculates tax for this amount, rounded half-up.
    ///
    /// ## Implementation
    /// `rate.bps()` is basis points: 800 = 8%.
    /// With rounding: `(amount * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    /// use bistro_core::types::TaxRate;
    ///
    /// let total = Money::from_minor(34_200);
    /// let tax = total.calculate_tax(TaxRate::from_bps(800)); // 8%
    /// assert_eq!(tax.minor(), 2_736);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large bills from overflowing during the multiply
        let tax = (i128::from(self.0) * i128::from(rate.bps()) + 5000) / 10000;
        Money::from_minor(tax.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Returns true when the two amounts differ by at most `epsilon`.
    ///
    /// A negative `epsilon` is treated as zero.
    #[inline]
    pub fn within(&self, other: Money, epsilon: i64) -> bool {
        self.0.abs_diff(other.0) <= epsilon.max(0).unsigned_abs()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money with thousands separators and the đồng sign, e.g. `34,200₫`.
///
/// ## Note
/// This is for logs and error messages. The frontend does its own
/// locale-aware formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}₫", sign, grouped)
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

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
