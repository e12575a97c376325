//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cash drawers are counted in cents. Every price, tier, movement and    │
//! │  refund is an i64 number of cents; percentages are basis points.      │
//! │                                                                         │
//! │    $80.00 tier, 15% discount  →  8000 × 1500 / 10000 = 1200 cents      │
//! │    20 extra minutes of a 60 min / $80.00 tier                           │
//! │                              →  8000 × 20 / 60 = 2666.67 → 2667 cents  │
//! │                                                                         │
//! │  Every division rounds half up, in one place (this module).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kiosk_core::money::Money;
//!
//! let price = Money::from_cents(8000); // $80.00
//! let discount = price.percentage_of(1500); // 15%
//! assert_eq!((price - discount).cents(), 6800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::FULL_BPS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// Signed: refunds and withdrawals are negative when summed into a drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use kiosk_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use kiosk_core::money::Money;
    ///
    /// let line = Money::from_cents(2500).multiply_quantity(3);
    /// assert_eq!(line.cents(), 7500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ```rust
    /// use kiosk_core::money::Money;
    ///
    /// // 15% of $80.00
    /// assert_eq!(Money::from_cents(8000).percentage_of(1500).cents(), 1200);
    /// ```
    pub fn percentage_of(&self, bps: i64) -> Money {
        self.prorate(bps, FULL_BPS)
    }

    /// Scales this amount by `numerator / denominator`, rounded half up
    /// (half away from zero for negative amounts).
    ///
    /// Uses i128 so `cents × minutes` cannot overflow. A zero denominator
    /// yields zero.
    ///
    /// ```rust
    /// use kiosk_core::money::Money;
    ///
    /// // 20 minutes of a 60-minute $80.00 tier
    /// assert_eq!(Money::from_cents(8000).prorate(20, 60).cents(), 2667);
    /// ```
    pub fn prorate(&self, numerator: i64, denominator: i64) -> Money {
        if denominator == 0 {
            return Money::zero();
        }

        let product = self.0 as i128 * numerator as i128;
        let denominator = denominator as i128;
        let negative = (product < 0) != (denominator < 0);
        let (product, denominator) = (product.abs(), denominator.abs());
        let rounded = (product * 2 + denominator) / (denominator * 2);

        Money::from_cents(if negative { -rounded } else { rounded } as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display. Receipts go through `ConfigState::format_currency`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
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
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
