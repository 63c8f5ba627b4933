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
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    $10.00 / 3 = $3.33 (×3 = $9.99)  → Lost $0.01!                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Pesos                                            │
//! │    Prices carry no fractional unit in day-to-day retail here, so       │
//! │    Money is a whole number of pesos. All percentage math happens in    │
//! │    basis points with explicit rounding.                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cash Rounding
//! Cash drawers hold no coins below the smallest bill, so the amount the
//! customer actually pays is rounded to a bucket (500 by default):
//! ```rust
//! use punto_core::money::Money;
//!
//! let raw = Money::from_pesos(2700);
//! let charged = raw.round_to_bucket(Money::from_pesos(500));
//! assert_eq!(charged.pesos(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in whole pesos.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for returns and credit balances
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for snapshot/JSON serialization
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Variant price ──► LineItem.unit_price ──► effective price × quantity  │
/// │                                                                         │
/// │  Σ lines ──► subtotal ──► discount ──► balance ──► total ──► change    │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    ///
    /// let price = Money::from_pesos(1500);
    /// assert_eq!(price.pesos(), 1500);
    /// ```
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos)
    }

    /// Returns the value in whole pesos.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    ///
    /// let zero = Money::zero();
    /// assert_eq!(zero.pesos(), 0);
    /// assert!(zero.is_zero());
    /// ```
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
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    ///
    /// let return_line = Money::from_pesos(-550);
    /// assert_eq!(return_line.abs().pesos(), 550);
    /// ```
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the negated value.
    #[inline]
    pub const fn neg(&self) -> Self {
        Money(-self.0)
    }

    /// Clamps negative values to zero.
    ///
    /// Used by the pricing pipeline: a sale total never goes below zero
    /// even when returns outweigh purchases (the signed balance keeps
    /// that information).
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes a percentage of this amount.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    /// The +5000 provides half-up rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    /// use punto_core::types::Percent;
    ///
    /// let base = Money::from_pesos(3000);
    /// let discount = base.percent_of(Percent::from_bps(1000)); // 10%
    /// assert_eq!(discount.pesos(), 300);
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        // Use i128 to prevent overflow on large amounts
        // rate.bps() is basis points: 1000 = 10%
        let part = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_pesos(part as i64)
    }

    /// Subtracts a percentage from this amount.
    ///
    /// Used for the net amount a card processor deposits after its fee.
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    /// use punto_core::types::Percent;
    ///
    /// let total = Money::from_pesos(10000);
    /// let net = total.less_percent(Percent::from_bps(235)); // 2.35% fee
    /// assert_eq!(net.pesos(), 9765);
    /// ```
    pub fn less_percent(&self, rate: Percent) -> Money {
        *self - self.percent_of(rate)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    ///
    /// let unit_price = Money::from_pesos(1000);
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.pesos(), 3000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Rounds to the nearest multiple of `bucket`, half rounding up.
    ///
    /// Cash is settled in bucket-sized steps (no small change in the
    /// drawer). The result is always a multiple of the bucket and the
    /// adjustment never exceeds half a bucket. A bucket of 1 or less
    /// leaves the value untouched.
    ///
    /// ## Example
    /// ```rust
    /// use punto_core::money::Money;
    ///
    /// let bucket = Money::from_pesos(500);
    /// assert_eq!(Money::from_pesos(2700).round_to_bucket(bucket).pesos(), 2500);
    /// assert_eq!(Money::from_pesos(2750).round_to_bucket(bucket).pesos(), 3000);
    /// assert_eq!(Money::from_pesos(2500).round_to_bucket(bucket).pesos(), 2500);
    /// ```
    pub fn round_to_bucket(&self, bucket: Money) -> Money {
        let b = bucket.0;
        if b <= 1 {
            return *self;
        }
        // div_euclid/rem_euclid keep the math correct for negative values
        // (half always rounds toward +infinity)
        let floored = self.0.div_euclid(b);
        let remainder = self.0.rem_euclid(b);
        if remainder * 2 >= b {
            Money((floored + 1) * b)
        } else {
            Money(floored * b)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and error messages. Receipt formatting (thousands
/// separators, locale) is a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}", sign, self.0.abs())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
