//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    25.275 is stored as 25.27499999999999857891452847979962825775146484 │
//! │    so "round to cents" prints $25.27  ❌ WRONG!                          │
//! │                                                                         │
//! │  Integer cents cannot hold it either:                                   │
//! │    10% tax on $20.25 = $2.025 → already rounded before the total       │
//! │                                                                         │
//! │  OUR SOLUTION: Exact Decimals, Round On Display                         │
//! │    2.025 stays 2.025, total 25.275 stays 25.275,                        │
//! │    and only format_usd() turns it into "$25.28"                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use iicm_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.format_usd(), "$32.97");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::types::{ExchangeRate, Percent};

/// Symbol used for the secondary (KHR) currency display.
pub const RIEL_SYMBOL: &str = "៛";

/// Decimal places shown for USD amounts.
pub const USD_DISPLAY_DP: u32 = 2;

/// Decimal places shown for riel amounts.
pub const RIEL_DISPLAY_DP: u32 = 0;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount carried at full decimal precision.
///
/// ## Design Decisions
/// - **Decimal, not f64**: percentages of percentages stay exact
/// - **No rounding in arithmetic**: repeated recomputation never drifts
/// - **Saturating operations**: absurd user input cannot panic the form
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  VariantRecord.selling_price ──► LineItem.unit_price                    │
/// │                                       │                                 │
/// │                                       ▼                                 │
/// │                               LineItem.line_total ──► Totals.subtotal   │
/// │                                                            │            │
/// │         Totals.discount_amount ◄──── overall discount ◄────┤            │
/// │         Totals.tax             ◄──── tax rate       ◄──────┘            │
/// │         Totals.total ──► format_usd()  "$25.28"                         │
/// │                    └───► convert(rate) ──► format_riel()  "៛103,628"    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use iicm_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(250).format_usd(), "$2.50");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// The exact, unrounded amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Clamps negative amounts to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use iicm_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_cents(897));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0.saturating_mul(Decimal::from(qty)))
    }

    /// Returns `pct` percent of this amount, unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use iicm_core::money::Money;
    /// use iicm_core::types::Percent;
    ///
    /// let taxable = Money::from_cents(2025);            // $20.25
    /// let tax = taxable.percentage(Percent::from_whole(10));
    /// assert_eq!(tax.amount().to_string(), "2.025"); // not yet rounded
    /// ```
    pub fn percentage(&self, pct: Percent) -> Money {
        Money(self.0.saturating_mul(pct.value()) / Decimal::ONE_HUNDRED)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use iicm_core::money::Money;
    /// use iicm_core::types::Percent;
    ///
    /// let line = Money::from_cents(500);
    /// let discounted = line.apply_percentage_discount(Percent::from_whole(50));
    /// assert_eq!(discounted, Money::from_cents(250));
    /// ```
    pub fn apply_percentage_discount(&self, pct: Percent) -> Money {
        *self - self.percentage(pct)
    }

    /// Converts a USD amount into the secondary currency.
    #[inline]
    pub fn convert(&self, rate: ExchangeRate) -> Money {
        Money(self.0.saturating_mul(rate.value()))
    }

    /// Rounds to `dp` decimal places (half away from zero).
    ///
    /// Only display code should call this; totals themselves stay exact.
    pub fn rounded(&self, dp: u32) -> Decimal {
        let mut value = self
            .0
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(dp);
        value
    }

    /// Formats as US dollars with two decimal places: `$25.28`.
    pub fn format_usd(&self) -> String {
        let value = self.rounded(USD_DISPLAY_DP);
        let sign = if value.is_sign_negative() && !value.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{}${}", sign, value.abs())
    }

    /// Formats as riel with no decimals and grouped thousands: `៛103,628`.
    pub fn format_riel(&self) -> String {
        let value = self.rounded(RIEL_DISPLAY_DP);
        let sign = if value.is_sign_negative() && !value.is_zero() {
            "-"
        } else {
            ""
        };
        format!(
            "{}{}{}",
            sign,
            RIEL_SYMBOL,
            group_thousands(&value.abs().to_string())
        )
    }
}

/// Inserts `,` between groups of three digits.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the USD formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_usd())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
