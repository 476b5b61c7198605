//! Money and percentage types with precision guarantees for underwriting math.
//!
//! # Design Rationale
//! All monetary values and percentages use `Decimal` to avoid floating-point
//! errors. We define newtypes for semantic clarity and type safety, mirroring
//! the approach used throughout the calculation core.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Represents a monetary amount. Internally carries full precision;
/// callers quantize to (15,2) at persistence boundaries via [`Money::round_cents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(dec!(0));

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Money(value)
    }

    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    #[inline]
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Round to nearest cent using banker's rounding (round half to even).
    #[inline]
    pub fn round_cents(&self) -> Self {
        Money(self.0.round_dp(2))
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < dec!(0)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == dec!(0)
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    #[inline]
    pub fn clamp_zero(self) -> Self {
        self.max(Money::ZERO)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl Add for Money {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Decimal) -> Self::Output {
        Money(self.0 * rhs)
    }
}

impl Div<Decimal> for Money {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Decimal) -> Self::Output {
        Money(self.0 / rhs)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Represents a percentage or score quantity expressed in "out of 100" form
/// (e.g. `6.75` means 6.75%, `90.00` means a fit score of 90). This is the
/// representation rate tables, fit scores, LTV ratios, and approval
/// probabilities all share per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(dec!(0));

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Percent(value)
    }

    #[inline]
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Quantize to two fractional digits using banker's rounding, per the
    /// data model's "quantize at every boundary that crosses into
    /// persistence" rule.
    #[inline]
    pub fn quantize(&self) -> Self {
        Percent(self.0.round_dp(2))
    }

    /// Clamp into `[0, 100]`.
    #[inline]
    pub fn clamp_0_100(&self) -> Self {
        Percent(self.0.clamp(dec!(0), dec!(100)))
    }

    /// Apply this percentage to a money amount: `amount * self / 100`.
    #[inline]
    pub fn apply(&self, amount: Money) -> Money {
        amount * (self.0 / dec!(100))
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::ZERO
    }
}

impl Add for Percent {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Percent(self.0 + rhs.0)
    }
}

impl Sub for Percent {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Percent(self.0 - rhs.0)
    }
}
