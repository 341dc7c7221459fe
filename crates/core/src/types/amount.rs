//! Decimal money amounts and liquid volumes.
//!
//! Both types wrap [`Decimal`] so that sums and transfers are exact: moving
//! 2.5 L from one warehouse to another and back restores the original level
//! to the last digit.
//!
//! The operators (`+`, `-`, `*`, `sum`) saturate at the edge of the
//! [`Decimal`] range instead of panicking. Mutations that must not lose a
//! value use `checked_add` and reject the overflow.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display suffix for amounts (West African CFA franc, ISO 4217 `XOF`).
pub const CURRENCY_SYMBOL: &str = "CFA";

/// Errors that can occur when parsing an [`Amount`] or [`Liters`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input is empty or whitespace.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

fn parse_decimal(s: &str) -> Result<Decimal, AmountError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    // Accept "2,5" as typed on a French-locale keypad.
    let normalized = trimmed.replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| AmountError::NotANumber(trimmed.to_owned()))
}

/// A monetary amount in CFA francs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero francs.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create an amount from a whole number of francs.
    #[must_use]
    pub fn from_cfa(francs: i64) -> Self {
        Self(Decimal::from(francs))
    }

    /// Parse an amount from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or not a decimal number.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        parse_decimal(s).map(Self)
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Add, or `None` if the sum leaves the decimal range.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {CURRENCY_SYMBOL}", self.0.normalize())
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<u32> for Amount {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A liquid volume in liters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Liters(Decimal);

impl Liters {
    /// Zero liters.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a volume from a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Create a volume from a whole number of liters.
    #[must_use]
    pub fn whole(liters: i64) -> Self {
        Self(Decimal::from(liters))
    }

    /// Parse a volume from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or not a decimal number.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        parse_decimal(s).map(Self)
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the volume is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Subtract, clamping the result at zero.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(Decimal::ZERO))
    }

    /// Add, or `None` if the sum leaves the decimal range.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Scale the volume by a unit count (e.g. 3 bottles of 10 L).
    #[must_use]
    pub fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(count)))
    }
}

impl fmt::Display for Liters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} L", self.0.normalize())
    }
}

impl Add for Liters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Liters {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Liters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl FromStr for Liters {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
