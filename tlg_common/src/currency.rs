use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "usd";

const MINOR_UNITS_PER_MAJOR: i64 = 100;
const BASIS_POINTS: i128 = 10_000;

//--------------------------------------     Currency       ----------------------------------------------------------
/// A fixed-point money amount, stored as an integer number of cents.
///
/// All arithmetic happens on the integer representation. The remote record store exchanges amounts as strings such as
/// `"$1,234.50"`, which [`Currency::from_str`] parses and [`Currency::to_remote_string`] produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(i64);

op!(binary Currency, Add, add);
op!(binary Currency, Sub, sub);
op!(inplace Currency, AddAssign, add_assign);
op!(inplace Currency, SubAssign, sub_assign);
op!(unary Currency, Neg, neg);

impl Mul<i64> for Currency {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Currency {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("Not a valid currency amount: '{0}'")]
    InvalidFormat(String),
    #[error("Cents must be between 0 and 99, but got {0}")]
    CentsOutOfRange(i64),
    #[error("Currency amount is out of range: {0}")]
    Overflow(String),
}

impl From<i64> for Currency {
    fn from(minor_units: i64) -> Self {
        Self(minor_units)
    }
}

impl Currency {
    /// Builds an amount from whole dollars and cents. A negative `dollars` makes the whole amount negative, so
    /// `new(-5, 25)` is -$5.25.
    pub fn new(dollars: i64, cents: i64) -> Result<Self, CurrencyError> {
        if !(0..MINOR_UNITS_PER_MAJOR).contains(&cents) {
            return Err(CurrencyError::CentsOutOfRange(cents));
        }
        let magnitude = dollars
            .checked_abs()
            .and_then(|d| d.checked_mul(MINOR_UNITS_PER_MAJOR))
            .and_then(|d| d.checked_add(cents))
            .ok_or_else(|| CurrencyError::Overflow(format!("{dollars}.{cents:02}")))?;
        Ok(Self(if dollars < 0 { -magnitude } else { magnitude }))
    }

    pub fn from_minor_units(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole dollars as currency. Saturates at the limits of the representation; use
    /// [`Currency::try_from_dollars`] for amounts that come from user input.
    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(MINOR_UNITS_PER_MAJOR))
    }

    pub fn try_from_dollars(dollars: i64) -> Result<Self, CurrencyError> {
        dollars
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .map(Self)
            .ok_or_else(|| CurrencyError::Overflow(format!("{dollars} dollars")))
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, CurrencyError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(|| CurrencyError::Overflow(format!("{self} + {rhs}")))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, CurrencyError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or_else(|| CurrencyError::Overflow(format!("{self} - {rhs}")))
    }

    pub fn checked_mul(self, quantity: i64) -> Result<Self, CurrencyError> {
        self.0.checked_mul(quantity).map(Self).ok_or_else(|| CurrencyError::Overflow(format!("{self} x {quantity}")))
    }

    /// Whole dollars, truncated towards zero.
    pub fn dollars(&self) -> i64 {
        self.0 / MINOR_UNITS_PER_MAJOR
    }

    /// The cents part, always in `0..=99` regardless of sign.
    pub fn cents(&self) -> i64 {
        (self.0 % MINOR_UNITS_PER_MAJOR).abs()
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The amount in the smallest currency unit, as payment processors expect it.
    pub fn to_minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Formats the amount the way the remote store writes currency cells, e.g. `"607.70"`.
    pub fn to_remote_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.dollars().abs(), self.cents())
    }

    /// Converts a floating point amount to currency, rounding half-up to the nearest cent.
    ///
    /// Rounding is done on the shortest decimal representation of `value` rather than on the binary value, so that
    /// `19.995` rounds to `20.00` even though the nearest `f64` is slightly below it.
    pub fn from_float(value: f64) -> Result<Self, CurrencyError> {
        if !value.is_finite() {
            return Err(CurrencyError::InvalidFormat(value.to_string()));
        }
        let repr = format!("{}", value.abs());
        let (whole, frac) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
        let overflow = || CurrencyError::Overflow(value.to_string());
        let dollars = whole.parse::<i64>().map_err(|_| overflow())?;
        let digit = |i: usize| frac.as_bytes().get(i).map(|b| i64::from(b - b'0')).unwrap_or(0);
        let mut cents = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            cents += 1;
        }
        let magnitude = dollars
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|d| d.checked_add(cents))
            .ok_or_else(overflow)?;
        Ok(Self(if value < 0.0 { -magnitude } else { magnitude }))
    }

    /// For presentation and for comparing against float-valued remote cells only. Never feed the result back into
    /// arithmetic.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_float(&self) -> f64 {
        self.0 as f64 / MINOR_UNITS_PER_MAJOR as f64
    }

    /// Applies a rate given in basis points (300 = 3%), rounding half-up (away from zero) to the nearest cent.
    /// Results beyond the range of the representation saturate.
    pub fn apply_rate_bps(&self, rate_bps: i64) -> Self {
        let product = i128::from(self.0) * i128::from(rate_bps);
        let rounded = (product.abs() + BASIS_POINTS / 2) / BASIS_POINTS;
        let signed = if product < 0 { -rounded } else { rounded };
        Self(i64::try_from(signed).unwrap_or(if signed < 0 { i64::MIN } else { i64::MAX }))
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    /// Accepts the remote store's formats: an optional leading `-`, an optional `$`, thousands separators and zero, one
    /// or two fractional digits. `"5.5"` is $5.50 and `"5"` is $5.00.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CurrencyError::InvalidFormat(s.to_string());
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let cleaned = rest.replace(',', "");
        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (cleaned.as_str(), None),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let cents = match frac {
            None => 0,
            Some(f) if f.is_empty() || f.len() > 2 || !f.bytes().all(|b| b.is_ascii_digit()) => return Err(invalid()),
            Some(f) if f.len() == 1 => f.parse::<i64>().map_err(|_| invalid())? * 10,
            Some(f) => f.parse::<i64>().map_err(|_| invalid())?,
        };
        let dollars = whole.parse::<i64>().map_err(|_| CurrencyError::Overflow(s.to_string()))?;
        let magnitude = dollars
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|d| d.checked_add(cents))
            .ok_or_else(|| CurrencyError::Overflow(s.to_string()))?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}${}.{:02}", self.dollars().abs(), self.cents())
    }
}
