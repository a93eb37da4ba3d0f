//! Fixed-point currency type with 2 decimal places precision.
//!
//! Uses `rust_decimal` internally with scale enforcement so that fines,
//! fees and payment totals never pick up floating-point error.

use rust_decimal::{Decimal, RoundingStrategy};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A currency amount that maintains exactly 2 decimal places of precision.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use traffic_ledger::Money;
///
/// let fine = Money::from_str("150").unwrap();
/// assert_eq!(fine.to_string(), "150.00");
/// assert_eq!(fine.checked_doubled().unwrap().to_string(), "300.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Largest amount, in whole units, accepted for a fine or fee.
    pub const MAX_UNITS: i64 = 1_000_000_000_000;

    /// Creates a new `Money` from a `Decimal`, rounding half away from zero
    /// and normalizing to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        normalized.rescale(Self::SCALE);
        Money(normalized)
    }

    /// Creates an amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Money::new(Decimal::from(units))
    }

    /// Returns the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns `true` if this value exceeds [`Money::MAX_UNITS`].
    pub fn exceeds_max(&self) -> bool {
        self.0 > Decimal::from(Self::MAX_UNITS)
    }

    /// Exactly twice this amount, or `None` on overflow.
    pub fn checked_doubled(&self) -> Option<Self> {
        self.0.checked_mul(Decimal::from(2)).map(Money::new)
    }

    /// Sum of two amounts, or `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money::new)
    }

    /// Sum of all amounts, or `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Ok(Money::new(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// Stored as TEXT so SQLite never coerces amounts through REAL.
impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Money::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_normalizes_scale() {
        assert_eq!(Money::from_str("1").unwrap().to_string(), "1.00");
        assert_eq!(Money::from_str("1.5").unwrap().to_string(), "1.50");
        assert_eq!(Money::from_str("  2.25  ").unwrap().to_string(), "2.25");
    }

    #[test]
    fn test_from_str_rounds_half_away_from_zero() {
        assert_eq!(Money::from_str("1.005").unwrap().to_string(), "1.01");
        assert_eq!(Money::from_str("1.004").unwrap().to_string(), "1.00");
    }

    #[test]
    fn test_doubled_is_exact() {
        let base = Money::from_str("100.0").unwrap();
        assert_eq!(base.checked_doubled().unwrap().to_string(), "200.00");

        let odd = Money::from_str("0.35").unwrap();
        assert_eq!(odd.checked_doubled().unwrap().to_string(), "0.70");
    }

    #[test]
    fn test_doubled_overflow_is_none() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_doubled(), None);
    }

    #[test]
    fn test_sum_preserves_scale() {
        let total =
            Money::checked_sum(["1.10", "2.20", "3.30"].iter().map(|s| Money::from_str(s).unwrap()))
                .unwrap();
        assert_eq!(total.to_string(), "6.60");
        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::ZERO));
    }

    #[test]
    fn test_sum_overflow_is_none() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(Money::checked_sum([huge, huge]), None);
    }

    #[test]
    fn test_max_bound() {
        assert!(!Money::from_units(Money::MAX_UNITS).exceeds_max());
        assert!(Money::from_str("1000000000000.01").unwrap().exceeds_max());
    }

    #[test]
    fn test_negative_detection() {
        assert!(Money::from_str("-0.01").unwrap().is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::ZERO.is_zero());
        assert!(!Money::from_units(5).is_negative());
    }
}
