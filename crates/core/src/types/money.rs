//! Fixed-point money amounts.
//!
//! All prices shown to customers and stored on orders carry exactly two
//! fractional digits. Values are rounded half-up (midpoint away from zero)
//! whenever a [`Money`] is created, so arithmetic done on the raw
//! [`Decimal`] never leaks sub-cent digits into a total.

use core::fmt;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits carried by every [`Money`] value.
pub const MONEY_SCALE: u32 = 2;

/// A decimal amount with exactly two fractional digits.
///
/// Serializes as a string (`"10.00"`) so clients never see binary floating
/// point. Deserializes from either a string or a JSON number.
///
/// ```
/// use bazaar_core::Money;
/// use rust_decimal::Decimal;
///
/// let amount = Money::from_decimal(Decimal::new(10_005, 3)); // 10.005
/// assert_eq!(amount.to_string(), "10.01");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero, formatted as `0.00`.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Round an arbitrary decimal half-up to two places.
    #[must_use]
    pub fn from_decimal(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    /// Build an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// The underlying decimal (always scale 2).
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::from_decimal(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_decimal(self.0 + rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<Decimal>().map(Self::from_decimal)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self::from_decimal)
    }
}

// SQLx support (with postgres feature). Stored as NUMERIC(12, 2).
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_decimal(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_has_two_places() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::default().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_whole_numbers_gain_scale() {
        assert_eq!(Money::from_decimal(Decimal::from(10)).to_string(), "10.00");
    }

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(Money::from_decimal(Decimal::new(2_345, 3)).to_string(), "2.35");
        assert_eq!(Money::from_decimal(Decimal::new(2_344, 3)).to_string(), "2.34");
        assert_eq!(Money::from_decimal(Decimal::new(1_005, 3)).to_string(), "1.01");
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Money::from_cents(13_800).to_string(), "138.00");
    }

    #[test]
    fn test_add_keeps_scale() {
        let sum = Money::from_cents(1_999) + Money::from_cents(1);
        assert_eq!(sum.to_string(), "20.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(1_000)).unwrap();
        assert_eq!(json, "\"10.00\"");
    }

    #[test]
    fn test_deserializes_from_string_or_number() {
        let from_str: Money = serde_json::from_str("\"59.999\"").unwrap();
        assert_eq!(from_str.to_string(), "60.00");

        let from_num: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_num.to_string(), "12.50");
    }

    #[test]
    fn test_parse() {
        let parsed: Money = " 3.1 ".parse().unwrap();
        assert_eq!(parsed, Money::from_cents(310));
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn test_is_negative() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::ZERO.is_negative());
    }
}
