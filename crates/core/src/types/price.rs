//! Decimal prices and percentage discounts.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// A money amount in the store currency.
///
/// Arithmetic is exact; rounding to cents happens only in [`Price::rounded`]
/// and [`Display`](fmt::Display). Amounts read from the backend must not be
/// negative; [`Price::new`] itself does not check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The exact amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount rounded half-away-from-zero to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.rounded())
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(serde::de::Error::custom(format!(
                "price cannot be negative: {amount}"
            )));
        }
        Ok(Self(amount))
    }
}

/// A percentage discount in `0..=100`.
///
/// Out-of-range values coming from the backend are clamped rather than
/// rejected, so a bad catalogue entry can never produce a negative price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Discount(Decimal);

impl Discount {
    /// No discount.
    pub const NONE: Self = Self(Decimal::ZERO);

    /// Create a discount, clamping into `0..=100`.
    #[must_use]
    pub fn percent(value: Decimal) -> Self {
        Self(value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
    }

    /// The percentage value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Whether any discount applies.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl<'de> Deserialize<'de> for Discount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<Decimal>::deserialize(deserializer)
            .map(|value| value.map_or(Self::NONE, Self::percent))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(Decimal::from_str("19.995").unwrap());
        assert_eq!(price.to_string(), "$20.00");
        assert_eq!(Price::from_cents(1999).to_string(), "$19.99");
    }

    #[test]
    fn test_discount_is_clamped() {
        assert_eq!(Discount::percent(Decimal::from(150)).value(), Decimal::ONE_HUNDRED);
        assert_eq!(Discount::percent(Decimal::from(-5)).value(), Decimal::ZERO);
        assert!(!Discount::percent(Decimal::ZERO).is_active());
    }

    #[test]
    fn test_discount_deserializes_null_as_none() {
        let discount: Discount = serde_json::from_str("null").unwrap();
        assert_eq!(discount, Discount::NONE);
        let discount: Discount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(discount.to_string(), "12.5%");
    }

    #[test]
    fn test_price_deserializes_from_string() {
        let price: Price = serde_json::from_str("\"10.50\"").unwrap();
        assert_eq!(price, Price::from_cents(1050));
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1050).amount(), Decimal::new(105, 1));
        assert_eq!(Price::from_cents(0), Price::ZERO);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        assert!(serde_json::from_str::<Price>("\"-0.01\"").is_err());
        let zero: Price = serde_json::from_str("\"0.00\"").unwrap();
        assert_eq!(zero, Price::ZERO);
    }
}
