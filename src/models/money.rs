//! Monetary amounts and the API's centocent unit.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

/// Number of decimal places in the API's raw integer amounts
/// (10000 centocents = 1 currency unit).
const CENTOCENT_SCALE: u32 = 4;

/// Number of decimal places kept in displayed amounts.
const DISPLAY_PLACES: u32 = 2;

/// Converts a raw API amount (integer centocents) to major currency units.
#[inline]
#[must_use]
pub fn from_centocents(raw: i64) -> Decimal {
    Decimal::new(raw, CENTOCENT_SCALE)
}

/// A display-ready amount rounded to two decimal places.
///
/// Rounding uses midpoint-away-from-zero, so `0.125` becomes `0.13`.
/// Displays and serializes as `"$2.00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Rounds `amount` to two places.
    #[inline]
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(DISPLAY_PLACES, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Returns the rounded amount.
    #[inline]
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl core::fmt::Display for Money {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Serialize for Money {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centocents_divide_by_ten_thousand() {
        assert_eq!(from_centocents(-20_000), Decimal::new(-2, 0));
        assert_eq!(from_centocents(50_000), Decimal::new(5, 0));
        assert_eq!(from_centocents(12_345), Decimal::new(12_345, 4));
    }

    #[test]
    fn money_display_has_two_places() {
        assert_eq!(Money::new(Decimal::new(2, 0)).to_string(), "$2.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
        assert_eq!(Money::new(Decimal::new(12_345, 4)).to_string(), "$1.23");
    }

    #[test]
    fn money_rounds_midpoint_away_from_zero() {
        assert_eq!(Money::new(Decimal::new(125, 3)).amount(), Decimal::new(13, 2));
        assert_eq!(Money::new(Decimal::new(135, 3)).amount(), Decimal::new(14, 2));
    }

    #[test]
    fn money_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(Decimal::new(200, 0))).unwrap();
        assert_eq!(json, r#""$200.00""#);
    }
}
