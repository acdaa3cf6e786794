//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog price in the store's single display currency.
///
/// Product records carry prices as JSON numbers, so the wire form is a float
/// and the in-memory form is an exact [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    /// Formats as dollars with two decimals (e.g. `$19.99`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0.round_dp(2))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::new(Decimal::new(1999, 2)).to_string(), "$19.99");
        assert_eq!(Price::new(Decimal::new(5, 0)).to_string(), "$5.00");
    }

    #[test]
    fn test_deserialize_json_number() {
        let price: Price = serde_json::from_str("1499.5").unwrap();
        assert_eq!(price.amount(), Decimal::new(14995, 1));
    }
}
