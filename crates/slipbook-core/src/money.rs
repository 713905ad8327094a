//! Currency-scaled decimal amounts

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A currency and the number of fractional digits its amounts carry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyNode {
    pub code: String,
    pub scale: u32,
}

impl CurrencyNode {
    pub fn new(code: impl Into<String>, scale: u32) -> Self {
        Self {
            code: code.into(),
            scale,
        }
    }

    /// Round half-up to this currency's scale
    pub fn round(&self, value: Decimal) -> Decimal {
        let mut rounded = value.round_dp_with_strategy(self.scale, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(self.scale);
        rounded
    }
}

impl std::fmt::Display for CurrencyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// A decimal value tied to a currency
///
/// Values are always held at the currency's scale. Combining two amounts
/// requires them to share a currency; crossing currencies goes through
/// [`MonetaryAmount::exchange`] with an explicit rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetaryAmount {
    value: Decimal,
    currency: CurrencyNode,
}

impl MonetaryAmount {
    pub fn new(value: Decimal, currency: CurrencyNode) -> Self {
        let value = currency.round(value);
        Self { value, currency }
    }

    pub fn zero(currency: CurrencyNode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> &CurrencyNode {
        &self.currency
    }

    pub fn checked_add(&self, other: &MonetaryAmount) -> CoreResult<MonetaryAmount> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.value + other.value, self.currency.clone()))
    }

    pub fn abs(&self) -> MonetaryAmount {
        Self::new(self.value.abs(), self.currency.clone())
    }

    /// Convert into another currency at an explicit rate
    pub fn exchange(&self, rate: Decimal, target: CurrencyNode) -> MonetaryAmount {
        Self::new(self.value * rate, target)
    }

    fn ensure_same_currency(&self, other: &MonetaryAmount) -> CoreResult<()> {
        if self.currency.code != other.currency.code {
            return Err(CoreError::CurrencyMismatch {
                left: self.currency.code.clone(),
                right: other.currency.code.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.currency.code)
    }
}

/// Rate that turns `amount` into `exchanged`, or `None` when `amount` is zero
pub fn implied_rate(amount: Decimal, exchanged: Decimal) -> Option<Decimal> {
    if amount.is_zero() {
        return None;
    }
    exchanged.abs().checked_div(amount.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn usd() -> CurrencyNode {
        CurrencyNode::new("USD", 2)
    }

    #[test]
    fn test_new_rounds_to_scale() {
        let amount = MonetaryAmount::new(dec!(10.005), usd());
        assert_eq!(amount.value(), dec!(10.01));
        assert_eq!(amount.value().scale(), 2);
        assert_eq!(MonetaryAmount::zero(usd()).to_string(), "0.00 USD");
    }

    #[test]
    fn test_same_currency_arithmetic_preserves_scale() {
        let a = MonetaryAmount::new(dec!(1.10), usd());
        let b = MonetaryAmount::new(dec!(2.2), usd());
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.value(), dec!(3.30));
        assert_eq!(sum.value().scale(), 2);
    }

    #[test]
    fn test_cross_currency_requires_rate() {
        let a = MonetaryAmount::new(dec!(100), usd());
        let b = MonetaryAmount::new(dec!(92), CurrencyNode::new("EUR", 2));
        assert!(matches!(a.checked_add(&b), Err(CoreError::CurrencyMismatch { .. })));

        let converted = a.exchange(dec!(0.92), CurrencyNode::new("EUR", 2));
        assert_eq!(converted.checked_add(&b).unwrap().value(), dec!(184.00));
        assert_eq!(
            MonetaryAmount::new(dec!(-100), usd()).abs().exchange(dec!(0.923), usd()).value(),
            dec!(92.30)
        );
    }

    #[test]
    fn test_implied_rate() {
        assert_eq!(implied_rate(dec!(100), dec!(-92)), Some(dec!(0.92)));
        assert_eq!(implied_rate(dec!(0), dec!(5)), None);
    }
}
