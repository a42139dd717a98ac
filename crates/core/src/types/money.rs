//! Type-safe money representation using decimal arithmetic.
//!
//! All catalog prices are stored as `NUMERIC(12, 2)` in Kenyan shillings.
//! M-Pesa only accepts whole shillings, so [`Money::round_up_whole`] is used
//! when building payment requests.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (shillings, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an amount in Kenyan shillings.
    #[must_use]
    pub const fn kes(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::KES)
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Add two amounts.
    ///
    /// Returns `None` if the currencies differ.
    #[must_use]
    pub fn add(&self, other: &Self) -> Option<Self> {
        if self.currency_code != other.currency_code {
            return None;
        }
        Some(Self::new(self.amount + other.amount, self.currency_code))
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn multiply(&self, quantity: i32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Apply a fractional rate (e.g. `0.16` VAT), rounded half-up to cents.
    #[must_use]
    pub fn percent_of(&self, rate: Decimal) -> Self {
        let value =
            (self.amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self::new(value, self.currency_code)
    }

    /// Round up to the next whole unit.
    ///
    /// Returns `None` for negative amounts or values that do not fit in `u64`.
    #[must_use]
    pub fn round_up_whole(&self) -> Option<u64> {
        if self.amount.is_sign_negative() {
            return None;
        }
        let whole = self.amount.ceil();
        u64::try_from(whole).ok()
    }

    /// Format for display (e.g. "KES 1250.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency_code.code(), self.amount)
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    KES,
    USD,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::KES => "KES",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_same_currency() {
        let a = Money::kes(Decimal::new(100_00, 2));
        let b = Money::kes(Decimal::new(50_50, 2));
        assert_eq!(a.add(&b).unwrap().amount, Decimal::new(150_50, 2));
    }

    #[test]
    fn test_add_currency_mismatch() {
        let a = Money::kes(Decimal::ONE);
        let b = Money::new(Decimal::ONE, CurrencyCode::USD);
        assert!(a.add(&b).is_none());
    }

    #[test]
    fn test_multiply() {
        let price = Money::kes(Decimal::new(12_499_99, 2));
        assert_eq!(price.multiply(3).amount, Decimal::new(37_499_97, 2));
    }

    #[test]
    fn test_percent_of_rounds_to_cents() {
        let subtotal = Money::kes(Decimal::new(333_33, 2));
        let vat = subtotal.percent_of(Decimal::new(16, 2));
        assert_eq!(vat.amount, Decimal::new(53_33, 2));
    }

    #[test]
    fn test_round_up_whole() {
        assert_eq!(Money::kes(Decimal::new(1000_01, 2)).round_up_whole(), Some(1001));
        assert_eq!(Money::kes(Decimal::new(1000_00, 2)).round_up_whole(), Some(1000));
        assert_eq!(Money::kes(Decimal::new(-1, 0)).round_up_whole(), None);
    }

    #[test]
    fn test_display() {
        let price = Money::kes(Decimal::new(1250, 0));
        assert_eq!(price.display(), "KES 1250.00");
    }
}
