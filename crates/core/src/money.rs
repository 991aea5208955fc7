//! Currency-safe monetary amounts.
//!
//! Amounts are held as an integer count of the currency's minor unit (cents
//! for EUR, yen for JPY, fils for KWD), so arithmetic is exact and the scale
//! of a `Money` is always the scale of its currency.

use core::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO-4217 currencies accepted by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Eur,
    Usd,
    Gbp,
    Chf,
    Cad,
    Jpy,
    Kwd,
    Bhd,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Cad => "CAD",
            Currency::Jpy => "JPY",
            Currency::Kwd => "KWD",
            Currency::Bhd => "BHD",
        }
    }

    /// Number of decimal digits of the minor unit.
    pub fn minor_units(self) -> u32 {
        match self {
            Currency::Jpy => 0,
            Currency::Kwd | Currency::Bhd => 3,
            _ => 2,
        }
    }

    fn minor_per_major(self) -> i64 {
        10_i64.pow(self.minor_units())
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "CHF" => Ok(Currency::Chf),
            "CAD" => Ok(Currency::Cad),
            "JPY" => Ok(Currency::Jpy),
            "KWD" => Ok(Currency::Kwd),
            "BHD" => Ok(Currency::Bhd),
            other => Err(DomainError::validation(format!("unsupported currency '{other}'"))),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

/// Digits of `i64::MAX`; a minor-unit count with more cannot fit.
const MAX_MINOR_DIGITS: i64 = 19;

/// Non-negative amount of money in a single currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr", into = "MoneyRepr")]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl ValueObject for Money {}

impl Money {
    /// Build from an amount already expressed in minor units.
    pub fn from_minor(minor: i64, currency: Currency) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation("amount must not be negative"));
        }
        Ok(Self { minor, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Build from a decimal amount.
    ///
    /// The amount is rounded **half-up** (away from zero on a tie) to the
    /// currency's minor-unit scale: `10.005 EUR` becomes `10.01 EUR`,
    /// `10.004 EUR` becomes `10.00 EUR`.
    pub fn from_decimal(amount: &BigDecimal, currency: Currency) -> DomainResult<Self> {
        if *amount < BigDecimal::from(0) {
            return Err(DomainError::validation("amount must not be negative"));
        }

        // Bound the magnitude before rescaling: `1e3000000` parses cheaply but
        // rounding it would materialize millions of digits.
        let scale = i64::from(currency.minor_units());
        let (_, exponent) = amount.as_bigint_and_exponent();
        let integer_digits = i64::try_from(amount.digits()).unwrap_or(i64::MAX) - exponent;
        if integer_digits.saturating_add(scale) > MAX_MINOR_DIGITS {
            return Err(DomainError::validation("amount is out of range"));
        }
        if integer_digits.saturating_add(scale) < 0 {
            // Below half a minor unit: rounds to zero.
            return Ok(Self::zero(currency));
        }

        let rounded = amount.with_scale_round(scale, RoundingMode::HalfUp);
        let (digits, exponent) = rounded.as_bigint_and_exponent();
        debug_assert_eq!(exponent, scale);

        let minor = digits
            .to_i64()
            .ok_or_else(|| DomainError::validation("amount is out of range"))?;
        Self::from_minor(minor, currency)
    }

    /// Parse a decimal string and an ISO currency code.
    pub fn parse(amount: &str, currency: &str) -> DomainResult<Self> {
        let currency: Currency = currency.parse()?;
        let amount = BigDecimal::from_str(amount.trim())
            .map_err(|e| DomainError::validation(format!("invalid amount '{amount}': {e}")))?;
        Self::from_decimal(&amount, currency)
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    /// Amount as a decimal with the currency's scale.
    pub fn amount(&self) -> BigDecimal {
        BigDecimal::new(self.minor.into(), i64::from(self.currency.minor_units()))
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn add(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or_else(|| DomainError::validation("amount overflow"))?;
        Money::from_minor(minor, self.currency)
    }

    /// Fails when currencies differ or when the result would be negative.
    pub fn subtract(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        Money::from_minor(self.minor - other.minor, self.currency)
    }

    pub fn multiply(&self, factor: u32) -> DomainResult<Money> {
        let minor = self
            .minor
            .checked_mul(i64::from(factor))
            .ok_or_else(|| DomainError::validation("amount overflow"))?;
        Money::from_minor(minor, self.currency)
    }

    /// Sum a sequence of amounts that must all share `currency`.
    pub fn sum<'a>(currency: Currency, amounts: impl IntoIterator<Item = &'a Money>) -> DomainResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::validation(format!(
                "currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }

    fn format_amount(&self) -> String {
        let units = self.currency.minor_units() as usize;
        if units == 0 {
            return self.minor.to_string();
        }
        let per_major = self.currency.minor_per_major();
        format!(
            "{}.{:0width$}",
            self.minor / per_major,
            self.minor % per_major,
            width = units
        )
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.format_amount(), self.currency)
    }
}

/// Wire representation: `{"amount": "13.50", "currency": "EUR"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MoneyRepr {
    amount: String,
    currency: Currency,
}

impl From<Money> for MoneyRepr {
    fn from(value: Money) -> Self {
        Self {
            amount: value.format_amount(),
            currency: value.currency,
        }
    }
}

impl TryFrom<MoneyRepr> for Money {
    type Error = DomainError;

    fn try_from(value: MoneyRepr) -> Result<Self, Self::Error> {
        let amount = BigDecimal::from_str(value.amount.trim())
            .map_err(|e| DomainError::validation(format!("invalid amount '{}': {e}", value.amount)))?;
        Money::from_decimal(&amount, value.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(amount: &str) -> Money {
        Money::parse(amount, "EUR").unwrap()
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = Money::parse("-1", "EUR").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(Money::from_minor(-1, Currency::Eur).is_err());
    }

    #[test]
    fn adding_different_currencies_fails() {
        let usd = Money::parse("5", "USD").unwrap();
        let err = eur("10").add(&usd).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("currency mismatch")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn subtracting_different_currencies_fails() {
        let usd = Money::parse("5", "USD").unwrap();
        assert!(eur("10").subtract(&usd).is_err());
    }

    #[test]
    fn half_up_rounding_to_currency_scale() {
        assert_eq!(eur("10.005").minor_units(), 1001);
        assert_eq!(eur("10.004").minor_units(), 1000);
        assert_eq!(eur("10.005").to_string(), "10.01 EUR");
        assert_eq!(Money::parse("99.5", "JPY").unwrap().to_string(), "100 JPY");
        assert_eq!(Money::parse("1.2345", "KWD").unwrap().to_string(), "1.235 KWD");
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(matches!(Money::parse("1", "XYZ"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn malformed_amount_is_rejected() {
        assert!(matches!(Money::parse("ten", "EUR"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn huge_exponents_are_rejected_without_expanding() {
        let started = std::time::Instant::now();
        assert!(matches!(Money::parse("1e3000000", "EUR"), Err(DomainError::Validation(_))));
        let json = serde_json::json!({"amount": "1e3000000", "currency": "EUR"});
        assert!(serde_json::from_value::<Money>(json).is_err());
        assert_eq!(eur("1e-3000000"), Money::zero(Currency::Eur));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn largest_representable_amount_is_accepted() {
        assert_eq!(eur("92233720368547758.07").minor_units(), i64::MAX);
        assert!(matches!(
            Money::parse("92233720368547758.08", "EUR"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(Money::parse("1e17", "EUR"), Err(DomainError::Validation(_))));
        assert_eq!(eur("1e16").minor_units(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn arithmetic_returns_new_values() {
        let a = eur("5.00");
        let b = eur("3.50");
        let sum = a.add(&b).unwrap();
        assert_eq!(sum, eur("8.50"));
        assert_eq!(a, eur("5.00"));
        assert_eq!(a.multiply(2).unwrap(), eur("10.00"));
        assert_eq!(a.subtract(&b).unwrap(), eur("1.50"));
    }

    #[test]
    fn subtract_below_zero_fails() {
        assert!(matches!(eur("1").subtract(&eur("2")), Err(DomainError::Validation(_))));
    }

    #[test]
    fn json_shape_uses_decimal_string() {
        let json = serde_json::to_value(eur("13.5")).unwrap();
        assert_eq!(json, serde_json::json!({"amount": "13.50", "currency": "EUR"}));

        let back: Money = serde_json::from_value(json).unwrap();
        assert_eq!(back, eur("13.50"));
    }

    #[test]
    fn deserializing_negative_money_fails() {
        let json = serde_json::json!({"amount": "-0.01", "currency": "EUR"});
        assert!(serde_json::from_value::<Money>(json).is_err());
    }

    #[test]
    fn sum_of_amounts_in_one_currency() {
        let items = [eur("10.00"), eur("3.50")];
        assert_eq!(Money::sum(Currency::Eur, &items).unwrap(), eur("13.50"));
    }
}
