//! Currency rate table and USD conversion
//!
//! Rates are static input: each code maps to a positive multiplier such that
//! `usd_amount = amount * rate`. Lookups are lenient by default, meaning an
//! unknown code converts at the identity rate.

use crate::error::{DataPulseError, Result};
use crate::types::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

/// Reporting currency
pub const BASE_CURRENCY: &str = "USD";

/// Normalize a currency code for lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Outcome of a single lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLookup {
    Known(Decimal),
    /// Code not in the table; identity rate applied
    Unknown,
}

impl RateLookup {
    pub fn rate(&self) -> Decimal {
        match self {
            RateLookup::Known(rate) => *rate,
            RateLookup::Unknown => Decimal::ONE,
        }
    }
}

/// Static currency-code to USD multiplier table
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRates {
    rates: BTreeMap<String, Decimal>,
    /// Every code must have a rate
    strict: bool,
    /// Codes the caller declared as "must convert"
    required: BTreeSet<String>,
}

impl Default for CurrencyRates {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CurrencyRates {
    /// Empty table (USD is always implied)
    pub fn new() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(BASE_CURRENCY.to_string(), Decimal::ONE);
        Self {
            rates,
            strict: false,
            required: BTreeSet::new(),
        }
    }

    /// Table with the rates the storefronts have historically reported in
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (code, rate) in [
            ("PHP", dec!(0.018)),
            ("MYR", dec!(0.21)),
            ("SGD", dec!(0.74)),
            ("IDR", dec!(0.000063)),
        ] {
            table.rates.insert(code.to_string(), rate);
        }
        table
    }

    /// Add or replace a rate
    pub fn add_rate(&mut self, code: &str, rate: Decimal) -> Result<()> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(DataPulseError::Config(
                "Currency code must not be empty".to_string(),
            ));
        }
        if rate <= Decimal::ZERO {
            return Err(DataPulseError::Config(format!(
                "Currency rate for {} must be positive, got: {}",
                code, rate
            )));
        }
        if code == BASE_CURRENCY && rate != Decimal::ONE {
            return Err(DataPulseError::Config(format!(
                "{} is the reporting currency and must have rate 1, got: {}",
                BASE_CURRENCY, rate
            )));
        }
        self.rates.insert(code, rate);
        Ok(())
    }

    /// Builder form of [`CurrencyRates::add_rate`]
    pub fn with_rate(mut self, code: &str, rate: Decimal) -> Result<Self> {
        self.add_rate(code, rate)?;
        Ok(self)
    }

    /// Fail on any code without a rate instead of converting at identity
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Declare a code that must have a rate
    pub fn require(&mut self, code: &str) {
        self.required.insert(normalize_code(code));
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(|s| s.as_str())
    }

    /// Load rates from CSV text
    ///
    /// Expected format: currency_code,rate (header row optional, `#` comments skipped)
    pub fn load_from_csv(&mut self, csv_data: &str) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0;
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(index as u64 + 1, |p| p.line());
            if record.len() != 2 {
                return Err(DataPulseError::Config(format!(
                    "Invalid rate CSV at line {}: expected 2 columns, got {}",
                    line,
                    record.len()
                )));
            }
            if index == 0 && record[1].eq_ignore_ascii_case("rate") {
                continue;
            }

            let (code, rate): (String, String) = record.deserialize(None)?;
            let rate: Decimal = rate.parse().map_err(|e| {
                DataPulseError::Config(format!("Invalid rate at line {}: {}", line, e))
            })?;
            self.add_rate(&code, rate)?;
            count += 1;
        }
        Ok(count)
    }

    /// Check that every required code has a rate
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|code| !self.rates.contains_key(*code))
            .map(|s| s.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(DataPulseError::Config(format!(
                "No rate for required currencies: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub fn lookup(&self, code: &str) -> RateLookup {
        match self.rates.get(&normalize_code(code)) {
            Some(rate) => RateLookup::Known(*rate),
            None => RateLookup::Unknown,
        }
    }

    /// Whether a missing rate for `code` must be reported as an error
    pub fn must_convert(&self, code: &str) -> bool {
        self.strict || self.required.contains(&normalize_code(code))
    }

    /// Lenient conversion: unknown codes convert at the identity rate
    pub fn convert(&self, amount: Money, code: &str) -> Money {
        amount * self.lookup(code).rate()
    }

    /// Conversion honouring strict mode and required codes; `None` when the
    /// rate is missing for a code that must convert
    pub fn try_convert(&self, amount: Money, code: &str) -> Option<Money> {
        match self.lookup(code) {
            RateLookup::Known(rate) => Some(amount * rate),
            RateLookup::Unknown if self.must_convert(code) => None,
            RateLookup::Unknown => Some(amount),
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_conversion() {
        let rates = CurrencyRates::new().with_rate("PHP", dec!(0.018)).unwrap();
        assert_eq!(rates.convert(dec!(100.00), "PHP"), dec!(1.80));
    }

    #[test]
    fn test_usd_is_identity() {
        let rates = CurrencyRates::with_defaults();
        assert_eq!(rates.convert(dec!(123.45), "USD"), dec!(123.45));
        assert_eq!(rates.convert(dec!(123.45), "usd"), dec!(123.45));
    }

    #[test]
    fn test_unknown_code_is_lenient() {
        let rates = CurrencyRates::with_defaults();
        assert_eq!(rates.lookup("THB"), RateLookup::Unknown);
        assert_eq!(rates.convert(dec!(50), "THB"), dec!(50));
        assert_eq!(rates.try_convert(dec!(50), "THB"), Some(dec!(50)));
    }

    #[test]
    fn test_strict_and_required() {
        let mut rates = CurrencyRates::with_defaults();
        rates.require("THB");
        assert!(rates.validate().is_err());
        assert_eq!(rates.try_convert(dec!(50), "THB"), None);

        let mut strict = CurrencyRates::with_defaults();
        strict.set_strict(true);
        assert!(strict.validate().is_ok());
        assert_eq!(strict.try_convert(dec!(50), "VND"), None);
        assert_eq!(strict.try_convert(dec!(50), "MYR"), Some(dec!(10.50)));
    }

    #[test]
    fn test_rejects_bad_rates() {
        let mut rates = CurrencyRates::new();
        assert!(rates.add_rate("PHP", Decimal::ZERO).is_err());
        assert!(rates.add_rate("PHP", dec!(-0.1)).is_err());
        assert!(rates.add_rate("USD", dec!(1.1)).is_err());
        assert!(rates.add_rate("USD", Decimal::ONE).is_ok());
    }

    #[test]
    fn test_load_from_csv() {
        let mut rates = CurrencyRates::new();
        let csv = "currency_code,rate\n# comment\nphp,0.018\nSGD, 0.74\n";
        assert_eq!(rates.load_from_csv(csv).unwrap(), 2);
        assert_eq!(rates.lookup("PHP"), RateLookup::Known(dec!(0.018)));
        assert!(rates.load_from_csv("PHP;0.018").is_err());
        assert!(rates.load_from_csv("PHP,abc").is_err());
    }

    #[test]
    fn test_load_from_csv_quoted_fields() {
        let mut rates = CurrencyRates::new();
        let csv = "\"currency_code\",\"rate\"\n\"myr\",\"0.21\"\n\n\"IDR\",\"0.000064\"\n";
        assert_eq!(rates.load_from_csv(csv).unwrap(), 2);
        assert_eq!(rates.lookup("MYR"), RateLookup::Known(dec!(0.21)));
        assert_eq!(rates.lookup("IDR"), RateLookup::Known(dec!(0.000064)));

        let err = rates.load_from_csv("THB,0.028\nVND,0.00004,extra\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
