//! Monetary amount parsing
//!
//! Amounts arrive either as JSON numbers or as locale-formatted strings that
//! use `.` for thousands and `,` for decimals (`"1.234,50"`).

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A monetary value as received on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
}

impl Amount {
    /// Parse into a canonical decimal
    pub fn parse(&self) -> Result<Decimal, MoneyError> {
        match self {
            Amount::Number(number) => parse_number(number),
            Amount::Text(text) => parse_locale_str(text),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::Text(value.to_string().replace('.', ","))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Number(value.into())
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

/// Failure to interpret a monetary input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount for {field}: {input:?}")]
pub struct MoneyError {
    pub field: String,
    pub input: String,
}

impl MoneyError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            field: String::new(),
            input: input.into(),
        }
    }

    pub fn for_field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }
}

/// Parse an optional amount, treating absence as zero.
///
/// The error carries `field` so callers can report which input was rejected.
pub fn parse_amount(field: &str, value: Option<&Amount>) -> Result<Decimal, MoneyError> {
    match value {
        None => Ok(Decimal::ZERO),
        Some(amount) => amount.parse().map_err(|e| e.for_field(field)),
    }
}

/// Parse an optional amount, keeping absence distinguishable from zero
pub fn parse_optional_amount(
    field: &str,
    value: Option<&Amount>,
) -> Result<Option<Decimal>, MoneyError> {
    value
        .map(|amount| amount.parse().map_err(|e| e.for_field(field)))
        .transpose()
}

fn parse_number(number: &serde_json::Number) -> Result<Decimal, MoneyError> {
    if let Some(i) = number.as_i64() {
        return Ok(Decimal::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Ok(Decimal::from(u));
    }
    let repr = number.to_string();
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|_| MoneyError::new(repr))
}

/// Strip thousands separators, then swap the decimal comma for a point
pub fn parse_locale_str(input: &str) -> Result<Decimal, MoneyError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let canonical = trimmed.replace('.', "").replace(',', ".");
    if canonical.matches('.').count() > 1 {
        return Err(MoneyError::new(input));
    }

    Decimal::from_str(&canonical).map_err(|_| MoneyError::new(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_absent_is_zero() {
        assert_eq!(parse_amount("total", None).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(parse_locale_str("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_locale_str("   ").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_locale_string() {
        assert_eq!(parse_locale_str("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_locale_str("1.000.000").unwrap(), dec("1000000"));
        assert_eq!(parse_locale_str("100,5").unwrap(), dec("100.5"));
        assert_eq!(parse_locale_str("-12,30").unwrap(), dec("-12.30"));
    }

    #[test]
    fn test_numbers_pass_through() {
        let int: Amount = serde_json::from_str("100").unwrap();
        assert_eq!(int.parse().unwrap(), dec("100"));

        let float: Amount = serde_json::from_str("100.25").unwrap();
        assert_eq!(float.parse().unwrap(), dec("100.25"));
    }

    #[test]
    fn test_string_dot_is_thousands_separator() {
        let amount: Amount = serde_json::from_str("\"1.500\"").unwrap();
        assert_eq!(amount.parse().unwrap(), dec("1500"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        for bad in ["abc", "12,3,4", "1,2x", "--5"] {
            assert!(parse_locale_str(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_error_names_field() {
        let err = parse_amount("costo_ficha", Some(&Amount::from("x"))).unwrap_err();
        assert_eq!(err.field, "costo_ficha");
        assert_eq!(err.input, "x");
    }

    #[test]
    fn test_optional_amount_keeps_absence() {
        assert_eq!(parse_optional_amount("total", None).unwrap(), None);
        assert_eq!(
            parse_optional_amount("total", Some(&Amount::from(5))).unwrap(),
            Some(dec("5"))
        );
    }

    #[test]
    fn test_decimal_conversion_round_trips() {
        let amount = Amount::from(dec("1234.5"));
        assert_eq!(amount.parse().unwrap(), dec("1234.5"));
    }
}
