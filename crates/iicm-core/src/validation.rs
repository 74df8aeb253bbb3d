//! # Validation Module
//!
//! Input parsing and validation for the invoice form.
//!
//! ## Two Kinds Of Input Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Input Handling                                     │
//! │                                                                         │
//! │  Lenient parsing (numeric line fields)                                  │
//! │  ├── "abc"  → 0          never an error, never NaN                      │
//! │  ├── "-3"   → 0          line totals stay non-negative                  │
//! │  └── "150"  → 100        (percent fields only)                          │
//! │                                                                         │
//! │  Strict validation (references & submission)                            │
//! │  ├── identifiers must be positive integers                             │
//! │  ├── quantity must be > 0 before submitting                             │
//! │  └── config values must be in range                                     │
//! │                                                                         │
//! │  The backend repeats the strict checks; these run first so the form     │
//! │  can say what is wrong without a round trip.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use iicm_core::validation::{parse_quantity, validate_quantity};
//!
//! assert_eq!(parse_quantity("3"), 3);
//! assert_eq!(parse_quantity("abc"), 0);
//! assert!(validate_quantity(0).is_err());
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percent;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Lenient Parsers
// =============================================================================

/// Parses user input as a decimal, substituting zero on failure.
///
/// Accepts plain (`"12.50"`) and scientific (`"1.2e3"`) notation, with
/// surrounding whitespace.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    parse_decimal(raw).unwrap_or(Decimal::ZERO)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Parses a JSON number or numeric string as a decimal.
pub fn parse_decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Parses a monetary amount; failures and negatives become zero.
pub fn parse_amount(raw: &str) -> Money {
    Money::new(parse_decimal_or_zero(raw)).non_negative()
}

/// Parses a percentage; failures become zero, the result is clamped to `[0, 100]`.
pub fn parse_percent(raw: &str) -> Percent {
    Percent::clamped(parse_decimal_or_zero(raw))
}

/// Parses a quantity; failures and negatives become zero, fractions truncate.
pub fn parse_quantity(raw: &str) -> u32 {
    decimal_to_count(parse_decimal_or_zero(raw))
}

/// Truncates a decimal to a non-negative count, saturating at `u32::MAX`.
pub fn decimal_to_count(value: Decimal) -> u32 {
    let whole = value.trunc();
    if whole.is_sign_negative() {
        return 0;
    }
    whole.to_u32().unwrap_or(u32::MAX)
}

// =============================================================================
// Identifier Parsing
// =============================================================================

/// Parses a positive integer identifier from a JSON number or digit string.
///
/// ## Example
/// ```rust
/// use iicm_core::validation::parse_identifier;
/// use serde_json::json;
///
/// assert_eq!(parse_identifier(&json!(42), "product").unwrap(), 42);
/// assert_eq!(parse_identifier(&json!("42"), "product").unwrap(), 42);
/// assert!(parse_identifier(&json!("4x2"), "product").is_err());
/// assert!(parse_identifier(&json!(0), "product").is_err());
/// ```
pub fn parse_identifier(value: &Value, field: &str) -> ValidationResult<u32> {
    match value {
        Value::Null => Err(ValidationError::Required {
            field: field.to_string(),
        }),
        Value::String(s) => parse_identifier_str(s, field),
        Value::Number(n) => n
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .filter(|raw| *raw > 0)
            .ok_or_else(|| invalid_identifier(field)),
        _ => Err(invalid_identifier(field)),
    }
}

/// Parses a positive integer identifier from a string.
pub fn parse_identifier_str(raw: &str, field: &str) -> ValidationResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid_identifier(field));
    }

    raw.parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| invalid_identifier(field))
}

fn invalid_identifier(field: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a positive integer".to_string(),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity about to be submitted.
///
/// ## Rules
/// - Must be positive (> 0); the backend rejects zero quantities
pub fn validate_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative; zero is allowed (free items)
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    validate_non_negative("unit price", price)
}

/// Validates a shipping cost.
pub fn validate_shipping_cost(cost: Money) -> ValidationResult<()> {
    validate_non_negative("shipping cost", cost)
}

fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage (discounts, tax rate).
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_percent(field: &str, value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates an exchange rate.
///
/// ## Rules
/// - Must be strictly positive
pub fn validate_exchange_rate(value: Decimal) -> ValidationResult<()> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "exchange rate".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_decimal_or_zero() {
        assert_eq!(parse_decimal_or_zero("12.50"), dec("12.50"));
        assert_eq!(parse_decimal_or_zero("  7 "), dec("7"));
        assert_eq!(parse_decimal_or_zero("1.5e2"), dec("150"));
        assert_eq!(parse_decimal_or_zero("abc"), Decimal::ZERO);
        assert_eq!(parse_decimal_or_zero(""), Decimal::ZERO);
        assert_eq!(parse_decimal_or_zero("NaN"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity("2.9"), 2);
        assert_eq!(parse_quantity("-4"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity("99999999999999"), u32::MAX);
    }

    #[test]
    fn test_parse_percent_and_amount() {
        assert_eq!(parse_percent("12.5").value(), dec("12.5"));
        assert_eq!(parse_percent("250").value(), Decimal::ONE_HUNDRED);
        assert_eq!(parse_percent("-1").value(), Decimal::ZERO);
        assert_eq!(parse_amount("-10"), Money::zero());
        assert_eq!(parse_amount("3"), Money::new(dec("3")));
    }

    #[test]
    fn test_parse_decimal_value() {
        assert_eq!(parse_decimal_value(&json!("19.99")), Some(dec("19.99")));
        assert_eq!(parse_decimal_value(&json!(19.5)), Some(dec("19.5")));
        assert_eq!(parse_decimal_value(&json!(4)), Some(dec("4")));
        assert_eq!(parse_decimal_value(&json!(null)), None);
        assert_eq!(parse_decimal_value(&json!(true)), None);
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse_identifier(&json!(5), "product").unwrap(), 5);
        assert_eq!(parse_identifier(&json!(" 5 "), "product").unwrap(), 5);
        assert!(matches!(
            parse_identifier(&json!(null), "product"),
            Err(ValidationError::Required { .. })
        ));
        assert!(parse_identifier(&json!(-1), "product").is_err());
        assert!(parse_identifier(&json!(1.5), "product").is_err());
        assert!(parse_identifier(&json!("1.5"), "product").is_err());
        assert!(parse_identifier(&json!("+5"), "product").is_err());
        assert!(parse_identifier(&json!([5]), "product").is_err());
        assert!(parse_identifier_str("0", "product").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_unit_price(Money::zero()).is_ok());
        assert!(validate_unit_price(Money::from_cents(-1)).is_err());
        assert!(validate_shipping_cost(Money::from_cents(300)).is_ok());
    }

    #[test]
    fn test_validate_percent() {
        assert!(validate_percent("discount", Decimal::ZERO).is_ok());
        assert!(validate_percent("discount", Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percent("discount", dec("100.01")).is_err());
        assert!(validate_percent("discount", dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_exchange_rate() {
        assert!(validate_exchange_rate(dec("4100")).is_ok());
        assert!(validate_exchange_rate(Decimal::ZERO).is_err());
    }
}
