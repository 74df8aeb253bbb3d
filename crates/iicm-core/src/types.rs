//! # Domain Types
//!
//! Core domain types used throughout the invoicing workspace.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ProductRecord  │   │  VariantRecord  │   │   Identifiers   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id, product    │   │  ProductId      │       │
//! │  │  name           │   │  size, color    │   │  VariantId      │       │
//! │  │  variants[]     │   │  selling_price  │   │  CustomerId     │       │
//! │  └─────────────────┘   │  stock          │   │  DeliveryMethod │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │  ExchangeRate   │   │ InvoiceStatus   │       │
//! │  │  [0, 100]       │   │  USD → KHR      │   │ PaymentMethod   │       │
//! │  │  clamped        │   │  > 0            │   │ InvoiceType     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Catalog Records Are Loose On Purpose
//! The backend serializes identifiers as numbers and decimal fields as
//! strings, and older endpoints have been seen sending either. Catalog records
//! keep those fields as raw JSON and expose typed accessors that apply the
//! fallback rules in [`crate::validation`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{self, ValidationResult};

// =============================================================================
// Percent
// =============================================================================

/// A percentage clamped to `[0, 100]`.
///
/// Used for per-line discounts, the overall discount and the tax rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct Percent(#[ts(type = "string")] Decimal);

impl Percent {
    /// Clamps any decimal into `[0, 100]`.
    pub fn clamped(value: Decimal) -> Self {
        Percent(value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
    }

    /// Strict constructor for configuration values.
    pub fn new(field: &str, value: Decimal) -> ValidationResult<Self> {
        validation::validate_percent(field, value)?;
        Ok(Percent(value))
    }

    /// Creates a percentage from a whole number (clamped).
    pub fn from_whole(pct: u32) -> Self {
        Percent::clamped(Decimal::from(pct))
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    /// The percentage value, e.g. `10` for 10%.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Units of the secondary currency per US dollar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ExchangeRate(#[ts(type = "string")] Decimal);

impl ExchangeRate {
    /// Creates a rate; it must be strictly positive.
    pub fn new(value: Decimal) -> ValidationResult<Self> {
        validation::validate_exchange_rate(value)?;
        Ok(ExchangeRate(value))
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate(Decimal::from(crate::DEFAULT_EXCHANGE_RATE))
    }
}

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[ts(export)]
        #[serde(try_from = "u32")]
        pub struct $name(u32);

        impl $name {
            /// Human-readable name used in error messages.
            pub const LABEL: &'static str = $label;

            /// Backend primary keys start at 1; zero is rejected.
            pub const fn new(raw: u32) -> Option<Self> {
                if raw == 0 {
                    None
                } else {
                    Some($name(raw))
                }
            }

            #[inline]
            pub const fn get(&self) -> u32 {
                self.0
            }

            /// Parses a JSON number or digit string.
            pub fn parse(value: &Value) -> ValidationResult<Self> {
                validation::parse_identifier(value, $label).map($name)
            }

            /// Parses a user-entered string.
            pub fn parse_str(raw: &str) -> ValidationResult<Self> {
                validation::parse_identifier_str(raw, $label).map($name)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = ValidationError;

            fn try_from(raw: u32) -> Result<Self, Self::Error> {
                $name::new(raw).ok_or_else(|| ValidationError::MustBePositive {
                    field: $label.to_string(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Product primary key.
    ProductId,
    "product"
);
entity_id!(
    /// Product variant (size/color) primary key.
    VariantId,
    "variant"
);
entity_id!(
    /// Customer primary key.
    CustomerId,
    "customer"
);
entity_id!(
    /// Delivery method primary key.
    DeliveryMethodId,
    "delivery method"
);

// =============================================================================
// Catalog Records
// =============================================================================

/// A product as served by `GET /api/products/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantRecord>,
}

impl ProductRecord {
    /// Typed product id, if the raw id is valid.
    pub fn product_id(&self) -> ValidationResult<ProductId> {
        ProductId::parse(&self.id)
    }

    /// Finds one of this product's variants by id.
    pub fn variant(&self, id: VariantId) -> Option<&VariantRecord> {
        self.variants
            .iter()
            .find(|v| v.variant_id().ok().flatten() == Some(id))
    }
}

/// A size/color variant as served by `GET /api/variants/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub product: Option<Value>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stock: Option<Value>,
    #[serde(default)]
    pub selling_price: Option<Value>,
}

impl VariantRecord {
    /// Typed variant id.
    ///
    /// - `Ok(None)`: the record carries no id (product has no variant dimension)
    /// - `Err(_)`: an id is present but is not a valid identifier
    pub fn variant_id(&self) -> ValidationResult<Option<VariantId>> {
        match &self.id {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => VariantId::parse(raw).map(Some),
        }
    }

    /// Selling price; missing, unparseable or negative prices become zero.
    pub fn selling_price(&self) -> Money {
        self.selling_price
            .as_ref()
            .and_then(validation::parse_decimal_value)
            .map(Money::new)
            .unwrap_or_default()
            .non_negative()
    }

    /// Stock on hand; missing or unparseable stock becomes zero.
    pub fn stock(&self) -> u32 {
        self.stock
            .as_ref()
            .and_then(validation::parse_decimal_value)
            .map(validation::decimal_to_count)
            .unwrap_or(0)
    }

    /// `"M / Red"`, `"M"`, or empty when the variant has neither.
    pub fn label(&self) -> String {
        [self.size.as_deref(), self.color.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

// =============================================================================
// Invoice Enums
// =============================================================================

/// Kind of document being issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    #[default]
    Invoice,
    Quote,
}

/// Lifecycle status of an invoice on the backend.
///
/// `Pending` and `Paid` invoices move stock out of the warehouse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    #[default]
    Pending,
    Paid,
    Cancelled,
}

/// How the customer settles the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

// =============================================================================
// Unit Tests
// =============================================================================
