//! # Error Types
//!
//! Domain-specific error types for iicm-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  iicm-core errors (this file)                                          │
//! │  ├── CoreError        - Draft operation failures                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  iicm-console errors (app)                                             │
//! │  ├── ClientError      - HTTP / decoding failures                       │
//! │  ├── SubmitError      - Blocked or rejected submissions                │
//! │  └── ApiError         - What the UI sees (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → UI                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parse failures in numeric line fields are NOT errors: they degrade to
//! zero (see [`crate::validation`]). Errors here are reserved for operations
//! that must not be applied partially.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Failures of draft operations.
///
/// Every variant leaves the draft exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The row index does not address an existing line item.
    #[error("Line {index} does not exist (draft has {len} lines)")]
    LineIndexOutOfRange { index: usize, len: usize },

    /// The draft must always keep at least one row.
    ///
    /// ## User Workflow
    /// ```text
    /// Draft: [ row 0 ]
    ///      │
    ///      ▼
    /// remove_line_item(0)
    ///      │
    ///      ▼
    /// CannotRemoveLastRow  (UI offers "clear row" instead)
    /// ```
    #[error("Cannot remove the last line item; clear it instead")]
    CannotRemoveLastRow,

    /// A product or variant reference could not be resolved.
    ///
    /// ## When This Occurs
    /// - No product was passed to `select_product_variant`
    /// - The product id is not a positive integer
    /// - The variant carries an id that is not a positive integer
    #[error("Invalid {reference} reference: {reason}")]
    InvalidReference {
        reference: &'static str,
        reason: String,
    },

    /// Requested quantity exceeds the last known stock.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: u32,
        requested: u32,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn invalid_reference(reference: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidReference {
            reference,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., identifier that is not a positive integer).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
