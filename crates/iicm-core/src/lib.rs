//! # iicm-core: Pure Invoicing Logic
//!
//! This crate is the invoice form's brain: line totals, discounts, tax,
//! currency conversion, stock checks and the submission payload, as pure
//! functions over an explicit draft value.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoicing Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Invoice Form (UI)                            │   │
//! │  │   Pick variant ──► Edit qty/price/disc ──► Totals ──► Submit    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ draft operations                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 iicm-console (session + client)                 │   │
//! │  │     catalog fetch, fresh stock snapshot, POST /api/invoices/    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ iicm-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  invoice  │  │   money   │  │submission │  │ validation│  │   │
//! │  │   │   Draft   │  │   Money   │  │ precheck  │  │  parsers  │  │   │
//! │  │   │  Totals   │  │  format   │  │  payload  │  │  ranges   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO ASYNC • NO CLOCK • PURE FUNCTIONS                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`invoice`] - The draft, its line operations, totals and stock checks
//! - [`money`] - Exact decimal money with USD and riel formatting
//! - [`submission`] - Header, precheck, payload building, rejection parsing
//! - [`types`] - Identifiers, percentages, catalog records, invoice enums
//! - [`validation`] - Lenient parsers and strict validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use iicm_core::invoice::{InvoiceDraft, LineField};
//!
//! let mut draft = InvoiceDraft::default();
//! draft.update_line_item(0, LineField::Quantity, "2").unwrap();
//! draft.update_line_item(0, LineField::UnitPrice, "10").unwrap();
//! draft.set_overall_discount("10");
//!
//! // $18.00 after discount, plus 10% tax
//! let totals = draft.totals();
//! assert_eq!(totals.display().total, "$19.80");
//! assert_eq!(totals.display().total_in_secondary_currency, "៛81,180");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceDraft, LineField, LineItem, PricingSettings, StockSnapshot, Totals};
pub use money::Money;
pub use submission::{InvoiceHeader, InvoicePayload, SubmissionIssue};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax applied to the discounted subtotal unless the draft deducts it.
///
/// The backend uses the same rate when it recomputes the invoice.
pub const DEFAULT_TAX_RATE_PERCENT: u32 = 10;

/// Riel per US dollar used for the secondary-currency total.
pub const DEFAULT_EXCHANGE_RATE: u32 = 4100;
