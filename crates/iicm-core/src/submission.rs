//! # Submission
//!
//! Everything between "the user pressed Save" and the HTTP request, minus
//! the HTTP request itself.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Submit Pipeline                                  │
//! │                                                                         │
//! │  InvoiceHeader + InvoiceDraft                                           │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  precheck() ──────► [issues] ──► shown to the user, nothing is sent     │
//! │          │ (none)                                                       │
//! │          ▼                                                              │
//! │  (console refreshes stock and runs precheck() again)                    │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  build_payload() ─► InvoicePayload ─► POST /api/invoices/               │
//! │                                              │                          │
//! │                            2xx ◄─────────────┼──────────► 4xx/5xx       │
//! │                             │                            │              │
//! │                        reset draft          classify_rejection()        │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                 RemoteRejection (same issue types       │
//! │                                 as the local precheck)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backend Error Shapes
//! The invoice endpoint reports validation failures as
//! `{"field": ["msg", ...], "non_field_errors": ["msg"]}`, as a bare list of
//! messages, or nested per item (`{"items": [{}, {"quantity": ["msg"]}]}`).
//! Stock failures arrive as free text:
//!
//! ```text
//! Insufficient stock for variant T-Shirt - M. Requested: 5, Available: 2
//! Insufficient stock for T-Shirt (Variant: M): 2 available, 5 requested
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

use crate::invoice::{InvoiceDraft, LineItem, StockShortage};
use crate::money::Money;
use crate::types::{
    CustomerId, DeliveryMethodId, InvoiceStatus, InvoiceType, PaymentMethod, Percent, ProductId,
    VariantId,
};
use crate::validation;

// =============================================================================
// Invoice Header
// =============================================================================

/// Order-level fields that do not affect pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub delivery_method_id: Option<DeliveryMethodId>,
    #[serde(default)]
    pub invoice_type: InvoiceType,
    #[serde(default)]
    pub status: InvoiceStatus,
    /// Invoice date; the form fills in today when it is left empty.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: String,
}

impl InvoiceHeader {
    /// An empty header dated `date`.
    pub fn dated(date: NaiveDate) -> Self {
        InvoiceHeader {
            date: Some(date),
            ..InvoiceHeader::default()
        }
    }

    /// Fills in the invoice date if the user left it empty.
    pub fn with_default_date(mut self, today: NaiveDate) -> Self {
        self.date.get_or_insert(today);
        self
    }
}

// =============================================================================
// Submission Issues
// =============================================================================

/// A single reason an invoice cannot be (or was not) created.
///
/// Local prechecks and remote rejections produce the same type, so the form
/// renders both the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionIssue {
    #[error("Please select a customer")]
    MissingCustomer,

    #[error("Please choose an invoice date")]
    MissingDate,

    #[error("Please choose a due date")]
    MissingDueDate,

    #[error("Due date {due_date} is before invoice date {date}")]
    DueDateBeforeInvoiceDate {
        #[ts(type = "string")]
        date: NaiveDate,
        #[ts(type = "string")]
        due_date: NaiveDate,
    },

    #[error("Please select a payment method")]
    MissingPaymentMethod,

    #[error("Add at least one product to the invoice")]
    NoValidLineItems,

    /// A row with a product that the backend would refuse.
    #[error("Line {}: {reason}", .index + 1)]
    InvalidLine { index: usize, reason: String },

    /// An order-level value the backend would refuse.
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: u32,
        requested: u32,
    },

    /// A validation message from the backend that is not a stock failure.
    #[error("{}", rejection_text(.field, .message))]
    Rejected { field: String, message: String },
}

fn rejection_text(field: &str, message: &str) -> String {
    if field.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", field, message)
    }
}

impl SubmissionIssue {
    pub fn is_stock_issue(&self) -> bool {
        matches!(self, SubmissionIssue::InsufficientStock { .. })
    }
}

impl From<StockShortage> for SubmissionIssue {
    fn from(shortage: StockShortage) -> Self {
        SubmissionIssue::InsufficientStock {
            item: shortage.item,
            available: shortage.available,
            requested: shortage.requested,
        }
    }
}

// =============================================================================
// Precheck
// =============================================================================

/// Lists every reason the invoice cannot be submitted yet.
///
/// An empty result means the payload can be built. Issues are reported
/// individually and in form order, so the UI can flag each field.
pub fn precheck(header: &InvoiceHeader, draft: &InvoiceDraft) -> Vec<SubmissionIssue> {
    let mut issues = Vec::new();

    if header.customer_id.is_none() {
        issues.push(SubmissionIssue::MissingCustomer);
    }

    if header.date.is_none() {
        issues.push(SubmissionIssue::MissingDate);
    }
    match (header.date, header.due_date) {
        (_, None) => issues.push(SubmissionIssue::MissingDueDate),
        (Some(date), Some(due_date)) if due_date < date => {
            issues.push(SubmissionIssue::DueDateBeforeInvoiceDate { date, due_date })
        }
        _ => {}
    }

    if header.payment_method.is_none() {
        issues.push(SubmissionIssue::MissingPaymentMethod);
    }

    if let Err(e) = validation::validate_shipping_cost(draft.shipping_cost()) {
        issues.push(SubmissionIssue::InvalidField {
            field: "shipping cost".to_string(),
            message: e.to_string(),
        });
    }

    if draft.valid_line_count() == 0 {
        issues.push(SubmissionIssue::NoValidLineItems);
    }

    for (index, line) in draft.line_items().iter().enumerate() {
        if !line.is_submittable() {
            continue;
        }
        if let Err(e) = validate_line(line) {
            issues.push(SubmissionIssue::InvalidLine {
                index,
                reason: e.to_string(),
            });
        }
    }

    issues.extend(draft.stock_shortages().into_iter().map(SubmissionIssue::from));
    issues
}

fn validate_line(line: &LineItem) -> validation::ValidationResult<()> {
    validation::validate_quantity(line.quantity())?;
    validation::validate_unit_price(line.unit_price())?;
    validation::validate_percent("discount", line.discount_percent().value())
}

// =============================================================================
// Payload
// =============================================================================

/// Body of `POST /api/invoices/`.
///
/// Decimal fields serialize as strings; the backend parses them exactly.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct InvoicePayload {
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub status: InvoiceStatus,
    #[ts(type = "string")]
    pub date: NaiveDateTime,
    #[ts(type = "string")]
    pub due_date: NaiveDateTime,
    pub customer_id: CustomerId,
    pub delivery_method_id: Option<DeliveryMethodId>,
    pub notes: String,
    pub payment_method: PaymentMethod,
    pub shipping_cost: Money,
    /// Discount AMOUNT (not percent): the backend subtracts it as-is.
    pub overall_discount: Money,
    pub deduct_tax: bool,
    pub items: Vec<PayloadItem>,
}

/// One entry of `InvoicePayload::items`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PayloadItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount_percentage: Percent,
}

/// Builds the request body, or returns the precheck issues.
///
/// Placeholder rows are dropped. Dates are sent as midnight because the
/// endpoint expects date-times.
pub fn build_payload(
    header: &InvoiceHeader,
    draft: &InvoiceDraft,
) -> Result<InvoicePayload, Vec<SubmissionIssue>> {
    let issues = precheck(header, draft);
    if !issues.is_empty() {
        return Err(issues);
    }

    // precheck guarantees these are set
    let (Some(customer_id), Some(date), Some(due_date), Some(payment_method)) = (
        header.customer_id,
        header.date,
        header.due_date,
        header.payment_method,
    ) else {
        return Err(vec![SubmissionIssue::MissingCustomer]);
    };

    let items = draft
        .line_items()
        .iter()
        .filter_map(|line| {
            Some(PayloadItem {
                product_id: line.product_id()?,
                variant_id: line.variant_id(),
                quantity: line.quantity(),
                unit_price: line.unit_price(),
                discount_percentage: line.discount_percent(),
            })
        })
        .collect();

    Ok(InvoicePayload {
        invoice_type: header.invoice_type,
        status: header.status,
        date: date.and_time(NaiveTime::MIN),
        due_date: due_date.and_time(NaiveTime::MIN),
        customer_id,
        delivery_method_id: header.delivery_method_id,
        notes: header.notes.clone(),
        payment_method,
        shipping_cost: draft.shipping_cost(),
        overall_discount: draft.totals().discount_amount,
        deduct_tax: draft.deduct_tax(),
        items,
    })
}

// =============================================================================
// Remote Rejections
// =============================================================================

/// A failed `POST /api/invoices/`, translated for the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteRejection {
    /// The backend refused the invoice for reasons the user can fix.
    Validation { issues: Vec<SubmissionIssue> },
    /// Anything else: auth failures, server errors, unreadable bodies.
    Unexpected { status: u16, message: String },
}

impl RemoteRejection {
    pub fn issues(&self) -> &[SubmissionIssue] {
        match self {
            RemoteRejection::Validation { issues } => issues,
            RemoteRejection::Unexpected { .. } => &[],
        }
    }

    /// Some other sale took the stock between our check and the commit.
    pub fn is_stock_conflict(&self) -> bool {
        self.issues().iter().any(SubmissionIssue::is_stock_issue)
    }
}

impl fmt::Display for RemoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteRejection::Validation { issues } => {
                let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", messages.join("; "))
            }
            RemoteRejection::Unexpected { status, message } => {
                write!(f, "Server responded {}: {}", status, message)
            }
        }
    }
}

/// Translates a non-2xx response from the invoice endpoint.
///
/// 400 responses with readable messages become [`RemoteRejection::Validation`],
/// and a stock message becomes [`SubmissionIssue::InsufficientStock`] no matter
/// which field it was attached to. Everything else is `Unexpected`.
pub fn classify_rejection(status: u16, body: &Value) -> RemoteRejection {
    if status == 400 {
        let mut issues = Vec::new();
        collect_issues("", body, &mut issues);
        if !issues.is_empty() {
            return RemoteRejection::Validation { issues };
        }
    }

    RemoteRejection::Unexpected {
        status,
        message: unexpected_message(status, body),
    }
}

/// Stock failures in a server error text (e.g. a 500 raised by a stock hook).
///
/// The message may sit anywhere in the text, such as inside a debug page.
pub fn stock_issue_from_text(text: &str) -> Option<SubmissionIssue> {
    parse_insufficient_stock(text)
}

/// Stock failures anywhere in a decoded error body: every string value of
/// an object or list is searched.
pub fn stock_issue_from_value(body: &Value) -> Option<SubmissionIssue> {
    match body {
        Value::String(text) => stock_issue_from_text(text),
        Value::Array(entries) => entries.iter().find_map(stock_issue_from_value),
        Value::Object(map) => map.values().find_map(stock_issue_from_value),
        _ => None,
    }
}

fn collect_issues(field: &str, value: &Value, out: &mut Vec<SubmissionIssue>) {
    match value {
        Value::String(message) => out.push(issue_from_message(field, message)),
        Value::Array(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                match entry {
                    Value::Object(_) => collect_issues(&format!("{}[{}]", field, i), entry, out),
                    _ => collect_issues(field, entry, out),
                }
            }
        }
        Value::Object(map) => {
            for (key, entry) in map {
                let child = match key.as_str() {
                    "non_field_errors" | "detail" => field.to_string(),
                    _ if field.is_empty() => key.clone(),
                    _ => format!("{}.{}", field, key),
                };
                collect_issues(&child, entry, out);
            }
        }
        _ => {}
    }
}

fn issue_from_message(field: &str, message: &str) -> SubmissionIssue {
    parse_insufficient_stock(message).unwrap_or_else(|| SubmissionIssue::Rejected {
        field: field.to_string(),
        message: message.to_string(),
    })
}

fn parse_insufficient_stock(message: &str) -> Option<SubmissionIssue> {
    let start = message.find("Insufficient stock for ")?;
    let rest = &message[start + "Insufficient stock for ".len()..];
    let rest = rest.lines().next().unwrap_or_default();

    // "variant X. Requested: M, Available: N"
    if let Some((item, counts)) = rest.split_once(". Requested: ") {
        let (requested, counts) = leading_count(counts)?;
        let counts = counts.strip_prefix(", Available: ")?;
        let (available, _) = leading_count(counts)?;
        return Some(SubmissionIssue::InsufficientStock {
            item: item.trim_start_matches("variant ").trim().to_string(),
            available,
            requested,
        });
    }

    // "X (Variant: Y): N available, M requested"
    let (item, counts) = rest.split_once("): ")?;
    let (available, counts) = leading_count(counts)?;
    let counts = counts.strip_prefix(" available, ")?;
    let (requested, counts) = leading_count(counts)?;
    if !counts.starts_with(" requested") {
        return None;
    }
    Some(SubmissionIssue::InsufficientStock {
        item: format!("{})", item.trim()),
        available,
        requested,
    })
}

/// Reads the count at the start of `raw` and returns it with the rest.
///
/// The backend echoes quantities as integers or as decimals ("5.00"); a
/// trailing sentence dot is not part of the number.
fn leading_count(raw: &str) -> Option<(u32, &str)> {
    let end = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(raw.len());
    let number = raw[..end].trim_end_matches('.');
    let count = Decimal::from_str(number)
        .ok()
        .map(validation::decimal_to_count)?;
    Some((count, &raw[number.len()..]))
}

fn unexpected_message(status: u16, body: &Value) -> String {
    match body {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Object(map) => map
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Value::Null => format!("HTTP {}", status),
        other => other.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
