//! # API Error Type
//!
//! Unified error type handed to the invoice form (or printed by the CLI).
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Invoice Console                    │
//! │                                                                         │
//! │  Draft edit ──── CoreError ─────────────────┐                           │
//! │                                             │                           │
//! │  Catalog/stock fetch ── ClientError ────────┼──► ApiError { code,       │
//! │                                             │              message,     │
//! │  submit() ──── SubmitError ─────────────────┘              issues }     │
//! │                 ├── Blocked  (local precheck)                           │
//! │                 ├── Rejected (backend said no)                          │
//! │                 └── Client   (network)                                  │
//! │                                                                         │
//! │  Stock problems carry code INSUFFICIENT_STOCK whether they were found   │
//! │  locally or by the backend, so the form handles them in one place.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use iicm_core::submission::{RemoteRejection, SubmissionIssue};
use iicm_core::CoreError;

use crate::api::ClientError;
use crate::session::SubmitError;

/// Error returned to the form.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for T-Shirt (M / Red): available 1, requested 3",
///   "issues": [{ "kind": "INSUFFICIENT_STOCK", "item": "T-Shirt (M / Red)", ... }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Individual problems, one per form field or line
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SubmissionIssue>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, variant or row does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Line operation not allowed (e.g. removing the last row)
    LineError,

    /// Insufficient stock, found locally or by the backend
    InsufficientStock,

    /// Backend refused the invoice for another reason
    Rejected,

    /// Backend unreachable or answered unexpectedly
    BackendUnavailable,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            issues: Vec::new(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    fn from_issues(code: ErrorCode, issues: Vec<SubmissionIssue>) -> Self {
        let code = if issues.iter().any(SubmissionIssue::is_stock_issue) {
            ErrorCode::InsufficientStock
        } else {
            code
        };
        let message = issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        ApiError {
            code,
            message,
            issues,
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LineIndexOutOfRange { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::CannotRemoveLastRow => ApiError::new(ErrorCode::LineError, err.to_string()),
            CoreError::InvalidReference { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::InsufficientStock {
                item,
                available,
                requested,
            } => ApiError::from_issues(
                ErrorCode::InsufficientStock,
                vec![SubmissionIssue::InsufficientStock {
                    item,
                    available,
                    requested,
                }],
            ),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts backend client errors to API errors.
impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected(rejection) => rejection.into(),
            ClientError::Decode { .. } => {
                tracing::error!("Unreadable backend response: {}", err);
                ApiError::new(
                    ErrorCode::BackendUnavailable,
                    "The server sent a response that could not be read",
                )
            }
            other => ApiError::new(ErrorCode::BackendUnavailable, other.to_string()),
        }
    }
}

impl From<RemoteRejection> for ApiError {
    fn from(rejection: RemoteRejection) -> Self {
        match rejection {
            RemoteRejection::Validation { issues } => {
                ApiError::from_issues(ErrorCode::Rejected, issues)
            }
            RemoteRejection::Unexpected { status, message } => {
                tracing::error!(status, "Unexpected invoice rejection: {}", message);
                ApiError::new(
                    ErrorCode::BackendUnavailable,
                    format!("The server could not create the invoice ({})", status),
                )
            }
        }
    }
}

/// Converts submission failures to API errors.
impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Blocked(issues) => ApiError::from_issues(ErrorCode::ValidationError, issues),
            SubmitError::Rejected(rejection) => rejection.into(),
            SubmitError::Client(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
