//! # iicm-console
//!
//! Thin layer that connects the pure invoicing core to the inventory API.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         iicm-console                                    │
//! │                                                                         │
//! │  • main.rs    - CLI: quote / check / submit an order file               │
//! │  • order      - order file → session operations                         │
//! │  • session    - InvoiceSession: draft + header + submit workflow        │
//! │  • api        - Backend trait, reqwest BackendClient                    │
//! │  • error      - ApiError (what the form sees)                           │
//! │  • config     - ConsoleConfig from IICM_* environment variables         │
//! │                                                                         │
//! │  All pricing and stock logic lives in iicm-core.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod order;
pub mod session;

use tracing_subscriber::EnvFilter;

pub use api::{Backend, BackendClient, ClientError, CreatedInvoice};
pub use config::{ConfigError, ConsoleConfig};
pub use error::{ApiError, ErrorCode};
pub use session::{InvoiceSession, SubmitError};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show every draft mutation
/// - `RUST_LOG=iicm_console=trace` - Trace for this crate only
/// - Default: INFO, with HTTP internals at WARN
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
