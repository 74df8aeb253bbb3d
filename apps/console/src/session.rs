//! # Invoice Session
//!
//! One invoice form: the draft, its header, the loaded catalog, and the
//! backend it submits to.
//!
//! ## Ownership
//! A session belongs to one form. Every mutation takes `&mut self`, so the
//! draft never needs a lock; the only awaits are the catalog load, the fresh
//! stock snapshot and the invoice POST.
//!
//! ## Submit Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         submit()                                        │
//! │                                                                         │
//! │  1. precheck(header, draft) ──── issues? ──► Blocked (no network)       │
//! │  2. GET /api/variants/      ──── fresh stock snapshot                   │
//! │  3. draft.revalidate_stock(snapshot)                                    │
//! │  4. precheck again          ──── issues? ──► Blocked                    │
//! │  5. POST /api/invoices/     ──── 4xx/5xx  ──► Rejected (translated)     │
//! │  6. 2xx ──► draft.reset(), header cleared, CreatedInvoice returned      │
//! │                                                                         │
//! │  Between steps 2 and 5 another sale can still take the stock; the       │
//! │  backend's own check catches that and step 5 reports it as a stock      │
//! │  issue in the same words as step 4.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use iicm_core::invoice::{InvoiceDraft, LineField, LineItem, PricingSettings, StockSnapshot, Totals};
use iicm_core::submission::{self, InvoiceHeader, RemoteRejection, SubmissionIssue};
use iicm_core::{CoreError, CoreResult, Money, Percent, ProductId, ProductRecord, VariantId, VariantRecord};

use crate::api::{Backend, ClientError, CreatedInvoice};

/// Why a submission did not create an invoice.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Local checks failed; nothing was sent.
    #[error("{}", join_issues(.0))]
    Blocked(Vec<SubmissionIssue>),

    /// The backend refused the invoice.
    #[error("{0}")]
    Rejected(RemoteRejection),

    /// The backend could not be reached or answered nonsense.
    #[error(transparent)]
    Client(ClientError),
}

fn join_issues(issues: &[SubmissionIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ClientError> for SubmitError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected(rejection) => SubmitError::Rejected(rejection),
            other => SubmitError::Client(other),
        }
    }
}

/// Invoice form state plus the backend it talks to.
pub struct InvoiceSession<B: Backend> {
    backend: B,
    draft: InvoiceDraft,
    header: InvoiceHeader,
    catalog: Vec<ProductRecord>,
}

impl<B: Backend> InvoiceSession<B> {
    pub fn new(backend: B, settings: PricingSettings) -> Self {
        InvoiceSession {
            backend,
            draft: InvoiceDraft::new(settings),
            header: InvoiceHeader::default(),
            catalog: Vec::new(),
        }
    }

    pub fn draft(&self) -> &InvoiceDraft {
        &self.draft
    }

    pub fn header(&self) -> &InvoiceHeader {
        &self.header
    }

    pub fn set_header(&mut self, header: InvoiceHeader) {
        self.header = header;
    }

    pub fn catalog(&self) -> &[ProductRecord] {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetches the product catalog; returns how many products were loaded.
    pub async fn load_catalog(&mut self) -> Result<usize, ClientError> {
        let products = self.backend.list_products().await?;
        info!(products = products.len(), "Catalog loaded");
        self.catalog = products;
        Ok(self.catalog.len())
    }

    /// Looks up a catalog product.
    pub fn product(&self, id: ProductId) -> Option<&ProductRecord> {
        self.catalog
            .iter()
            .find(|p| p.product_id().ok() == Some(id))
    }

    // -------------------------------------------------------------------------
    // Draft operations
    // -------------------------------------------------------------------------

    /// Selects a catalog product (and one of its variants) into a row.
    ///
    /// `variant_id == None` is only accepted for products without variants.
    /// Such a row has price and stock zero and no variant to refresh, so the
    /// stock rule keeps it from being submitted.
    pub fn select(
        &mut self,
        index: usize,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> CoreResult<&LineItem> {
        let product = self
            .catalog
            .iter()
            .find(|p| p.product_id().ok() == Some(product_id));

        let variant = match (product, variant_id) {
            (Some(product), Some(id)) => product.variant(id).cloned().ok_or_else(|| {
                CoreError::invalid_reference(
                    "variant",
                    format!("variant {} does not belong to product {}", id, product_id),
                )
            })?,
            (Some(product), None) if !product.variants.is_empty() => {
                return Err(CoreError::invalid_reference(
                    "variant",
                    format!("product {} has variants; choose one", product_id),
                ));
            }
            _ => VariantRecord::default(),
        };

        let line = self.draft.select_product_variant(index, product, &variant)?;
        debug!(
            index,
            product = %product_id,
            variant = ?variant_id,
            price = %line.unit_price(),
            stock = line.available_stock(),
            "Variant selected"
        );
        Ok(line)
    }

    pub fn update(&mut self, index: usize, field: LineField, raw: &str) -> CoreResult<&LineItem> {
        let line = self.draft.update_line_item(index, field, raw)?;
        debug!(index, ?field, raw, total = %line.line_total(), "Line updated");
        Ok(line)
    }

    pub fn add_line(&mut self) -> usize {
        let index = self.draft.add_line_item();
        debug!(index, "Line added");
        index
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<()> {
        self.draft.remove_line_item(index)?;
        debug!(index, remaining = self.draft.len(), "Line removed");
        Ok(())
    }

    pub fn clear_line(&mut self, index: usize) -> CoreResult<()> {
        self.draft.clear_line_item(index)?;
        debug!(index, "Line cleared");
        Ok(())
    }

    pub fn set_shipping_cost(&mut self, raw: &str) -> Money {
        let cost = self.draft.set_shipping_cost(raw);
        debug!(%cost, "Shipping cost set");
        cost
    }

    pub fn set_overall_discount(&mut self, raw: &str) -> Percent {
        let discount = self.draft.set_overall_discount(raw);
        debug!(%discount, "Overall discount set");
        discount
    }

    pub fn set_deduct_tax(&mut self, deduct: bool) {
        self.draft.set_deduct_tax(deduct);
        debug!(deduct, "Deduct tax set");
    }

    pub fn totals(&self) -> Totals {
        self.draft.totals()
    }

    // -------------------------------------------------------------------------
    // Checks and submission
    // -------------------------------------------------------------------------

    /// Refreshes stock from the backend; returns how many rows changed.
    pub async fn refresh_stock(&mut self) -> Result<usize, ClientError> {
        let variants = self.backend.list_variants().await?;
        let snapshot = StockSnapshot::from_variants(&variants);
        let changed = self.draft.revalidate_stock(&snapshot);
        info!(variants = snapshot.len(), changed, "Stock revalidated");
        Ok(changed)
    }

    /// Refreshes stock and lists everything that would block submission.
    pub async fn check(&mut self, today: NaiveDate) -> Result<Vec<SubmissionIssue>, ClientError> {
        self.refresh_stock().await?;
        let header = self.header.clone().with_default_date(today);
        Ok(submission::precheck(&header, &self.draft))
    }

    /// Submits the invoice; see the module docs for the steps.
    ///
    /// On success the draft and header are reset for the next invoice. On any
    /// failure they are left as they were (apart from refreshed stock).
    pub async fn submit(&mut self, today: NaiveDate) -> Result<CreatedInvoice, SubmitError> {
        let header = self.header.clone().with_default_date(today);

        let issues = submission::precheck(&header, &self.draft);
        if !issues.is_empty() {
            warn!(issues = issues.len(), "Submission blocked by precheck");
            return Err(SubmitError::Blocked(issues));
        }

        self.refresh_stock().await?;

        let payload = submission::build_payload(&header, &self.draft).map_err(|issues| {
            warn!(issues = issues.len(), "Submission blocked after stock refresh");
            SubmitError::Blocked(issues)
        })?;

        info!(
            customer = %payload.customer_id,
            items = payload.items.len(),
            total = %self.draft.totals().total,
            "Submitting invoice"
        );

        match self.backend.create_invoice(&payload).await {
            Ok(created) => {
                info!(id = %created.id, "Invoice created");
                self.draft.reset();
                self.header = InvoiceHeader::default();
                Ok(created)
            }
            Err(ClientError::Rejected(rejection)) => {
                warn!(
                    stock_conflict = rejection.is_stock_conflict(),
                    "Invoice rejected: {}", rejection
                );
                Err(SubmitError::Rejected(rejection))
            }
            Err(e) => {
                warn!("Invoice submission failed: {}", e);
                Err(SubmitError::Client(e))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
