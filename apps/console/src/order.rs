//! Order files read by the CLI.
//!
//! An order file is what the invoice form would have typed, as JSON. It is
//! replayed through the same session operations the form uses, so lenient
//! parsing and reference checks behave identically.
//!
//! ```json
//! {
//!   "header": { "customerId": 4, "dueDate": "2026-11-17", "paymentMethod": "CASH" },
//!   "shippingCost": "3",
//!   "overallDiscount": "10",
//!   "deductTax": false,
//!   "lines": [
//!     { "productId": 1, "variantId": 3, "quantity": 2 },
//!     { "productName": "Assembly", "quantity": "1", "unitPrice": "5", "discountPercent": "50" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use iicm_core::invoice::LineField;
use iicm_core::submission::InvoiceHeader;
use iicm_core::{CoreResult, ProductId, VariantId};

use crate::api::Backend;
use crate::session::InvoiceSession;

/// One invoice as typed into the form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFile {
    #[serde(default)]
    pub header: InvoiceHeader,
    #[serde(default)]
    pub shipping_cost: Option<Value>,
    #[serde(default)]
    pub overall_discount: Option<Value>,
    #[serde(default)]
    pub deduct_tax: bool,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// One row; numeric inputs may be JSON numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub unit_price: Option<Value>,
    #[serde(default)]
    pub discount_percent: Option<Value>,
}

/// Errors reading an order file.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid order file {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl OrderFile {
    pub fn load(path: &Path) -> Result<Self, OrderError> {
        let text = std::fs::read_to_string(path).map_err(|e| OrderError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| OrderError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Any row that needs the catalog.
    pub fn references_catalog(&self) -> bool {
        self.lines.iter().any(|l| l.product_id.is_some())
    }

    /// Replays the order into a session.
    pub fn apply<B: Backend>(&self, session: &mut InvoiceSession<B>) -> CoreResult<()> {
        session.set_header(self.header.clone());

        for (i, line) in self.lines.iter().enumerate() {
            let index = if i == 0 { 0 } else { session.add_line() };

            if let Some(product_id) = line.product_id {
                session.select(index, product_id, line.variant_id)?;
            }

            let text_fields = [
                (LineField::ProductName, &line.product_name),
                (LineField::Size, &line.size),
                (LineField::Color, &line.color),
            ];
            for (field, value) in text_fields {
                if let Some(value) = value {
                    session.update(index, field, value)?;
                }
            }

            let numeric_fields = [
                (LineField::UnitPrice, &line.unit_price),
                (LineField::Quantity, &line.quantity),
                (LineField::DiscountPercent, &line.discount_percent),
            ];
            for (field, value) in numeric_fields {
                if let Some(value) = value {
                    session.update(index, field, &raw_input(value))?;
                }
            }
        }

        if let Some(cost) = &self.shipping_cost {
            session.set_shipping_cost(&raw_input(cost));
        }
        if let Some(discount) = &self.overall_discount {
            session.set_overall_discount(&raw_input(discount));
        }
        session.set_deduct_tax(self.deduct_tax);
        Ok(())
    }
}

/// What the user would have typed for this JSON value.
fn raw_input(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClientError, CreatedInvoice};
    use async_trait::async_trait;
    use iicm_core::invoice::PricingSettings;
    use iicm_core::submission::InvoicePayload;
    use iicm_core::{Money, ProductRecord, VariantRecord};
    use serde_json::json;

    struct CatalogOnly(Vec<ProductRecord>);

    #[async_trait]
    impl Backend for CatalogOnly {
        async fn list_products(&self) -> Result<Vec<ProductRecord>, ClientError> {
            Ok(self.0.clone())
        }

        async fn list_variants(&self) -> Result<Vec<VariantRecord>, ClientError> {
            Ok(Vec::new())
        }

        async fn create_invoice(&self, _: &InvoicePayload) -> Result<CreatedInvoice, ClientError> {
            unreachable!("order tests never submit")
        }
    }

    fn order() -> OrderFile {
        serde_json::from_value(json!({
            "header": {"customerId": 4, "dueDate": "2026-11-17", "paymentMethod": "CASH"},
            "shippingCost": 3,
            "overallDiscount": "10",
            "lines": [
                {"productId": 1, "variantId": 3, "quantity": 2},
                {"productName": "Assembly", "quantity": "1", "unitPrice": "5", "discountPercent": 50}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_replays_form_input() {
        let catalog = serde_json::from_value(json!([{
            "id": 1, "name": "T-Shirt",
            "variants": [{"id": 3, "size": "M", "stock": 5, "selling_price": "10"}]
        }]))
        .unwrap();
        let mut session = InvoiceSession::new(CatalogOnly(catalog), PricingSettings::default());
        session.load_catalog().await.unwrap();

        let order = order();
        assert!(order.references_catalog());
        order.apply(&mut session).unwrap();

        let draft = session.draft();
        assert_eq!(draft.len(), 2);
        assert_eq!(draft.line_item(0).unwrap().line_total(), Money::from_cents(2000));
        assert_eq!(draft.line_item(1).unwrap().line_total(), Money::from_cents(250));
        assert_eq!(draft.shipping_cost(), Money::from_cents(300));
        assert_eq!(session.totals().display().total, "$25.28");
        assert_eq!(session.header().customer_id.map(|c| c.get()), Some(4));
    }

    #[tokio::test]
    async fn test_apply_fails_on_unknown_product() {
        let mut session = InvoiceSession::new(CatalogOnly(Vec::new()), PricingSettings::default());
        assert!(order().apply(&mut session).is_err());
    }

    #[test]
    fn test_raw_input() {
        assert_eq!(raw_input(&json!(2)), "2");
        assert_eq!(raw_input(&json!("2.5")), "2.5");
        assert_eq!(raw_input(&json!(null)), "");
    }
}
