//! # Invoice Draft
//!
//! The invoice form's state as an explicit value plus the operations that
//! mutate it. Every operation runs to completion synchronously and leaves the
//! draft consistent, so a [`compute_totals`] call made right after any
//! mutation sees it.
//!
//! ## Draft Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Invoice Draft Operations                             │
//! │                                                                         │
//! │  Form Action             Operation                   Draft Change       │
//! │  ───────────             ─────────                   ────────────       │
//! │                                                                         │
//! │  Pick variant ─────────► select_product_variant() ─► row overwritten    │
//! │                                                      qty=1, disc=0      │
//! │                                                                         │
//! │  Edit qty/price/disc ──► update_line_item() ───────► row total redone   │
//! │                                                                         │
//! │  "Add row" ────────────► add_line_item() ──────────► rows.push(empty)   │
//! │                                                                         │
//! │  "Remove row" ─────────► remove_line_item() ───────► rows.remove(i)     │
//! │                                                      (never the last)   │
//! │                                                                         │
//! │  Before submit ────────► revalidate_stock() ───────► stock refreshed    │
//! │                                                                         │
//! │  Render ───────────────► compute_totals() ─────────► (read only)        │
//! │                          compute_stock_issue()                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Snapshots Go Stale
//! `available_stock` is copied from the variant when it is selected. Other
//! sessions may sell the same variant before this draft is submitted, so the
//! submit path refreshes it from a freshly fetched [`StockSnapshot`] first.
//! That narrows the window but cannot close it: two drafts can still both
//! pass the local check for the last unit. The backend's own check at commit
//! time is the authoritative one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{ExchangeRate, Percent, ProductId, ProductRecord, VariantId, VariantRecord};
use crate::validation;

// =============================================================================
// Line Fields
// =============================================================================

/// Editable fields of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum LineField {
    Quantity,
    UnitPrice,
    DiscountPercent,
    ProductName,
    Size,
    Color,
}

impl LineField {
    /// Numeric fields feed the line total.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            LineField::Quantity | LineField::UnitPrice | LineField::DiscountPercent
        )
    }
}

impl FromStr for LineField {
    type Err = ValidationError;

    /// Accepts the UI's camelCase names and the backend's snake_case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "quantity" => Ok(LineField::Quantity),
            "unitPrice" | "unit_price" => Ok(LineField::UnitPrice),
            "discountPercent" | "discount_percent" | "discount_percentage" | "discount" => {
                Ok(LineField::DiscountPercent)
            }
            "productName" | "product_name" => Ok(LineField::ProductName),
            "size" => Ok(LineField::Size),
            "color" => Ok(LineField::Color),
            other => Err(ValidationError::InvalidFormat {
                field: "line field".to_string(),
                reason: format!("unknown field '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product/variant row on the invoice.
///
/// ## Invariants
/// - `line_total == quantity × unit_price × (1 − discount_percent / 100)`
/// - `line_total >= 0` (quantity and price are never negative, discount ≤ 100)
/// - A row without `product_id` is a placeholder and never counts toward
///   stock issues or the submitted item list
///
/// Fields are private so the total cannot drift from its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    product_id: Option<ProductId>,
    variant_id: Option<VariantId>,
    product_name: String,
    size: String,
    color: String,
    quantity: u32,
    unit_price: Money,
    discount_percent: Percent,
    line_total: Money,
    available_stock: u32,
}

impl LineItem {
    /// A placeholder row: no product, quantity 1, zero price.
    pub fn empty() -> Self {
        LineItem {
            product_id: None,
            variant_id: None,
            product_name: String::new(),
            size: String::new(),
            color: String::new(),
            quantity: 1,
            unit_price: Money::zero(),
            discount_percent: Percent::zero(),
            line_total: Money::zero(),
            available_stock: 0,
        }
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn variant_id(&self) -> Option<VariantId> {
        self.variant_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn discount_percent(&self) -> Percent {
        self.discount_percent
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }

    pub fn available_stock(&self) -> u32 {
        self.available_stock
    }

    /// No product selected yet.
    pub fn is_placeholder(&self) -> bool {
        self.product_id.is_none()
    }

    /// Only rows with a product are sent to the backend.
    pub fn is_submittable(&self) -> bool {
        self.product_id.is_some()
    }

    /// Requested quantity exceeds the last known stock.
    pub fn has_stock_issue(&self) -> bool {
        self.is_submittable() && self.quantity > self.available_stock
    }

    /// `"T-Shirt (M / Red)"`, falling back to the product id.
    pub fn label(&self) -> String {
        let name = match (self.product_name.trim(), self.product_id) {
            ("", Some(id)) => format!("product #{}", id),
            ("", None) => "unselected item".to_string(),
            (name, _) => name.to_string(),
        };

        let variant = [self.size.trim(), self.color.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");

        if variant.is_empty() {
            name
        } else {
            format!("{} ({})", name, variant)
        }
    }

    fn recompute(&mut self) {
        self.line_total = line_total(self.quantity, self.unit_price, self.discount_percent);
    }

    fn apply(&mut self, field: LineField, raw: &str) {
        match field {
            LineField::Quantity => self.quantity = validation::parse_quantity(raw),
            LineField::UnitPrice => self.unit_price = validation::parse_amount(raw),
            LineField::DiscountPercent => self.discount_percent = validation::parse_percent(raw),
            LineField::ProductName => self.product_name = raw.to_string(),
            LineField::Size => self.size = raw.to_string(),
            LineField::Color => self.color = raw.to_string(),
        }

        if field.is_numeric() {
            self.recompute();
        }
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem::empty()
    }
}

/// `quantity × unit_price × (1 − discount / 100)`, unrounded.
pub fn line_total(quantity: u32, unit_price: Money, discount: Percent) -> Money {
    unit_price
        .multiply_quantity(quantity)
        .apply_percentage_discount(discount)
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Rates that are fixed for the lifetime of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSettings {
    /// Applied to the discounted subtotal unless tax is deducted.
    pub tax_rate: Percent,
    /// USD → secondary currency.
    pub exchange_rate: ExchangeRate,
}

impl Default for PricingSettings {
    /// 10% tax, 4100 riel per dollar.
    fn default() -> Self {
        PricingSettings {
            tax_rate: Percent::from_whole(crate::DEFAULT_TAX_RATE_PERCENT),
            exchange_rate: ExchangeRate::default(),
        }
    }
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// The order-level aggregate edited by the invoice form.
///
/// ## Invariants
/// - `line_items` is never empty; a fresh draft has exactly one empty row
/// - Rows keep insertion order
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    line_items: Vec<LineItem>,
    shipping_cost: Money,
    overall_discount_percent: Percent,
    deduct_tax: bool,
    tax_rate_percent: Percent,
    exchange_rate: ExchangeRate,
}

impl InvoiceDraft {
    /// Creates a draft with one empty row.
    pub fn new(settings: PricingSettings) -> Self {
        InvoiceDraft {
            line_items: vec![LineItem::empty()],
            shipping_cost: Money::zero(),
            overall_discount_percent: Percent::zero(),
            deduct_tax: false,
            tax_rate_percent: settings.tax_rate,
            exchange_rate: settings.exchange_rate,
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, index: usize) -> Option<&LineItem> {
        self.line_items.get(index)
    }

    pub fn len(&self) -> usize {
        self.line_items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn overall_discount_percent(&self) -> Percent {
        self.overall_discount_percent
    }

    pub fn deduct_tax(&self) -> bool {
        self.deduct_tax
    }

    pub fn tax_rate_percent(&self) -> Percent {
        self.tax_rate_percent
    }

    pub fn exchange_rate(&self) -> ExchangeRate {
        self.exchange_rate
    }

    pub fn settings(&self) -> PricingSettings {
        PricingSettings {
            tax_rate: self.tax_rate_percent,
            exchange_rate: self.exchange_rate,
        }
    }

    // -------------------------------------------------------------------------
    // Order-level inputs
    // -------------------------------------------------------------------------

    /// Sets the shipping cost from user input (invalid or negative → 0).
    pub fn set_shipping_cost(&mut self, raw: &str) -> Money {
        self.shipping_cost = validation::parse_amount(raw);
        self.shipping_cost
    }

    /// Sets the overall discount from user input (clamped to [0, 100]).
    pub fn set_overall_discount(&mut self, raw: &str) -> Percent {
        self.overall_discount_percent = validation::parse_percent(raw);
        self.overall_discount_percent
    }

    pub fn set_deduct_tax(&mut self, deduct: bool) {
        self.deduct_tax = deduct;
    }

    // -------------------------------------------------------------------------
    // Line operations
    // -------------------------------------------------------------------------

    /// Updates one field of one row from raw user input.
    ///
    /// Numeric fields parse leniently (failure → 0) and recompute the row's
    /// total. Text fields are stored as typed. Other rows are untouched.
    ///
    /// ## Example
    /// ```rust
    /// use iicm_core::invoice::{InvoiceDraft, LineField};
    /// use iicm_core::money::Money;
    ///
    /// let mut draft = InvoiceDraft::default();
    /// draft.update_line_item(0, LineField::UnitPrice, "10").unwrap();
    /// let line = draft.update_line_item(0, LineField::Quantity, "2").unwrap();
    /// assert_eq!(line.line_total(), Money::from_cents(2000));
    /// ```
    pub fn update_line_item(
        &mut self,
        index: usize,
        field: LineField,
        raw: &str,
    ) -> CoreResult<&LineItem> {
        let line = self.line_mut(index)?;
        line.apply(field, raw);
        Ok(line)
    }

    /// Fills a row from a catalog product and one of its variants.
    ///
    /// Overwrites product, variant, name, size, color, price and stock
    /// together, resets quantity to 1 and discount to 0. Nothing is written
    /// unless every reference resolves.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidReference`] when `product` is `None`, its id is
    ///   not a positive integer, or the variant has an id that is not one
    /// - [`CoreError::LineIndexOutOfRange`]
    pub fn select_product_variant(
        &mut self,
        index: usize,
        product: Option<&ProductRecord>,
        variant: &VariantRecord,
    ) -> CoreResult<&LineItem> {
        let product =
            product.ok_or_else(|| CoreError::invalid_reference("product", "no product selected"))?;
        let product_id = product
            .product_id()
            .map_err(|e| CoreError::invalid_reference("product", e.to_string()))?;
        let variant_id = variant
            .variant_id()
            .map_err(|e| CoreError::invalid_reference("variant", e.to_string()))?;

        let unit_price = variant.selling_price();
        let selected = LineItem {
            product_id: Some(product_id),
            variant_id,
            product_name: product.name.clone(),
            size: variant.size.clone().unwrap_or_default(),
            color: variant.color.clone().unwrap_or_default(),
            quantity: 1,
            unit_price,
            discount_percent: Percent::zero(),
            line_total: unit_price,
            available_stock: variant.stock(),
        };

        let line = self.line_mut(index)?;
        *line = selected;
        Ok(line)
    }

    /// Appends an empty row and returns its index.
    pub fn add_line_item(&mut self) -> usize {
        self.line_items.push(LineItem::empty());
        self.line_items.len() - 1
    }

    /// Removes a row, keeping the order of the others.
    ///
    /// ## Errors
    /// - [`CoreError::CannotRemoveLastRow`] when only one row remains
    /// - [`CoreError::LineIndexOutOfRange`]
    pub fn remove_line_item(&mut self, index: usize) -> CoreResult<()> {
        if self.line_items.len() == 1 {
            return Err(CoreError::CannotRemoveLastRow);
        }
        self.check_index(index)?;
        self.line_items.remove(index);
        Ok(())
    }

    /// Resets one row to an empty placeholder.
    pub fn clear_line_item(&mut self, index: usize) -> CoreResult<()> {
        *self.line_mut(index)? = LineItem::empty();
        Ok(())
    }

    /// Back to a fresh draft, keeping the tax and exchange rates.
    pub fn reset(&mut self) {
        *self = InvoiceDraft::new(self.settings());
    }

    /// Refreshes every row's stock from a fresh snapshot.
    ///
    /// Returns how many rows changed.
    pub fn revalidate_stock(&mut self, latest: &StockSnapshot) -> usize {
        let refreshed = revalidate_stock_against_latest(&self.line_items, latest);
        let changed = self
            .line_items
            .iter()
            .zip(&refreshed)
            .filter(|(before, after)| before.available_stock != after.available_stock)
            .count();
        self.line_items = refreshed;
        changed
    }

    // -------------------------------------------------------------------------
    // Derived values
    // -------------------------------------------------------------------------

    pub fn totals(&self) -> Totals {
        compute_totals(self)
    }

    pub fn has_stock_issue(&self) -> bool {
        compute_stock_issue(self)
    }

    pub fn stock_shortages(&self) -> Vec<StockShortage> {
        stock_shortages(self)
    }

    /// Rows that would be sent to the backend.
    pub fn valid_line_count(&self) -> usize {
        self.line_items.iter().filter(|l| l.is_submittable()).count()
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.line_items.len() {
            return Err(CoreError::LineIndexOutOfRange {
                index,
                len: self.line_items.len(),
            });
        }
        Ok(())
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut LineItem> {
        let len = self.line_items.len();
        self.line_items
            .get_mut(index)
            .ok_or(CoreError::LineIndexOutOfRange { index, len })
    }
}

impl Default for InvoiceDraft {
    fn default() -> Self {
        InvoiceDraft::new(PricingSettings::default())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Derived monetary totals of a draft, at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub taxable_amount: Money,
    pub shipping_display: Money,
    pub tax: Money,
    pub total: Money,
    pub total_in_secondary_currency: Money,
}

impl Totals {
    /// Rounds for display: USD to cents, riel to whole units.
    pub fn display(&self) -> TotalsDisplay {
        TotalsDisplay {
            subtotal: self.subtotal.format_usd(),
            discount_amount: self.discount_amount.format_usd(),
            taxable_amount: self.taxable_amount.format_usd(),
            shipping: self.shipping_display.format_usd(),
            tax: self.tax.format_usd(),
            total: self.total.format_usd(),
            total_in_secondary_currency: self.total_in_secondary_currency.format_riel(),
        }
    }
}

/// Formatted totals, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TotalsDisplay {
    pub subtotal: String,
    pub discount_amount: String,
    pub taxable_amount: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub total_in_secondary_currency: String,
}

/// Computes the draft's totals.
///
/// ## Calculation
/// ```text
/// subtotal        = Σ line_total            (placeholders add 0)
/// discount_amount = subtotal × overall% / 100
/// taxable_amount  = subtotal − discount_amount
/// tax             = deduct_tax ? 0 : taxable_amount × tax% / 100
/// total           = taxable_amount + shipping + tax
/// secondary       = total × exchange_rate
/// ```
///
/// Nothing is rounded here; see [`Totals::display`].
pub fn compute_totals(draft: &InvoiceDraft) -> Totals {
    let subtotal: Money = draft.line_items.iter().map(|l| l.line_total).sum();
    let discount_amount = subtotal.percentage(draft.overall_discount_percent);
    let taxable_amount = subtotal - discount_amount;
    let tax = if draft.deduct_tax {
        Money::zero()
    } else {
        taxable_amount.percentage(draft.tax_rate_percent)
    };
    let total = taxable_amount + draft.shipping_cost + tax;

    Totals {
        subtotal,
        discount_amount,
        taxable_amount,
        shipping_display: draft.shipping_cost,
        tax,
        total,
        total_in_secondary_currency: total.convert(draft.exchange_rate),
    }
}

// =============================================================================
// Stock Checks
// =============================================================================

/// True iff some row with a product asks for more than its known stock.
pub fn compute_stock_issue(draft: &InvoiceDraft) -> bool {
    draft.line_items.iter().any(LineItem::has_stock_issue)
}

/// A row that asks for more than the last known stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    /// Row index in the draft.
    pub index: usize,
    /// Human-readable item label.
    pub item: String,
    pub requested: u32,
    pub available: u32,
}

impl StockShortage {
    pub fn to_error(&self) -> CoreError {
        CoreError::InsufficientStock {
            item: self.item.clone(),
            available: self.available,
            requested: self.requested,
        }
    }
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Lists every row with a stock issue, in row order.
pub fn stock_shortages(draft: &InvoiceDraft) -> Vec<StockShortage> {
    draft
        .line_items
        .iter()
        .enumerate()
        .filter(|(_, line)| line.has_stock_issue())
        .map(|(index, line)| StockShortage {
            index,
            item: line.label(),
            requested: line.quantity,
            available: line.available_stock,
        })
        .collect()
}

/// Latest known stock per variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    stock: HashMap<VariantId, u32>,
}

impl StockSnapshot {
    pub fn new() -> Self {
        StockSnapshot::default()
    }

    /// Builds a snapshot from catalog variants; records without a valid id
    /// are skipped.
    pub fn from_variants<'a>(variants: impl IntoIterator<Item = &'a VariantRecord>) -> Self {
        variants
            .into_iter()
            .filter_map(|v| v.variant_id().ok().flatten().map(|id| (id, v.stock())))
            .collect()
    }

    pub fn insert(&mut self, id: VariantId, stock: u32) {
        self.stock.insert(id, stock);
    }

    pub fn get(&self, id: VariantId) -> Option<u32> {
        self.stock.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

impl FromIterator<(VariantId, u32)> for StockSnapshot {
    fn from_iter<I: IntoIterator<Item = (VariantId, u32)>>(iter: I) -> Self {
        StockSnapshot {
            stock: iter.into_iter().collect(),
        }
    }
}

/// Copies rows with `available_stock` refreshed from `latest`.
///
/// Rows without a variant, or whose variant is missing from `latest`, are
/// returned unchanged.
pub fn revalidate_stock_against_latest(
    line_items: &[LineItem],
    latest: &StockSnapshot,
) -> Vec<LineItem> {
    line_items
        .iter()
        .map(|line| {
            let fresh = line.variant_id.and_then(|id| latest.get(id));
            match fresh {
                Some(stock) => LineItem {
                    available_stock: stock,
                    ..line.clone()
                },
                None => line.clone(),
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    fn product(id: u32, name: &str) -> ProductRecord {
        ProductRecord {
            id: json!(id),
            name: name.to_string(),
            barcode: None,
            variants: Vec::new(),
        }
    }

    fn variant(id: u32, price: &str, stock: i64) -> VariantRecord {
        VariantRecord {
            id: Some(json!(id)),
            product: None,
            size: Some("M".to_string()),
            color: Some("Red".to_string()),
            stock: Some(json!(stock)),
            selling_price: Some(json!(price)),
        }
    }

    /// Two manual rows: 2 × $10, and 1 × $5 at 50% off.
    fn scenario_a_draft() -> InvoiceDraft {
        let mut draft = InvoiceDraft::default();
        draft.update_line_item(0, LineField::Quantity, "2").unwrap();
        draft.update_line_item(0, LineField::UnitPrice, "10").unwrap();
        draft.add_line_item();
        draft.update_line_item(1, LineField::Quantity, "1").unwrap();
        draft.update_line_item(1, LineField::UnitPrice, "5").unwrap();
        draft
            .update_line_item(1, LineField::DiscountPercent, "50")
            .unwrap();
        draft.set_overall_discount("10");
        draft.set_shipping_cost("3");
        draft
    }

    #[test]
    fn test_new_draft_has_one_empty_row() {
        let draft = InvoiceDraft::default();
        assert_eq!(draft.len(), 1);
        assert!(draft.line_item(0).unwrap().is_placeholder());
        assert_eq!(draft.tax_rate_percent(), Percent::from_whole(10));
        assert_eq!(draft.exchange_rate().value(), Decimal::from(4100));
        assert!(draft.totals().total.is_zero());
    }

    #[test]
    fn test_scenario_a_totals() {
        let draft = scenario_a_draft();
        assert_eq!(draft.line_item(0).unwrap().line_total(), money("20.00"));
        assert_eq!(draft.line_item(1).unwrap().line_total(), money("2.50"));

        let totals = draft.totals();
        assert_eq!(totals.subtotal, money("22.50"));
        assert_eq!(totals.discount_amount, money("2.25"));
        assert_eq!(totals.taxable_amount, money("20.25"));
        assert_eq!(totals.tax, money("2.025"));
        assert_eq!(totals.shipping_display, money("3"));
        assert_eq!(totals.total, money("25.275"));
        assert_eq!(totals.total_in_secondary_currency, money("103627.5"));

        let shown = totals.display();
        assert_eq!(shown.total, "$25.28");
        assert_eq!(shown.tax, "$2.03");
        assert_eq!(shown.subtotal, "$22.50");
        assert_eq!(shown.total_in_secondary_currency, "៛103,628");
    }

    #[test]
    fn test_scenario_b_deduct_tax() {
        let mut draft = scenario_a_draft();
        draft.set_deduct_tax(true);

        let totals = draft.totals();
        assert!(totals.tax.is_zero());
        assert_eq!(totals.total, money("23.25"));
    }

    #[test]
    fn test_scenario_c_select_out_of_stock_variant() {
        let mut draft = InvoiceDraft::default();
        let line = draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &variant(3, "19.99", 0))
            .unwrap();

        assert_eq!(line.unit_price(), money("19.99"));
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.available_stock(), 0);
        assert_eq!(line.line_total(), money("19.99"));
        assert_eq!(line.variant_id(), VariantId::new(3));
        assert!(draft.has_stock_issue());
    }

    #[test]
    fn test_scenario_d_unparseable_quantity_becomes_zero() {
        let mut draft = scenario_a_draft();
        let line = draft
            .update_line_item(0, LineField::Quantity, "abc")
            .unwrap();

        assert_eq!(line.quantity(), 0);
        assert!(line.line_total().is_zero());
    }

    #[test]
    fn test_line_total_never_negative() {
        let prices = ["0", "0.01", "5", "19.99", "1000000"];
        let discounts = ["0", "0.5", "33.333", "50", "99.99", "100"];
        for qty in [1u32, 2, 7, 1000] {
            for price in prices {
                for disc in discounts {
                    let total = line_total(
                        qty,
                        money(price),
                        validation::parse_percent(disc),
                    );
                    assert!(!total.is_negative(), "{} × {} @ {}%", qty, price, disc);
                }
            }
        }
    }

    #[test]
    fn test_hostile_input_keeps_line_total_non_negative() {
        let mut draft = InvoiceDraft::default();
        draft.update_line_item(0, LineField::UnitPrice, "-10").unwrap();
        draft.update_line_item(0, LineField::Quantity, "-3").unwrap();
        let line = draft
            .update_line_item(0, LineField::DiscountPercent, "250")
            .unwrap();

        assert!(line.unit_price().is_zero());
        assert_eq!(line.quantity(), 0);
        assert_eq!(line.discount_percent(), Percent::from_whole(100));
        assert!(!line.line_total().is_negative());
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals_including_placeholders() {
        let mut draft = InvoiceDraft::default();
        let mut expected = Money::zero();
        for i in 0..12u32 {
            let index = draft.add_line_item();
            if i % 3 == 0 {
                continue; // leave a placeholder row
            }
            draft
                .update_line_item(index, LineField::UnitPrice, &format!("{}.37", i))
                .unwrap();
            draft
                .update_line_item(index, LineField::Quantity, &(i + 1).to_string())
                .unwrap();
            draft
                .update_line_item(index, LineField::DiscountPercent, "12.5")
                .unwrap();
            expected += draft.line_item(index).unwrap().line_total();
        }

        assert_eq!(draft.len(), 13);
        assert_eq!(draft.totals().subtotal, expected);
    }

    #[test]
    fn test_tax_suppressed_for_any_rate() {
        for rate in [0u32, 7, 10, 25, 100] {
            let settings = PricingSettings {
                tax_rate: Percent::from_whole(rate),
                exchange_rate: ExchangeRate::default(),
            };
            let mut draft = InvoiceDraft::new(settings);
            draft.update_line_item(0, LineField::UnitPrice, "123.45").unwrap();
            draft.set_deduct_tax(true);
            assert!(draft.totals().tax.is_zero());
        }
    }

    #[test]
    fn test_compute_totals_is_idempotent() {
        let draft = scenario_a_draft();
        let first = compute_totals(&draft);
        let second = compute_totals(&draft);
        assert_eq!(first, second);
        assert_eq!(first.total.amount().serialize(), second.total.amount().serialize());
    }

    #[test]
    fn test_update_is_visible_to_next_totals_call() {
        let mut draft = scenario_a_draft();
        let before = draft.totals();
        draft.update_line_item(0, LineField::Quantity, "3").unwrap();
        let after = draft.totals();
        assert_eq!(after.subtotal, before.subtotal + money("10"));
    }

    #[test]
    fn test_update_has_no_cross_line_effects() {
        let mut draft = scenario_a_draft();
        let second = draft.line_item(1).unwrap().clone();
        draft.update_line_item(0, LineField::UnitPrice, "99").unwrap();
        assert_eq!(draft.line_item(1).unwrap(), &second);
    }

    #[test]
    fn test_text_fields_stored_verbatim() {
        let mut draft = InvoiceDraft::default();
        let before = draft.line_item(0).unwrap().line_total();
        let line = draft
            .update_line_item(0, LineField::ProductName, "  Linen Shirt ")
            .unwrap();
        assert_eq!(line.product_name(), "  Linen Shirt ");
        assert_eq!(line.line_total(), before);
    }

    #[test]
    fn test_update_out_of_range_index() {
        let mut draft = InvoiceDraft::default();
        let err = draft
            .update_line_item(5, LineField::Quantity, "1")
            .unwrap_err();
        assert_eq!(err, CoreError::LineIndexOutOfRange { index: 5, len: 1 });
    }

    #[test]
    fn test_stock_issue_ignores_placeholder_rows() {
        let mut draft = InvoiceDraft::default();
        draft
            .update_line_item(0, LineField::Quantity, "500")
            .unwrap();
        assert!(!draft.has_stock_issue());

        let index = draft.add_line_item();
        draft
            .select_product_variant(index, Some(&product(1, "Cap")), &variant(2, "4", 5))
            .unwrap();
        assert!(!draft.has_stock_issue());

        draft
            .update_line_item(index, LineField::Quantity, "6")
            .unwrap();
        assert!(draft.has_stock_issue());

        draft
            .update_line_item(index, LineField::Quantity, "5")
            .unwrap();
        assert!(!draft.has_stock_issue());
    }

    #[test]
    fn test_stock_shortages_describe_rows() {
        let mut draft = InvoiceDraft::default();
        draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &variant(3, "10", 2))
            .unwrap();
        draft.update_line_item(0, LineField::Quantity, "5").unwrap();

        let shortages = draft.stock_shortages();
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].index, 0);
        assert_eq!(
            shortages[0].to_string(),
            "Insufficient stock for T-Shirt (M / Red): available 2, requested 5"
        );
    }

    #[test]
    fn test_select_without_product_is_rejected_without_mutation() {
        let mut draft = scenario_a_draft();
        let before = draft.clone();

        let err = draft
            .select_product_variant(0, None, &variant(3, "19.99", 4))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference { reference: "product", .. }));
        assert_eq!(draft, before);
    }

    #[test]
    fn test_select_with_unparseable_variant_id_is_rejected() {
        let mut draft = scenario_a_draft();
        let before = draft.clone();
        let mut bad = variant(3, "19.99", 4);
        bad.id = Some(json!("v-3"));

        let err = draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &bad)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference { reference: "variant", .. }));
        assert_eq!(draft, before);
    }

    #[test]
    fn test_select_with_unparseable_product_id_is_rejected() {
        let mut draft = InvoiceDraft::default();
        let mut bad = product(1, "T-Shirt");
        bad.id = json!("abc");

        let err = draft
            .select_product_variant(0, Some(&bad), &variant(3, "1", 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference { reference: "product", .. }));
        assert!(draft.line_item(0).unwrap().is_placeholder());
    }

    #[test]
    fn test_select_without_variant_id_and_bad_price() {
        let mut draft = InvoiceDraft::default();
        let plain = VariantRecord {
            selling_price: Some(json!("free")),
            ..VariantRecord::default()
        };

        let line = draft
            .select_product_variant(0, Some(&product(9, "Gift Card")), &plain)
            .unwrap();
        assert_eq!(line.variant_id(), None);
        assert!(line.unit_price().is_zero());
        assert_eq!(line.available_stock(), 0);
        assert_eq!(line.label(), "Gift Card");
    }

    #[test]
    fn test_select_resets_quantity_and_discount() {
        let mut draft = InvoiceDraft::default();
        draft.update_line_item(0, LineField::Quantity, "9").unwrap();
        draft
            .update_line_item(0, LineField::DiscountPercent, "20")
            .unwrap();

        let line = draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &variant(3, "8.50", 10))
            .unwrap();
        assert_eq!(line.quantity(), 1);
        assert!(line.discount_percent().is_zero());
        assert_eq!(line.line_total(), money("8.50"));
    }

    #[test]
    fn test_remove_never_drops_below_one_row() {
        let mut draft = InvoiceDraft::default();
        assert_eq!(draft.remove_line_item(0), Err(CoreError::CannotRemoveLastRow));
        assert_eq!(draft.len(), 1);

        for _ in 0..4 {
            draft.add_line_item();
        }
        for _ in 0..10 {
            let _ = draft.remove_line_item(0);
            assert!(draft.len() >= 1);
        }
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut draft = InvoiceDraft::default();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            if i > 0 {
                draft.add_line_item();
            }
            draft
                .update_line_item(i, LineField::ProductName, name)
                .unwrap();
        }

        draft.remove_line_item(1).unwrap();
        let names: Vec<_> = draft.line_items().iter().map(|l| l.product_name()).collect();
        assert_eq!(names, vec!["a", "c"]);

        assert!(matches!(
            draft.remove_line_item(7),
            Err(CoreError::LineIndexOutOfRange { index: 7, len: 2 })
        ));
    }

    #[test]
    fn test_clear_and_reset() {
        let mut draft = scenario_a_draft();
        draft.clear_line_item(0).unwrap();
        assert!(draft.line_item(0).unwrap().is_placeholder());
        assert!(draft.line_item(0).unwrap().line_total().is_zero());

        draft.set_deduct_tax(true);
        draft.reset();
        assert_eq!(draft, InvoiceDraft::default());
    }

    #[test]
    fn test_revalidate_refreshes_known_variants_only() {
        let mut draft = InvoiceDraft::default();
        draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &variant(3, "10", 5))
            .unwrap();
        let second = draft.add_line_item();
        draft
            .select_product_variant(second, Some(&product(2, "Cap")), &variant(4, "4", 8))
            .unwrap();
        draft.add_line_item(); // placeholder

        let latest: StockSnapshot = [(VariantId::new(3).unwrap(), 1)].into_iter().collect();
        let refreshed = revalidate_stock_against_latest(draft.line_items(), &latest);

        assert_eq!(refreshed[0].available_stock(), 1);
        assert_eq!(refreshed[1].available_stock(), 8);
        assert_eq!(refreshed[2], draft.line_items()[2]);
        // the input is untouched
        assert_eq!(draft.line_item(0).unwrap().available_stock(), 5);

        assert_eq!(draft.revalidate_stock(&latest), 1);
        draft.update_line_item(0, LineField::Quantity, "2").unwrap();
        assert!(draft.has_stock_issue());
    }

    #[test]
    fn test_snapshot_from_variants_skips_invalid_ids() {
        let mut no_id = variant(1, "1", 1);
        no_id.id = None;
        let mut bad_id = variant(1, "1", 1);
        bad_id.id = Some(json!("x"));
        let records = vec![variant(5, "1", 7), no_id, bad_id];

        let snapshot = StockSnapshot::from_variants(&records);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(VariantId::new(5).unwrap()), Some(7));
    }

    #[test]
    fn test_valid_line_count() {
        let mut draft = InvoiceDraft::default();
        assert_eq!(draft.valid_line_count(), 0);
        draft
            .select_product_variant(0, Some(&product(1, "T-Shirt")), &variant(3, "10", 5))
            .unwrap();
        draft.add_line_item();
        assert_eq!(draft.valid_line_count(), 1);
    }

    #[test]
    fn test_line_field_names() {
        assert_eq!("unitPrice".parse::<LineField>().unwrap(), LineField::UnitPrice);
        assert_eq!(
            "discount_percentage".parse::<LineField>().unwrap(),
            LineField::DiscountPercent
        );
        assert!("price".parse::<LineField>().is_err());
    }

    #[test]
    fn test_draft_serializes_camel_case() {
        let draft = scenario_a_draft();
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value["lineItems"][1]["lineTotal"].is_string());
        assert_eq!(value["lineItems"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["overallDiscountPercent"], json!("10"));
        assert_eq!(value["deductTax"], json!(false));
    }
}
