//! # Order / Return Rules
//!
//! Pricing of multi-line orders, return terms and refund paybacks.
//!
//! ## Order Flow
//! ```text
//! NewOrder ──► price_order(order, products) ──► PricedOrder
//!                 │                                 │
//!                 ├─ validate lines                 ├─ lines with snapshots
//!                 ├─ resolve products (NotFound)    ├─ total, paid_now
//!                 ├─ reject inactive products       ├─ stock deltas (per product)
//!                 └─ collect warnings               └─ warnings (non-blocking)
//!
//! Sale ──► resolve_return(sale, request) ──► ReturnTerms (collected, owe, restock)
//! Sale ──► accept_refund(sale, amount)   ──► remaining refund after payback
//! ```
//!
//! Warnings never block an order. Errors abort it as a whole.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{validate_paid_now, Balance};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Product, Sale};
use crate::validation::{
    normalize_optional, normalize_unit, validate_line_count, validate_name, validate_payment_amount,
    validate_price, validate_quantity, validate_total,
};

// =============================================================================
// Order Entry
// =============================================================================

/// One requested line. Without `product_id` the line is an ad-hoc item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderLine {
    #[serde(default)]
    pub product_id: Option<String>,
    /// Required for ad-hoc lines; product lines use the product's name.
    #[serde(default)]
    pub product_name: String,
    pub qty: Quantity,
    #[serde(default)]
    pub unit: String,
    pub unit_price: Money,
}

/// A customer order as entered by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_addr: Option<String>,
    pub lines: Vec<NewOrderLine>,
    #[serde(default)]
    pub paid_now: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    /// Distinct product ids referenced by the order, in first-seen order.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.lines.iter().filter_map(|l| l.product_id.as_deref()) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}

/// Non-blocking notice returned with a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum OrderWarning {
    /// A line was priced under the product's defined price.
    BelowDefinedPrice {
        line_no: i64,
        product_id: String,
        product_name: String,
        unit_price: Money,
        defined_price: Money,
    },
    /// The order takes more than the product has on hand.
    InsufficientStock {
        product_id: String,
        product_name: String,
        requested: Quantity,
        available: Quantity,
    },
}

/// A validated, priced line with its snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub line_no: i64,
    pub product_id: Option<String>,
    pub product_name: String,
    pub qty: Quantity,
    pub unit: String,
    pub unit_price: Money,
    pub line_total: Money,
    pub defined_price_snapshot: Money,
}

/// Change to one product's finished-goods counter.
///
/// `expected_version` is the version the change was computed against; the
/// write must fail if the row moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: String,
    pub qty: Quantity,
    pub expected_version: i64,
}

/// An order ready to be written.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub date: NaiveDate,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_addr: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<PricedLine>,
    pub total: Money,
    pub paid_now: Money,
    /// One decrement per touched product, aggregated over its lines.
    pub stock_deltas: Vec<StockDelta>,
    pub warnings: Vec<OrderWarning>,
}

impl PricedOrder {
    pub fn balance(&self) -> Balance {
        Balance::new(self.total, self.paid_now)
    }
}

/// Validates and prices an order against the current products.
///
/// `products` must hold every product the order references, keyed by id;
/// an id missing from it fails the whole order with `NotFound`.
pub fn price_order(order: NewOrder, products: &HashMap<String, Product>) -> CoreResult<PricedOrder> {
    let customer_name = validate_name("customer_name", &order.customer_name)?;
    validate_line_count(order.lines.len())?;

    let mut lines = Vec::with_capacity(order.lines.len());
    let mut deltas: Vec<StockDelta> = Vec::new();
    let mut warnings = Vec::new();

    for (idx, line) in order.lines.into_iter().enumerate() {
        let line_no = idx as i64 + 1;
        validate_quantity(&format!("lines[{}].qty", idx), line.qty)?;
        validate_price(&format!("lines[{}].unit_price", idx), line.unit_price)?;

        let line_total = validate_total(
            &format!("lines[{}].line_total", idx),
            line.unit_price.checked_multiply_quantity(line.qty),
        )?;

        let priced = match line.product_id {
            Some(product_id) => {
                let product = products
                    .get(&product_id)
                    .ok_or_else(|| CoreError::not_found("Product", product_id.as_str()))?;

                if !product.is_active {
                    return Err(ValidationError::Inconsistent {
                        field: format!("lines[{}].product_id", idx),
                        reason: format!("product '{}' is inactive", product.name),
                    }
                    .into());
                }

                if line.unit_price < product.defined_price {
                    warnings.push(OrderWarning::BelowDefinedPrice {
                        line_no,
                        product_id: product.id.clone(),
                        product_name: product.name.clone(),
                        unit_price: line.unit_price,
                        defined_price: product.defined_price,
                    });
                }

                match deltas.iter_mut().find(|d| d.product_id == product.id) {
                    Some(delta) => delta.qty += line.qty,
                    None => deltas.push(StockDelta {
                        product_id: product.id.clone(),
                        qty: line.qty,
                        expected_version: product.version,
                    }),
                }

                let unit = if line.unit.trim().is_empty() {
                    product.unit.clone()
                } else {
                    normalize_unit(&line.unit)?
                };

                PricedLine {
                    line_no,
                    product_id: Some(product.id.clone()),
                    product_name: product.name.clone(),
                    qty: line.qty,
                    unit,
                    unit_price: line.unit_price,
                    line_total,
                    defined_price_snapshot: product.defined_price,
                }
            }
            None => PricedLine {
                line_no,
                product_id: None,
                product_name: validate_name(&format!("lines[{}].product_name", idx), &line.product_name)?,
                qty: line.qty,
                unit: normalize_unit(&line.unit)?,
                unit_price: line.unit_price,
                line_total,
                defined_price_snapshot: Money::zero(),
            },
        };
        lines.push(priced);
    }

    for delta in &deltas {
        if let Some(product) = products.get(&delta.product_id) {
            if delta.qty > product.qty_available {
                warnings.push(OrderWarning::InsufficientStock {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    requested: delta.qty,
                    available: product.qty_available,
                });
            }
        }
    }

    let total = validate_total("total", Money::checked_sum(lines.iter().map(|l| l.line_total)))?;
    validate_paid_now(order.paid_now, total)?;

    Ok(PricedOrder {
        date: order.date,
        customer_name,
        customer_phone: normalize_optional("customer_phone", order.customer_phone.as_deref())?,
        customer_addr: normalize_optional("customer_addr", order.customer_addr.as_deref())?,
        notes: normalize_optional("notes", order.notes.as_deref())?,
        lines,
        total,
        paid_now: order.paid_now,
        stock_deltas: deltas,
        warnings,
    })
}

// =============================================================================
// Returns
// =============================================================================

/// A return of a whole sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnRequest {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to the sale's paid amount at return time.
    #[serde(default)]
    pub collected_override: Option<Money>,
    /// Defaults to the collected amount.
    #[serde(default)]
    pub owe_override: Option<Money>,
}

/// Stock to put back for one product on return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restock {
    pub product_id: String,
    pub qty: Quantity,
}

/// The outcome of a return, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTerms {
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub collected: Money,
    pub owe: Money,
    /// Per-product increments, aggregated over lines; ad-hoc lines excluded.
    pub restock: Vec<Restock>,
}

/// Resolves how a sale is returned.
///
/// ## Errors
/// - `AlreadyReturned` if the sale was returned before
/// - `Validation` if an override is negative or owe exceeds collected
pub fn resolve_return(sale: &Sale, request: ReturnRequest) -> CoreResult<ReturnTerms> {
    if sale.is_return {
        return Err(CoreError::AlreadyReturned {
            sale_id: sale.id.clone(),
        });
    }

    if let Some(collected) = request.collected_override {
        validate_price("collected_override", collected)?;
    }
    if let Some(owe) = request.owe_override {
        validate_price("owe_override", owe)?;
    }

    let collected = request.collected_override.unwrap_or(sale.paid_amount);
    let owe = request.owe_override.unwrap_or(collected);
    if owe > collected {
        return Err(ValidationError::Inconsistent {
            field: "owe_override".to_string(),
            reason: format!("refund owed {} exceeds amount collected {}", owe, collected),
        }
        .into());
    }

    let mut restock: Vec<Restock> = Vec::new();
    for line in &sale.items {
        let Some(product_id) = line.product_id.as_deref() else {
            continue;
        };
        match restock.iter_mut().find(|r| r.product_id == product_id) {
            Some(entry) => entry.qty += line.qty,
            None => restock.push(Restock {
                product_id: product_id.to_string(),
                qty: line.qty,
            }),
        }
    }

    Ok(ReturnTerms {
        date: request.date,
        notes: normalize_optional("return_notes", request.notes.as_deref())?,
        collected,
        owe,
        restock,
    })
}

// =============================================================================
// Refund Paybacks
// =============================================================================

/// A refund paid back to the customer of a returned sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundRequest {
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Checks a refund payback and returns the refund still owed after it.
///
/// Never looks at the sale's paid/due fields.
pub fn accept_refund(sale: &Sale, amount: Money) -> CoreResult<Money> {
    if !sale.is_return {
        return Err(CoreError::SaleNotReturned {
            sale_id: sale.id.clone(),
        });
    }
    validate_payment_amount("amount", amount)?;

    let remaining = sale.remaining_refund();
    if amount > remaining {
        return Err(CoreError::OverRefund {
            remaining,
            attempted: amount,
        });
    }

    Ok(remaining - amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
