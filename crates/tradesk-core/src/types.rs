//! # Domain Types
//!
//! Records of the bookkeeping ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Purchase     │   │     Product     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  raw material   │   │  finished good  │   │  order + lines  │       │
//! │  │  total/paid/due │   │  composition    │   │  total/paid/due │       │
//! │  │  low-stock thr. │   │  qty_available  │   │  return latch   │       │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │           │                     │                     │                 │
//! │           ▼                     ▼                     ▼                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Payment      │   │ RawConsumption  │   │ RefundPayment   │       │
//! │  │ (purchase|sale) │   │ (ingredients)   │   │ (returned sale) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total`, `paid_amount`, `due_amount` and `payment_status` are written only
//! by the ledger rules in [`crate::ledger`]; callers treat them as read-only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Tenant
// =============================================================================

/// The authenticated tenant (shop owner) every engine call is scoped to.
///
/// Supplied by the auth layer and passed explicitly into every repository
/// call; nothing in the engine looks it up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Derived tri-state of a purchase or sale balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

// =============================================================================
// Parent Type
// =============================================================================

/// Which ledger a payment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    /// Supplier payable.
    Purchase,
    /// Customer receivable.
    Sale,
}

impl ParentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentType::Purchase => "purchase",
            ParentType::Sale => "sale",
        }
    }

    /// Entity name used in not-found errors.
    pub fn entity(&self) -> &'static str {
        match self {
            ParentType::Purchase => "Purchase",
            ParentType::Sale => "Sale",
        }
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A raw-material purchase from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub tenant_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub supplier_name: String,
    /// Raw-material item key; stock is aggregated per exact item name.
    pub item: String,
    pub qty: Quantity,
    pub unit: String,
    pub unit_cost: Money,
    /// `qty × unit_cost`, rounded to the paisa.
    pub total: Money,
    pub paid_amount: Money,
    pub due_amount: Money,
    pub payment_status: PaymentStatus,
    /// Low-stock threshold for `item`; zero means never flag.
    pub low_stock_threshold: Quantity,
    pub notes: Option<String>,
    /// Opaque reference to an uploaded bill photo.
    pub image_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped by every write.
    pub version: i64,
}

// =============================================================================
// Product
// =============================================================================

/// One raw-material line of a product recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ingredient {
    pub item: String,
    pub qty: Quantity,
    pub unit: String,
    pub unit_cost: Money,
}

impl Ingredient {
    /// `qty × unit_cost`, `None` on overflow.
    pub fn cost(&self) -> Option<Money> {
        self.unit_cost.checked_multiply_quantity(self.qty)
    }
}

/// A flat extra charge on a recipe (labour, packing, transport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Charge {
    pub label: String,
    pub amount: Money,
}

/// How a product's defined price is obtained.
///
/// ```text
/// Manual { price }                 → operator-entered price
/// Built  { ingredients, charges }  → Σ ingredient qty×unit_cost + Σ charges
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Composition {
    Manual {
        price: Money,
    },
    Built {
        ingredients: Vec<Ingredient>,
        charges: Vec<Charge>,
    },
}

impl Composition {
    /// The pricing floor used for underpricing warnings.
    ///
    /// `None` when the recipe's roll-up overflows.
    ///
    /// ## Example
    /// ```rust
    /// use tradesk_core::{Charge, Composition, Ingredient, Money, Quantity};
    ///
    /// let recipe = Composition::Built {
    ///     ingredients: vec![Ingredient {
    ///         item: "Flour".into(),
    ///         qty: Quantity::from_milli(500),
    ///         unit: "kg".into(),
    ///         unit_cost: Money::from_rupees(40),
    ///     }],
    ///     charges: vec![Charge { label: "Baking".into(), amount: Money::from_rupees(15) }],
    /// };
    /// assert_eq!(recipe.defined_price(), Some(Money::from_rupees(35)));
    /// ```
    pub fn defined_price(&self) -> Option<Money> {
        match self {
            Composition::Manual { price } => Some(*price),
            Composition::Built {
                ingredients,
                charges,
            } => {
                let materials = ingredients
                    .iter()
                    .map(Ingredient::cost)
                    .collect::<Option<Vec<_>>>()?;
                Money::checked_sum(materials.into_iter().chain(charges.iter().map(|c| c.amount)))
            }
        }
    }

    pub fn kind(&self) -> CompositionKind {
        match self {
            Composition::Manual { .. } => CompositionKind::Manual,
            Composition::Built { .. } => CompositionKind::Built,
        }
    }

    /// Ingredient lines, empty for manual products.
    pub fn ingredients(&self) -> &[Ingredient] {
        match self {
            Composition::Manual { .. } => &[],
            Composition::Built { ingredients, .. } => ingredients,
        }
    }
}

/// Discriminant of [`Composition`], stored in the `products.composition` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    Manual,
    Built,
}

/// A finished good with its own sale stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub unit: String,
    pub composition: Composition,
    /// Materialized `composition.defined_price()`.
    pub defined_price: Money,
    /// Authoritative finished-goods counter; may be negative when oversold.
    pub qty_available: Quantity,
    pub is_active: bool,
    pub image_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Product {
    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        !self.qty_available.is_positive()
    }
}

/// Raw material spent when a built product's recipe was recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RawConsumption {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub item: String,
    pub qty: Quantity,
    pub unit: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale / Order
// =============================================================================

/// A line of an order.
///
/// Product name, unit and defined price are snapshots frozen at order time so
/// later product edits never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub sale_id: String,
    pub line_no: i64,
    /// `None` for ad-hoc items, which carry no stock effect.
    pub product_id: Option<String>,
    pub product_name: String,
    pub qty: Quantity,
    pub unit: String,
    pub unit_price: Money,
    pub line_total: Money,
    /// Pricing floor at order time; zero for ad-hoc items.
    pub defined_price_snapshot: Money,
}

/// A customer order (a legacy single-product sale is a one-line order).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_addr: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderLine>,
    pub total: Money,
    pub paid_amount: Money,
    /// Frozen once the sale is returned.
    pub due_amount: Money,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    /// One-way latch: normal → returned.
    pub is_return: bool,
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,
    pub return_notes: Option<String>,
    /// What the customer had paid that the return acknowledges.
    pub return_collected: Option<Money>,
    /// Refund liability; defaults to `return_collected`.
    pub return_owe: Option<Money>,
    /// Σ refund payments, kept apart from `paid_amount`.
    pub return_paid_back: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Sale {
    /// What the business still owes the customer after a return.
    pub fn remaining_refund(&self) -> Money {
        self.return_owe
            .unwrap_or_default()
            .saturating_sub(self.return_paid_back)
    }

    /// Customer-facing label: the first line's name, with a "+N" suffix.
    pub fn item_summary(&self) -> String {
        match self.items.as_slice() {
            [] => String::new(),
            [only] => only.product_name.clone(),
            [first, rest @ ..] => format!("{} +{}", first.product_name, rest.len()),
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

/// An immutable payment against a purchase or a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub parent_type: ParentType,
    pub parent_id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An immutable refund paid back to the customer of a returned sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RefundPayment {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive date filter for listings; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
