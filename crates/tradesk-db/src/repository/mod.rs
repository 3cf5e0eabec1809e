//! # Repository Module
//!
//! Database repository implementations for TradDesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, seed)                                      │
//! │       │                                                                 │
//! │       │  db.sales().create_order(&tenant, order)                       │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── BEGIN                                                              │
//! │  ├── read current rows          (fetch_* helpers)                      │
//! │  ├── apply tradesk-core rules   (price_order, Balance, ...)            │
//! │  ├── write, version-checked     (adjust_stock, write_balance)          │
//! │  └── COMMIT                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every query is scoped by tenant_id. Rows of another tenant are        │
//! │  reported as not found.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Raw-material purchases
//! - [`ProductRepository`](product::ProductRepository) - Products, recipes, finished stock
//! - [`SaleRepository`](sale::SaleRepository) - Orders, returns, refund paybacks
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments against purchases and sales
//! - [`ReportRepository`](report::ReportRepository) - Read-only projections
//!
//! The `pub(crate)` helpers in each module take a `&mut SqliteConnection` so
//! that one repository can reuse another's reads and writes inside its own
//! transaction.

pub mod payment;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::{Database, DbConfig};
    use tradesk_core::inventory::NewProduct;
    use tradesk_core::ledger::NewPurchase;
    use tradesk_core::{Composition, Money, Quantity, TenantId, DEFAULT_TENANT_ID};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn tenant() -> TenantId {
        TenantId::new(DEFAULT_TENANT_ID)
    }

    pub fn other_tenant() -> TenantId {
        TenantId::new("00000000-0000-0000-0000-000000000002")
    }

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Unpaid purchase of `qty` kg at `unit_cost` rupees per kg.
    pub fn new_purchase(item: &str, qty: i64, unit_cost: i64) -> NewPurchase {
        NewPurchase {
            date: date("2026-01-10"),
            supplier_name: "Sharma Traders".into(),
            item: item.into(),
            qty: Quantity::from_units(qty),
            unit: "kg".into(),
            unit_cost: Money::from_rupees(unit_cost),
            paid_now: Money::zero(),
            low_stock_threshold: Quantity::zero(),
            notes: None,
            image_ref: None,
        }
    }

    /// Manually priced product with `qty` units in stock.
    pub fn manual_product(name: &str, price: i64, qty: i64) -> NewProduct {
        NewProduct {
            name: name.into(),
            unit: "pcs".into(),
            composition: Composition::Manual {
                price: Money::from_rupees(price),
            },
            initial_qty: Quantity::from_units(qty),
            image_ref: None,
        }
    }
}
