//! # Report Repository
//!
//! Loads the ledger for a tenant and hands it to the pure projections in
//! [`tradesk_core::report`] and [`tradesk_core::inventory`].
//!
//! Each report reads everything it needs inside one transaction, so the
//! figures come from a single consistent snapshot even while writers are
//! active.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::payment::fetch_payments;
use crate::repository::product::fetch_products;
use crate::repository::purchase::fetch_purchases;
use crate::repository::sale::fetch_sales;
use tradesk_core::inventory::{self, ProductStock, StockLevel};
use tradesk_core::report::{self, DueEntry, MonthlyRow, RefundOwed, Summary};
use tradesk_core::{DateRange, ParentType, RawConsumption, TenantId};

/// Repository for read-only report projections.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Dashboard totals over the whole ledger.
    pub async fn summary(&self, tenant: &TenantId) -> DbResult<Summary> {
        let mut tx = self.pool.begin().await?;
        let purchases = fetch_purchases(&mut tx, tenant, DateRange::all()).await?;
        let sales = fetch_sales(&mut tx, tenant, DateRange::all()).await?;
        tx.commit().await?;

        debug!(
            tenant = %tenant,
            purchases = purchases.len(),
            sales = sales.len(),
            "Building summary"
        );
        Ok(report::summarize(&purchases, &sales))
    }

    /// Purchases against collected sale payments per month.
    pub async fn monthly(&self, tenant: &TenantId) -> DbResult<Vec<MonthlyRow>> {
        let mut tx = self.pool.begin().await?;
        let purchases = fetch_purchases(&mut tx, tenant, DateRange::all()).await?;
        let sales = fetch_sales(&mut tx, tenant, DateRange::all()).await?;
        let payments = fetch_payments(&mut tx, tenant, Some(ParentType::Sale)).await?;
        tx.commit().await?;

        Ok(report::monthly(&purchases, &sales, &payments))
    }

    /// Open payables and receivables, oldest first.
    pub async fn dues(&self, tenant: &TenantId) -> DbResult<Vec<DueEntry>> {
        let mut tx = self.pool.begin().await?;
        let purchases = fetch_purchases(&mut tx, tenant, DateRange::all()).await?;
        let sales = fetch_sales(&mut tx, tenant, DateRange::all()).await?;
        tx.commit().await?;

        Ok(report::dues(&purchases, &sales))
    }

    /// Raw-material stock levels derived from purchases and recipe consumption.
    pub async fn inventory(&self, tenant: &TenantId) -> DbResult<Vec<StockLevel>> {
        let mut tx = self.pool.begin().await?;
        let purchases = fetch_purchases(&mut tx, tenant, DateRange::all()).await?;
        let consumptions = fetch_consumptions(&mut tx, tenant).await?;
        tx.commit().await?;

        debug!(
            tenant = %tenant,
            purchases = purchases.len(),
            consumptions = consumptions.len(),
            "Building inventory levels"
        );
        Ok(inventory::raw_material_levels(&purchases, &consumptions))
    }

    /// Finished-goods stock of active products.
    pub async fn product_stock(&self, tenant: &TenantId) -> DbResult<Vec<ProductStock>> {
        let mut conn = self.pool.acquire().await?;
        let products = fetch_products(&mut conn, tenant, false).await?;
        Ok(inventory::product_stock(&products))
    }

    /// Returned sales still owing money back to the customer.
    pub async fn refunds_owed(&self, tenant: &TenantId) -> DbResult<Vec<RefundOwed>> {
        let mut conn = self.pool.acquire().await?;
        let sales = fetch_sales(&mut conn, tenant, DateRange::all()).await?;
        Ok(report::refunds_owed(&sales))
    }
}

async fn fetch_consumptions(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
) -> DbResult<Vec<RawConsumption>> {
    let rows = sqlx::query_as::<_, RawConsumption>(
        r#"
        SELECT id, tenant_id, product_id, item, qty, unit, created_at
        FROM raw_consumptions
        WHERE tenant_id = ?1
        ORDER BY created_at
        "#,
    )
    .bind(tenant.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, db, manual_product, new_purchase, other_tenant, tenant};
    use crate::Database;
    use tradesk_core::ledger::PaymentRequest;
    use tradesk_core::order::{NewOrder, NewOrderLine, ReturnRequest};
    use tradesk_core::report::DueKind;
    use tradesk_core::{Money, Product, Quantity};

    fn order_for(product: &Product, qty: i64, paid_now: i64) -> NewOrder {
        NewOrder {
            date: date("2026-03-01"),
            customer_name: "Meena".into(),
            customer_phone: None,
            customer_addr: None,
            lines: vec![NewOrderLine {
                product_id: Some(product.id.clone()),
                product_name: String::new(),
                qty: Quantity::from_units(qty),
                unit: String::new(),
                unit_price: product.defined_price,
            }],
            paid_now: Money::from_rupees(paid_now),
            notes: None,
        }
    }

    /// One part-paid purchase, one open order and one returned order.
    async fn seeded() -> Database {
        let db = db().await;

        let purchase = db
            .purchases()
            .record(&tenant(), new_purchase("Sugar", 10, 50))
            .await
            .unwrap();
        db.payments()
            .apply(
                &tenant(),
                PaymentRequest {
                    parent_type: ParentType::Purchase,
                    parent_id: purchase.id.clone(),
                    amount: Money::from_rupees(200),
                    date: date("2026-01-15"),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let product = db
            .products()
            .record(&tenant(), manual_product("Ladoo box", 100, 5))
            .await
            .unwrap();
        db.sales()
            .create_order(&tenant(), order_for(&product, 2, 150))
            .await
            .unwrap();
        let returned = db
            .sales()
            .create_order(&tenant(), order_for(&product, 1, 100))
            .await
            .unwrap()
            .sale;
        db.sales()
            .return_order(
                &tenant(),
                &returned.id,
                ReturnRequest {
                    date: date("2026-03-04"),
                    notes: None,
                    collected_override: None,
                    owe_override: None,
                },
            )
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn test_summary() {
        let db = seeded().await;
        let summary = db.reports().summary(&tenant()).await.unwrap();

        assert_eq!(summary.purchase_total, Money::from_rupees(500));
        assert_eq!(summary.purchase_paid, Money::from_rupees(200));
        assert_eq!(summary.purchase_due, Money::from_rupees(300));
        assert_eq!(summary.sales_total, Money::from_rupees(300));
        assert_eq!(summary.sales_collected, Money::from_rupees(150));
        assert_eq!(summary.sales_due, Money::from_rupees(50));
        assert_eq!(summary.refunds_outstanding, Money::from_rupees(100));
        assert_eq!(summary.profit, Money::from_rupees(-50));
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.returned_count, 1);
        assert_eq!(summary.top_customer.unwrap().total, Money::from_rupees(200));
        assert_eq!(summary.top_product.unwrap().name, "Ladoo box");
    }

    #[tokio::test]
    async fn test_monthly_zero_fills_gaps() {
        let db = seeded().await;
        let rows = db.reports().monthly(&tenant()).await.unwrap();

        let months: Vec<_> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2026-01", "2026-02", "2026-03"]);
        assert_eq!(rows[0].purchases, Money::from_rupees(500));
        assert!(rows[1].purchases.is_zero() && rows[1].collected.is_zero());
        // the returned order's payment is left out
        assert_eq!(rows[2].collected, Money::from_rupees(150));
        assert_eq!(rows[2].profit, Money::from_rupees(150));
    }

    #[tokio::test]
    async fn test_dues_and_refunds_owed() {
        let db = seeded().await;

        let dues = db.reports().dues(&tenant()).await.unwrap();
        assert_eq!(dues.len(), 2);
        assert_eq!(dues[0].kind, DueKind::Payable);
        assert_eq!(dues[0].due, Money::from_rupees(300));
        assert_eq!(dues[1].kind, DueKind::Receivable);
        assert_eq!(dues[1].due, Money::from_rupees(50));

        let owed = db.reports().refunds_owed(&tenant()).await.unwrap();
        assert_eq!(owed.len(), 1);
        assert_eq!(owed[0].remaining, Money::from_rupees(100));
    }

    #[tokio::test]
    async fn test_stock_reports() {
        let db = seeded().await;

        let levels = db.reports().inventory(&tenant()).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].item, "Sugar");
        assert_eq!(levels[0].available, Quantity::from_units(10));

        let stock = db.reports().product_stock(&tenant()).await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].qty_available, Quantity::from_units(3));
        assert!(!stock[0].is_out_of_stock);
    }

    #[tokio::test]
    async fn test_reports_are_tenant_scoped() {
        let db = seeded().await;
        let summary = db.reports().summary(&other_tenant()).await.unwrap();

        assert!(summary.purchase_total.is_zero());
        assert_eq!(summary.sale_count, 0);
        assert!(summary.top_supplier.is_none());
        assert!(db.reports().monthly(&other_tenant()).await.unwrap().is_empty());
    }
}
