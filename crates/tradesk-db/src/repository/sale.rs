//! # Sale Repository
//!
//! Orders, returns and refund paybacks.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE ORDER (one transaction)                                     │
//! │     ├── load referenced products                                       │
//! │     ├── price_order() → lines, total, stock deltas, warnings           │
//! │     ├── INSERT sales + order_lines                                     │
//! │     ├── UPDATE products qty_available -= Σ qty   (version-checked)     │
//! │     └── INSERT payments (paid_now, if any)                             │
//! │                                                                         │
//! │  2. PAYMENTS (PaymentRepository::apply) until due = 0                  │
//! │                                                                         │
//! │  3. (OPTIONAL) RETURN (one transaction, exactly once)                  │
//! │     ├── is_return = 1, return_collected, return_owe                    │
//! │     └── UPDATE products qty_available += Σ qty                         │
//! │         paid / due are frozen from here on                             │
//! │                                                                         │
//! │  4. REFUND PAYBACKS until return_paid_back = return_owe                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::payment::insert_payment;
use crate::repository::product::{adjust_stock, fetch_product};
use tradesk_core::order::{
    accept_refund, price_order, resolve_return, NewOrder, OrderWarning, RefundRequest,
    ReturnRequest,
};
use tradesk_core::validation::normalize_optional;
use tradesk_core::{
    DateRange, Money, OrderLine, ParentType, RefundPayment, Sale, TenantId,
};

const SALE_COLUMNS: &str = "id, tenant_id, date, customer_name, customer_phone, customer_addr, \
     total, paid_amount, due_amount, payment_status, notes, is_return, return_date, return_notes, \
     return_collected, return_owe, return_paid_back, created_at, updated_at, version";

const LINE_COLUMNS: &str = "id, sale_id, line_no, product_id, product_name, qty, unit, \
     unit_price, line_total, defined_price_snapshot";

/// A committed order with its non-blocking warnings.
#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub sale: Sale,
    pub warnings: Vec<OrderWarning>,
}

/// A committed refund payback.
#[derive(Debug, Clone, Serialize)]
pub struct RefundReceipt {
    pub sale_id: String,
    pub refund_payment_id: String,
    pub return_paid_back: Money,
    pub remaining_refund: Money,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Creates an order: sale, lines, stock decrements and the up-front
    /// payment commit together or not at all.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - bad line, customer or inactive product
    /// - `Domain(NotFound)` - a referenced product does not exist
    /// - `Domain(Overpayment)` - `paid_now` exceeds the total
    /// - `Conflict` - a touched product changed concurrently
    pub async fn create_order(&self, tenant: &TenantId, order: NewOrder) -> DbResult<OrderReceipt> {
        debug!(
            tenant = %tenant,
            customer = %order.customer_name,
            lines = order.lines.len(),
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        let mut products = HashMap::new();
        for product_id in order.product_ids() {
            if let Some(product) = fetch_product(&mut tx, tenant, &product_id).await? {
                products.insert(product_id, product);
            }
        }

        let priced = price_order(order, &products)?;
        let balance = priced.balance();
        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, date, customer_name, customer_phone, customer_addr,
                total, paid_amount, due_amount, payment_status, notes,
                is_return, return_paid_back, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                0, 0, ?12, ?12, 1
            )
            "#,
        )
        .bind(&sale_id)
        .bind(tenant.as_str())
        .bind(priced.date)
        .bind(&priced.customer_name)
        .bind(&priced.customer_phone)
        .bind(&priced.customer_addr)
        .bind(balance.total())
        .bind(balance.paid())
        .bind(balance.due())
        .bind(balance.status())
        .bind(&priced.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &priced.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, sale_id, line_no, product_id, product_name, qty, unit,
                    unit_price, line_total, defined_price_snapshot
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(line.line_no)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.qty)
            .bind(&line.unit)
            .bind(line.unit_price)
            .bind(line.line_total)
            .bind(line.defined_price_snapshot)
            .execute(&mut *tx)
            .await?;
        }

        for delta in &priced.stock_deltas {
            adjust_stock(
                &mut tx,
                tenant,
                &delta.product_id,
                -delta.qty,
                Some(delta.expected_version),
            )
            .await?;
        }

        if priced.paid_now.is_positive() {
            insert_payment(
                &mut tx,
                tenant,
                ParentType::Sale,
                &sale_id,
                priced.paid_now,
                priced.date,
                None,
            )
            .await?;
        }

        let sale = fetch_sale(&mut tx, tenant, &sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id.as_str()))?;

        tx.commit().await?;

        for warning in &priced.warnings {
            match warning {
                OrderWarning::BelowDefinedPrice {
                    product_name,
                    unit_price,
                    defined_price,
                    ..
                } => warn!(
                    sale_id = %sale.id,
                    product = %product_name,
                    unit_price = %unit_price,
                    defined_price = %defined_price,
                    "Order line priced below defined price"
                ),
                OrderWarning::InsufficientStock {
                    product_name,
                    requested,
                    available,
                    ..
                } => warn!(
                    sale_id = %sale.id,
                    product = %product_name,
                    requested = %requested,
                    available = %available,
                    "Order oversells product stock"
                ),
            }
        }

        info!(
            tenant = %tenant,
            sale_id = %sale.id,
            total = %sale.total,
            status = sale.payment_status.as_str(),
            warnings = priced.warnings.len(),
            "Order created"
        );

        Ok(OrderReceipt {
            sale,
            warnings: priced.warnings,
        })
    }

    /// Returns a whole sale: restores stock and records the refund liability.
    ///
    /// ## Errors
    /// - `NotFound` - no such sale for this tenant
    /// - `Domain(AlreadyReturned)` - the sale was returned before
    /// - `Domain(Validation)` - negative override, or owe above collected
    pub async fn return_order(
        &self,
        tenant: &TenantId,
        sale_id: &str,
        request: ReturnRequest,
    ) -> DbResult<Sale> {
        debug!(tenant = %tenant, sale_id = %sale_id, "Returning order");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, tenant, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        let terms = resolve_return(&sale, request)?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                is_return = 1,
                return_date = ?1,
                return_notes = ?2,
                return_collected = ?3,
                return_owe = ?4,
                updated_at = ?5,
                version = version + 1
            WHERE tenant_id = ?6 AND id = ?7 AND version = ?8 AND is_return = 0
            "#,
        )
        .bind(terms.date)
        .bind(&terms.notes)
        .bind(terms.collected)
        .bind(terms.owe)
        .bind(Utc::now())
        .bind(tenant.as_str())
        .bind(sale_id)
        .bind(sale.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Sale", sale_id));
        }

        for restock in &terms.restock {
            adjust_stock(&mut tx, tenant, &restock.product_id, restock.qty, None).await?;
        }

        let sale = fetch_sale(&mut tx, tenant, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            sale_id = %sale_id,
            collected = %terms.collected,
            owe = %terms.owe,
            restocked_products = terms.restock.len(),
            "Order returned"
        );
        Ok(sale)
    }

    /// Records money paid back to the customer of a returned sale.
    ///
    /// Touches only the refund ledger; the sale's paid/due stay frozen.
    pub async fn record_refund_payback(
        &self,
        tenant: &TenantId,
        sale_id: &str,
        request: RefundRequest,
    ) -> DbResult<RefundReceipt> {
        debug!(tenant = %tenant, sale_id = %sale_id, amount = %request.amount, "Recording refund payback");

        let notes = normalize_optional("notes", request.notes.as_deref())?;
        let mut tx = self.pool.begin().await?;

        let mut sale = fetch_sale(&mut tx, tenant, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        sale.return_paid_back = refunded_total(&mut tx, tenant, sale_id).await?;

        let remaining_refund = accept_refund(&sale, request.amount)?;
        let return_paid_back = sale.return_paid_back + request.amount;
        let refund_payment_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO refund_payments (id, tenant_id, sale_id, amount, date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&refund_payment_id)
        .bind(tenant.as_str())
        .bind(sale_id)
        .bind(request.amount)
        .bind(request.date)
        .bind(&notes)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET return_paid_back = ?1, updated_at = ?2, version = version + 1
            WHERE tenant_id = ?3 AND id = ?4 AND version = ?5
            "#,
        )
        .bind(return_paid_back)
        .bind(Utc::now())
        .bind(tenant.as_str())
        .bind(sale_id)
        .bind(sale.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Sale", sale_id));
        }

        tx.commit().await?;

        info!(
            tenant = %tenant,
            sale_id = %sale_id,
            paid_back = %return_paid_back,
            remaining = %remaining_refund,
            "Refund payback recorded"
        );

        Ok(RefundReceipt {
            sale_id: sale_id.to_string(),
            refund_payment_id,
            return_paid_back,
            remaining_refund,
        })
    }

    /// Gets a sale with its lines.
    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, tenant, id).await
    }

    /// Lists sales (with lines) in the date range, newest first.
    pub async fn list(&self, tenant: &TenantId, range: DateRange) -> DbResult<Vec<Sale>> {
        debug!(tenant = %tenant, from = ?range.from, to = ?range.to, "Listing sales");
        let mut conn = self.pool.acquire().await?;
        fetch_sales(&mut conn, tenant, range).await
    }

    /// Refund paybacks of a sale, oldest first.
    pub async fn refund_payments_for(
        &self,
        tenant: &TenantId,
        sale_id: &str,
    ) -> DbResult<Vec<RefundPayment>> {
        let refunds = sqlx::query_as::<_, RefundPayment>(
            r#"
            SELECT id, tenant_id, sale_id, amount, date, notes, created_at
            FROM refund_payments
            WHERE tenant_id = ?1 AND sale_id = ?2
            ORDER BY date, created_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(refunds)
    }

    /// Deletes a sale with its lines, payments and refunds.
    ///
    /// Stock taken by the order is put back, unless a return already did.
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        debug!(tenant = %tenant, id = %id, "Deleting sale");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        if sale.is_return {
            warn!(sale_id = %id, "Sale was returned, skipping stock restore");
        } else {
            for line in &sale.items {
                if let Some(product_id) = line.product_id.as_deref() {
                    adjust_stock(&mut tx, tenant, product_id, line.qty, None).await?;
                }
            }
        }

        sqlx::query("DELETE FROM payments WHERE tenant_id = ?1 AND parent_type = ?2 AND parent_id = ?3")
            .bind(tenant.as_str())
            .bind(ParentType::Sale)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // order_lines and refund_payments cascade
        sqlx::query("DELETE FROM sales WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(tenant = %tenant, id = %id, returned = sale.is_return, "Sale deleted");
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_sale(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    id: &str,
) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {} FROM sales WHERE tenant_id = ?1 AND id = ?2", SALE_COLUMNS);
    let Some(mut sale) = sqlx::query_as::<_, Sale>(&sql)
        .bind(tenant.as_str())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {} FROM order_lines WHERE sale_id = ?1 ORDER BY line_no",
        LINE_COLUMNS
    );
    sale.items = sqlx::query_as::<_, OrderLine>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(Some(sale))
}

pub(crate) async fn fetch_sales(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    range: DateRange,
) -> DbResult<Vec<Sale>> {
    let sql = format!(
        r#"
        SELECT {} FROM sales
        WHERE tenant_id = ?1
          AND (?2 IS NULL OR date >= ?2)
          AND (?3 IS NULL OR date <= ?3)
        ORDER BY date DESC, created_at DESC
        "#,
        SALE_COLUMNS
    );
    let mut sales = sqlx::query_as::<_, Sale>(&sql)
        .bind(tenant.as_str())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;

    let line_columns = LINE_COLUMNS
        .split(", ")
        .map(|c| format!("ol.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        r#"
        SELECT {} FROM order_lines ol
        JOIN sales s ON s.id = ol.sale_id
        WHERE s.tenant_id = ?1
          AND (?2 IS NULL OR s.date >= ?2)
          AND (?3 IS NULL OR s.date <= ?3)
        ORDER BY ol.sale_id, ol.line_no
        "#,
        line_columns
    );
    let lines = sqlx::query_as::<_, OrderLine>(&sql)
        .bind(tenant.as_str())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;

    let mut by_sale: HashMap<String, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        by_sale.entry(line.sale_id.clone()).or_default().push(line);
    }
    for sale in &mut sales {
        sale.items = by_sale.remove(&sale.id).unwrap_or_default();
    }

    Ok(sales)
}

async fn refunded_total(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    sale_id: &str,
) -> DbResult<Money> {
    let paise: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM refund_payments WHERE tenant_id = ?1 AND sale_id = ?2",
    )
    .bind(tenant.as_str())
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_paise(paise))
}

// =============================================================================
// Tests
// =============================================================================
