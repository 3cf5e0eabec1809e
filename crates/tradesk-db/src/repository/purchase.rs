//! # Purchase Repository
//!
//! Raw-material purchases (supplier payables).
//!
//! ```text
//! record(NewPurchase)
//!   ├── validate + total = qty × unit_cost        (tradesk-core::ledger)
//!   ├── INSERT purchases (paid = paid_now)
//!   └── INSERT payments  (only when paid_now > 0)
//!        ... one transaction ...
//! ```
//!
//! After creation a purchase only changes through payments
//! ([`crate::repository::payment`]). Deleting it removes its payments too;
//! raw-material stock is derived, so its contribution disappears with it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::payment::insert_payment;
use tradesk_core::ledger::NewPurchase;
use tradesk_core::{DateRange, ParentType, Purchase, TenantId};

const PURCHASE_COLUMNS: &str = "id, tenant_id, date, supplier_name, item, qty, unit, unit_cost, \
     total, paid_amount, due_amount, payment_status, low_stock_threshold, notes, image_ref, \
     created_at, updated_at, version";

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a purchase, with `paid_now` as its first payment.
    pub async fn record(&self, tenant: &TenantId, input: NewPurchase) -> DbResult<Purchase> {
        let draft = input.validate()?;
        let balance = draft.balance();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(tenant = %tenant, id = %id, item = %draft.item, total = %draft.total, "Recording purchase");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, tenant_id, date, supplier_name, item, qty, unit, unit_cost,
                total, paid_amount, due_amount, payment_status, low_stock_threshold,
                notes, image_ref, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?16, 1
            )
            "#,
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(draft.date)
        .bind(&draft.supplier_name)
        .bind(&draft.item)
        .bind(draft.qty)
        .bind(&draft.unit)
        .bind(draft.unit_cost)
        .bind(balance.total())
        .bind(balance.paid())
        .bind(balance.due())
        .bind(balance.status())
        .bind(draft.low_stock_threshold)
        .bind(&draft.notes)
        .bind(&draft.image_ref)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if draft.paid_now.is_positive() {
            insert_payment(
                &mut tx,
                tenant,
                ParentType::Purchase,
                &id,
                draft.paid_now,
                draft.date,
                None,
            )
            .await?;
        }

        let purchase = fetch_purchase(&mut tx, tenant, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id.as_str()))?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            id = %purchase.id,
            supplier = %purchase.supplier_name,
            status = purchase.payment_status.as_str(),
            "Purchase recorded"
        );
        Ok(purchase)
    }

    /// Gets a purchase by ID.
    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Purchase>> {
        let mut conn = self.pool.acquire().await?;
        fetch_purchase(&mut conn, tenant, id).await
    }

    /// Lists purchases in the date range, newest first.
    pub async fn list(&self, tenant: &TenantId, range: DateRange) -> DbResult<Vec<Purchase>> {
        debug!(tenant = %tenant, from = ?range.from, to = ?range.to, "Listing purchases");
        let mut conn = self.pool.acquire().await?;
        fetch_purchases(&mut conn, tenant, range).await
    }

    /// Deletes a purchase and its payments.
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        debug!(tenant = %tenant, id = %id, "Deleting purchase");

        let mut tx = self.pool.begin().await?;

        let payments = sqlx::query(
            "DELETE FROM payments WHERE tenant_id = ?1 AND parent_type = ?2 AND parent_id = ?3",
        )
        .bind(tenant.as_str())
        .bind(ParentType::Purchase)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM purchases WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        tx.commit().await?;

        info!(
            tenant = %tenant,
            id = %id,
            payments_removed = payments.rows_affected(),
            "Purchase deleted"
        );
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_purchase(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    id: &str,
) -> DbResult<Option<Purchase>> {
    let sql = format!(
        "SELECT {} FROM purchases WHERE tenant_id = ?1 AND id = ?2",
        PURCHASE_COLUMNS
    );
    let purchase = sqlx::query_as::<_, Purchase>(&sql)
        .bind(tenant.as_str())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(purchase)
}

pub(crate) async fn fetch_purchases(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    range: DateRange,
) -> DbResult<Vec<Purchase>> {
    let sql = format!(
        r#"
        SELECT {} FROM purchases
        WHERE tenant_id = ?1
          AND (?2 IS NULL OR date >= ?2)
          AND (?3 IS NULL OR date <= ?3)
        ORDER BY date DESC, created_at DESC
        "#,
        PURCHASE_COLUMNS
    );
    let purchases = sqlx::query_as::<_, Purchase>(&sql)
        .bind(tenant.as_str())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *conn)
        .await?;
    Ok(purchases)
}

// =============================================================================
// Tests
// =============================================================================
