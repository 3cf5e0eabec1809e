//! # Payment Repository
//!
//! Applies payments to purchases and sales.
//!
//! ## Apply Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. load parent (purchase | sale)            NotFound                  │
//! │   2. sale only: reject returned sales         AlreadyReturned           │
//! │   3. paid = Σ payments(parent)                                          │
//! │   4. Balance(total, paid).accept_payment(x)   Validation / Overpayment  │
//! │   5. INSERT payments                                                    │
//! │   6. UPDATE parent SET paid, due, status, version = version + 1         │
//! │        WHERE version = <read version>         Conflict                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error rolls the whole transaction back. Payments never touch stock.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::purchase::fetch_purchase;
use crate::repository::sale::fetch_sale;
use tradesk_core::ledger::{ensure_sale_accepts_payments, Balance, PaymentRequest};
use tradesk_core::{Money, ParentType, Payment, Purchase, Sale, TenantId};

/// The record a payment was applied to, after the update.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "parent_type", content = "record", rename_all = "snake_case")]
pub enum PaymentParent {
    Purchase(Purchase),
    Sale(Sale),
}

impl PaymentParent {
    pub fn balance(&self) -> Balance {
        match self {
            PaymentParent::Purchase(p) => Balance::new(p.total, p.paid_amount),
            PaymentParent::Sale(s) => Balance::new(s.total, s.paid_amount),
        }
    }
}

/// Result of a committed payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub parent: PaymentParent,
    pub payment_id: String,
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Applies a payment to a purchase or sale.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - amount not positive
    /// - `Domain(NotFound)` - no such parent for this tenant
    /// - `Domain(AlreadyReturned)` - sale was returned
    /// - `Domain(Overpayment)` - amount exceeds the current due
    /// - `Conflict` - a concurrent writer changed the parent first
    pub async fn apply(&self, tenant: &TenantId, request: PaymentRequest) -> DbResult<PaymentReceipt> {
        let request = request.validate()?;
        let parent_type = request.parent_type;
        let parent_id = request.parent_id.as_str();

        debug!(
            tenant = %tenant,
            parent_type = parent_type.as_str(),
            parent_id = %parent_id,
            amount = %request.amount,
            "Applying payment"
        );

        let mut tx = self.pool.begin().await?;

        let (total, version) = match parent_type {
            ParentType::Purchase => {
                let purchase = fetch_purchase(&mut tx, tenant, parent_id)
                    .await?
                    .ok_or_else(|| tradesk_core::CoreError::not_found("Purchase", parent_id))?;
                (purchase.total, purchase.version)
            }
            ParentType::Sale => {
                let sale = fetch_sale(&mut tx, tenant, parent_id)
                    .await?
                    .ok_or_else(|| tradesk_core::CoreError::not_found("Sale", parent_id))?;
                ensure_sale_accepts_payments(&sale)?;
                (sale.total, sale.version)
            }
        };

        let paid = paid_total(&mut tx, tenant, parent_type, parent_id).await?;
        let balance = Balance::new(total, paid).accept_payment(request.amount)?;

        let payment_id = insert_payment(
            &mut tx,
            tenant,
            parent_type,
            parent_id,
            request.amount,
            request.date,
            request.notes.as_deref(),
        )
        .await?;

        write_balance(&mut tx, tenant, parent_type, parent_id, version, balance).await?;

        let parent = match parent_type {
            ParentType::Purchase => fetch_purchase(&mut tx, tenant, parent_id)
                .await?
                .map(PaymentParent::Purchase),
            ParentType::Sale => fetch_sale(&mut tx, tenant, parent_id)
                .await?
                .map(PaymentParent::Sale),
        }
        .ok_or_else(|| DbError::not_found(parent_type.entity(), parent_id))?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            payment_id = %payment_id,
            parent_type = parent_type.as_str(),
            parent_id = %parent_id,
            due = %balance.due(),
            status = balance.status().as_str(),
            "Payment applied"
        );

        Ok(PaymentReceipt { parent, payment_id })
    }

    /// Payment history of one purchase or sale, oldest first.
    pub async fn history(
        &self,
        tenant: &TenantId,
        parent_type: ParentType,
        parent_id: &str,
    ) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, tenant_id, parent_type, parent_id, amount, date, notes, created_at
            FROM payments
            WHERE tenant_id = ?1 AND parent_type = ?2 AND parent_id = ?3
            ORDER BY date, created_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(parent_type)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

/// Appends an immutable payment row and returns its id.
pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    parent_type: ParentType,
    parent_id: &str,
    amount: Money,
    date: NaiveDate,
    notes: Option<&str>,
) -> DbResult<String> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO payments (id, tenant_id, parent_type, parent_id, amount, date, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&id)
    .bind(tenant.as_str())
    .bind(parent_type)
    .bind(parent_id)
    .bind(amount)
    .bind(date)
    .bind(notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Σ payments recorded for a parent.
pub(crate) async fn paid_total(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    parent_type: ParentType,
    parent_id: &str,
) -> DbResult<Money> {
    let paise: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0) FROM payments
        WHERE tenant_id = ?1 AND parent_type = ?2 AND parent_id = ?3
        "#,
    )
    .bind(tenant.as_str())
    .bind(parent_type)
    .bind(parent_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_paise(paise))
}

/// Version-checked write of paid/due/status on a purchase or sale.
pub(crate) async fn write_balance(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    parent_type: ParentType,
    parent_id: &str,
    expected_version: i64,
    balance: Balance,
) -> DbResult<()> {
    let table = match parent_type {
        ParentType::Purchase => "purchases",
        ParentType::Sale => "sales",
    };
    let sql = format!(
        r#"
        UPDATE {} SET
            paid_amount = ?1,
            due_amount = ?2,
            payment_status = ?3,
            updated_at = ?4,
            version = version + 1
        WHERE tenant_id = ?5 AND id = ?6 AND version = ?7
        "#,
        table
    );

    let result = sqlx::query(&sql)
        .bind(balance.paid())
        .bind(balance.due())
        .bind(balance.status())
        .bind(Utc::now())
        .bind(tenant.as_str())
        .bind(parent_id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict(parent_type.entity(), parent_id));
    }
    Ok(())
}

/// All payments of a tenant, optionally restricted to one parent type.
pub(crate) async fn fetch_payments(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    parent_type: Option<ParentType>,
) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, tenant_id, parent_type, parent_id, amount, date, notes, created_at
        FROM payments
        WHERE tenant_id = ?1 AND (?2 IS NULL OR parent_type = ?2)
        ORDER BY date, created_at
        "#,
    )
    .bind(tenant.as_str())
    .bind(parent_type)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, db, new_purchase, other_tenant, tenant};
    use crate::{Database, DbConfig};
    use tradesk_core::order::{NewOrder, NewOrderLine, ReturnRequest};
    use tradesk_core::{CoreError, PaymentStatus, Quantity};

    fn pay(parent_type: ParentType, parent_id: &str, rupees: i64) -> PaymentRequest {
        PaymentRequest {
            parent_type,
            parent_id: parent_id.to_string(),
            amount: Money::from_rupees(rupees),
            date: date("2026-02-10"),
            notes: None,
        }
    }

    fn ad_hoc_order(total_rupees: i64) -> NewOrder {
        NewOrder {
            date: date("2026-02-01"),
            customer_name: "Meena".into(),
            customer_phone: None,
            customer_addr: None,
            lines: vec![NewOrderLine {
                product_id: None,
                product_name: "Tailoring".into(),
                qty: Quantity::from_units(1),
                unit: String::new(),
                unit_price: Money::from_rupees(total_rupees),
            }],
            paid_now: Money::zero(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_purchase_payment_sequence() {
        let db = db().await;
        let purchase = db
            .purchases()
            .record(&tenant(), new_purchase("Sugar", 10, 50))
            .await
            .unwrap();

        let receipt = db
            .payments()
            .apply(&tenant(), pay(ParentType::Purchase, &purchase.id, 300))
            .await
            .unwrap();
        let PaymentParent::Purchase(after) = &receipt.parent else {
            panic!("expected purchase parent");
        };
        assert_eq!(after.payment_status, PaymentStatus::Partial);
        assert_eq!(after.due_amount, Money::from_rupees(200));
        assert_eq!(after.version, 2);

        let receipt = db
            .payments()
            .apply(&tenant(), pay(ParentType::Purchase, &purchase.id, 200))
            .await
            .unwrap();
        assert_eq!(receipt.parent.balance().status(), PaymentStatus::Paid);
        assert!(receipt.parent.balance().due().is_zero());

        let err = db
            .payments()
            .apply(&tenant(), pay(ParentType::Purchase, &purchase.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Overpayment { .. })));
        assert_eq!(err.code(), "OVERPAYMENT");

        // rejected payment left no trace
        let history = db
            .payments()
            .history(&tenant(), ParentType::Purchase, &purchase.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_sale_payment_and_returned_sale() {
        let db = db().await;
        let receipt = db.sales().create_order(&tenant(), ad_hoc_order(400)).await.unwrap();
        let sale_id = receipt.sale.id.clone();

        let paid = db
            .payments()
            .apply(&tenant(), pay(ParentType::Sale, &sale_id, 150))
            .await
            .unwrap();
        assert_eq!(paid.parent.balance().due(), Money::from_rupees(250));

        db.sales()
            .return_order(
                &tenant(),
                &sale_id,
                ReturnRequest {
                    date: date("2026-02-11"),
                    notes: None,
                    collected_override: None,
                    owe_override: None,
                },
            )
            .await
            .unwrap();

        let err = db
            .payments()
            .apply(&tenant(), pay(ParentType::Sale, &sale_id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyReturned { .. })));
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_parent_not_found() {
        let db = db().await;
        let purchase = db
            .purchases()
            .record(&tenant(), new_purchase("Sugar", 10, 50))
            .await
            .unwrap();

        let err = db
            .payments()
            .apply(&other_tenant(), pay(ParentType::Purchase, &purchase.id, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = db
            .payments()
            .apply(&tenant(), pay(ParentType::Sale, &purchase.id, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_zero_payment_rejected() {
        let db = db().await;
        let purchase = db
            .purchases()
            .record(&tenant(), new_purchase("Sugar", 10, 50))
            .await
            .unwrap();
        let err = db
            .payments()
            .apply(&tenant(), pay(ParentType::Purchase, &purchase.id, 0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_payments_cannot_overpay() {
        // WAL mode leaves -wal/-shm files next to the database file
        let dir = std::env::temp_dir().join(format!("tradesk-race-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.db");
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();

        let purchase = db
            .purchases()
            .record(&tenant(), new_purchase("Sugar", 10, 50))
            .await
            .unwrap();

        // 300 + 300 > 500: at most one may commit
        let first = {
            let db = db.clone();
            let id = purchase.id.clone();
            tokio::spawn(async move {
                db.payments()
                    .apply(&tenant(), pay(ParentType::Purchase, &id, 300))
                    .await
            })
        };
        let second = {
            let db = db.clone();
            let id = purchase.id.clone();
            tokio::spawn(async move {
                db.payments()
                    .apply(&tenant(), pay(ParentType::Purchase, &id, 300))
                    .await
            })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let committed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(committed, 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                DbError::Conflict { .. } | DbError::Domain(CoreError::Overpayment { .. })
            ));
        }

        let after = db.purchases().get(&tenant(), &purchase.id).await.unwrap().unwrap();
        assert_eq!(after.paid_amount, Money::from_rupees(300));
        assert_eq!(after.due_amount, Money::from_rupees(200));

        db.close().await;
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(!dir.exists());
    }
}
