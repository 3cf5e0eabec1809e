//! # Report Projections
//!
//! Read-only views computed from the persisted ledger. Nothing here writes;
//! every figure is recomputed from records on each call.
//!
//! - [`summarize`] - totals, counts and top counterparties
//! - [`monthly`] - purchases vs collected payments per `YYYY-MM`
//! - [`dues`] - open payables and receivables, oldest first
//! - [`refunds_owed`] - returned sales still owing a refund

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ParentType, Payment, PaymentStatus, Purchase, Sale};

// =============================================================================
// Summary
// =============================================================================

/// A counterparty or product with its aggregated amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopEntry {
    pub name: String,
    pub total: Money,
}

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Summary {
    pub purchase_total: Money,
    pub purchase_paid: Money,
    pub purchase_due: Money,
    /// All sales, returned ones included.
    pub sales_total: Money,
    /// Paid amount of non-returned sales.
    pub sales_collected: Money,
    pub sales_due: Money,
    pub refunds_outstanding: Money,
    /// `sales_collected − purchase_paid`.
    pub profit: Money,
    pub purchase_count: i64,
    pub sale_count: i64,
    pub returned_count: i64,
    pub top_supplier: Option<TopEntry>,
    pub top_customer: Option<TopEntry>,
    pub top_product: Option<TopEntry>,
}

/// Highest aggregated amount per name; ties go to the alphabetically first name.
fn top_by<'a, I>(entries: I) -> Option<TopEntry>
where
    I: IntoIterator<Item = (&'a str, Money)>,
{
    let mut totals: BTreeMap<&str, Money> = BTreeMap::new();
    for (name, amount) in entries {
        *totals.entry(name).or_default() += amount;
    }

    let mut best: Option<(&str, Money)> = None;
    for (name, total) in totals {
        if best.map_or(true, |(_, top)| total > top) {
            best = Some((name, total));
        }
    }

    best.map(|(name, total)| TopEntry {
        name: name.to_string(),
        total,
    })
}

/// Builds the dashboard summary. `sales` must carry their `items`.
pub fn summarize(purchases: &[Purchase], sales: &[Sale]) -> Summary {
    let purchase_total: Money = purchases.iter().map(|p| p.total).sum();
    let purchase_paid: Money = purchases.iter().map(|p| p.paid_amount).sum();
    let purchase_due: Money = purchases.iter().map(|p| p.due_amount).sum();

    let open = || sales.iter().filter(|s| !s.is_return);
    let sales_total: Money = sales.iter().map(|s| s.total).sum();
    let sales_collected: Money = open().map(|s| s.paid_amount).sum();
    let sales_due: Money = open().map(|s| s.due_amount).sum();
    let refunds_outstanding: Money = sales
        .iter()
        .filter(|s| s.is_return)
        .map(Sale::remaining_refund)
        .sum();

    Summary {
        purchase_total,
        purchase_paid,
        purchase_due,
        sales_total,
        sales_collected,
        sales_due,
        refunds_outstanding,
        profit: sales_collected - purchase_paid,
        purchase_count: purchases.len() as i64,
        sale_count: sales.len() as i64,
        returned_count: sales.iter().filter(|s| s.is_return).count() as i64,
        top_supplier: top_by(purchases.iter().map(|p| (p.supplier_name.as_str(), p.total))),
        top_customer: top_by(open().map(|s| (s.customer_name.as_str(), s.total))),
        top_product: top_by(
            open()
                .flat_map(|s| s.items.iter())
                .map(|l| (l.product_name.as_str(), l.line_total)),
        ),
    }
}

// =============================================================================
// Monthly
// =============================================================================

/// One calendar month of activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyRow {
    /// `YYYY-MM`
    pub month: String,
    pub purchases: Money,
    pub collected: Money,
    /// `collected − purchases`
    pub profit: Money,
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Purchases by purchase month against sale payments by payment month.
///
/// Payments of returned sales are left out. Every month between the first and
/// last active month is present, zero-filled, in ascending order.
pub fn monthly(purchases: &[Purchase], sales: &[Sale], payments: &[Payment]) -> Vec<MonthlyRow> {
    let returned: HashMap<&str, bool> = sales.iter().map(|s| (s.id.as_str(), s.is_return)).collect();
    let mut months: BTreeMap<(i32, u32), (Money, Money)> = BTreeMap::new();

    for purchase in purchases {
        months.entry(month_key(purchase.date)).or_default().0 += purchase.total;
    }

    for payment in payments {
        if payment.parent_type != ParentType::Sale {
            continue;
        }
        match returned.get(payment.parent_id.as_str()) {
            Some(false) => {}
            // returned, or a sale outside the given set
            _ => continue,
        }
        months.entry(month_key(payment.date)).or_default().1 += payment.amount;
    }

    let (Some(&first), Some(&last)) = (months.keys().next(), months.keys().next_back()) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut key = first;
    loop {
        let (purchases, collected) = months.get(&key).copied().unwrap_or_default();
        rows.push(MonthlyRow {
            month: format!("{:04}-{:02}", key.0, key.1),
            purchases,
            collected,
            profit: collected - purchases,
        });
        if key == last {
            break;
        }
        key = next_month(key);
    }
    rows
}

// =============================================================================
// Dues
// =============================================================================

/// Which side of the books an open balance sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DueKind {
    /// Owed to a supplier.
    Payable,
    /// Owed by a customer.
    Receivable,
}

/// An open balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DueEntry {
    pub kind: DueKind,
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub counterparty: String,
    /// Purchased item, or the order's item summary.
    pub description: String,
    pub total: Money,
    pub paid: Money,
    pub due: Money,
    pub status: PaymentStatus,
}

/// Purchases and non-returned sales with a positive due, oldest first.
pub fn dues(purchases: &[Purchase], sales: &[Sale]) -> Vec<DueEntry> {
    let payables = purchases
        .iter()
        .filter(|p| p.due_amount.is_positive())
        .map(|p| {
            (
                p.created_at,
                DueEntry {
                    kind: DueKind::Payable,
                    id: p.id.clone(),
                    date: p.date,
                    counterparty: p.supplier_name.clone(),
                    description: p.item.clone(),
                    total: p.total,
                    paid: p.paid_amount,
                    due: p.due_amount,
                    status: p.payment_status,
                },
            )
        });

    let receivables = sales
        .iter()
        .filter(|s| !s.is_return && s.due_amount.is_positive())
        .map(|s| {
            (
                s.created_at,
                DueEntry {
                    kind: DueKind::Receivable,
                    id: s.id.clone(),
                    date: s.date,
                    counterparty: s.customer_name.clone(),
                    description: s.item_summary(),
                    total: s.total,
                    paid: s.paid_amount,
                    due: s.due_amount,
                    status: s.payment_status,
                },
            )
        });

    let mut entries: Vec<_> = payables.chain(receivables).collect();
    entries.sort_by(|(a_created, a), (b_created, b)| {
        a.date
            .cmp(&b.date)
            .then_with(|| a_created.cmp(b_created))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.into_iter().map(|(_, entry)| entry).collect()
}

// =============================================================================
// Refunds Owed
// =============================================================================

/// A returned sale with refund still to pay back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundOwed {
    pub sale_id: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub owe: Money,
    pub paid_back: Money,
    pub remaining: Money,
}

/// Returned sales with a positive remaining refund, oldest return first.
pub fn refunds_owed(sales: &[Sale]) -> Vec<RefundOwed> {
    let mut rows: Vec<RefundOwed> = sales
        .iter()
        .filter(|s| s.is_return && s.remaining_refund().is_positive())
        .map(|s| RefundOwed {
            sale_id: s.id.clone(),
            sale_date: s.date,
            return_date: s.return_date,
            customer_name: s.customer_name.clone(),
            customer_phone: s.customer_phone.clone(),
            owe: s.return_owe.unwrap_or_default(),
            paid_back: s.return_paid_back,
            remaining: s.remaining_refund(),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.return_date
            .cmp(&b.return_date)
            .then_with(|| a.sale_id.cmp(&b.sale_id))
    });
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;
    use crate::types::OrderLine;
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rs(r: i64) -> Money {
        Money::from_rupees(r)
    }

    fn purchase(id: &str, supplier: &str, date: &str, total: i64, paid: i64) -> Purchase {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Purchase {
            id: id.into(),
            tenant_id: "t".into(),
            date: d(date),
            supplier_name: supplier.into(),
            item: "Cotton".into(),
            qty: Quantity::from_units(1),
            unit: "m".into(),
            unit_cost: rs(total),
            total: rs(total),
            paid_amount: rs(paid),
            due_amount: rs(total - paid),
            payment_status: crate::ledger::payment_status(rs(paid), rs(total)),
            low_stock_threshold: Quantity::zero(),
            notes: None,
            image_ref: None,
            created_at: ts,
            updated_at: ts,
            version: 1,
        }
    }

    fn sale(id: &str, customer: &str, date: &str, total: i64, paid: i64, returned: bool) -> Sale {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Sale {
            id: id.into(),
            tenant_id: "t".into(),
            date: d(date),
            customer_name: customer.into(),
            customer_phone: None,
            customer_addr: None,
            items: vec![OrderLine {
                id: format!("{}-l1", id),
                sale_id: id.into(),
                line_no: 1,
                product_id: None,
                product_name: format!("Item {}", customer),
                qty: Quantity::from_units(1),
                unit: "pcs".into(),
                unit_price: rs(total),
                line_total: rs(total),
                defined_price_snapshot: Money::zero(),
            }],
            total: rs(total),
            paid_amount: rs(paid),
            due_amount: rs(total - paid),
            payment_status: crate::ledger::payment_status(rs(paid), rs(total)),
            notes: None,
            is_return: returned,
            return_date: returned.then(|| d(date)),
            return_notes: None,
            return_collected: returned.then(|| rs(paid)),
            return_owe: returned.then(|| rs(paid)),
            return_paid_back: Money::zero(),
            created_at: ts,
            updated_at: ts,
            version: 1,
        }
    }

    fn sale_payment(sale_id: &str, date: &str, amount: i64) -> Payment {
        Payment {
            id: format!("pay-{}-{}", sale_id, date),
            tenant_id: "t".into(),
            parent_type: ParentType::Sale,
            parent_id: sale_id.into(),
            amount: rs(amount),
            date: d(date),
            notes: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_summary_totals() {
        let purchases = [
            purchase("p1", "Ravi", "2026-01-02", 500, 300),
            purchase("p2", "Anil", "2026-01-03", 200, 200),
        ];
        let sales = [
            sale("s1", "Meena", "2026-01-05", 400, 100, false),
            sale("s2", "Kiran", "2026-01-06", 300, 300, true),
        ];

        let summary = summarize(&purchases, &sales);
        assert_eq!(summary.purchase_total, rs(700));
        assert_eq!(summary.purchase_paid, rs(500));
        assert_eq!(summary.purchase_due, rs(200));
        assert_eq!(summary.sales_total, rs(700));
        assert_eq!(summary.sales_collected, rs(100));
        assert_eq!(summary.sales_due, rs(300));
        assert_eq!(summary.refunds_outstanding, rs(300));
        assert_eq!(summary.profit, rs(-400));
        assert_eq!(summary.returned_count, 1);
        assert_eq!(summary.top_supplier.unwrap().name, "Ravi");
        assert_eq!(summary.top_customer.unwrap().name, "Meena");
        assert_eq!(summary.top_product.unwrap().name, "Item Meena");
    }

    #[test]
    fn test_top_ties_break_by_name() {
        let purchases = [
            purchase("p1", "Zed", "2026-01-02", 100, 0),
            purchase("p2", "Abe", "2026-01-02", 100, 0),
        ];
        let top = summarize(&purchases, &[]).top_supplier.unwrap();
        assert_eq!(top.name, "Abe");
        assert!(summarize(&[], &[]).top_customer.is_none());
    }

    #[test]
    fn test_monthly_zero_fills_and_excludes_returns() {
        let purchases = [
            purchase("p1", "Ravi", "2026-01-10", 500, 0),
            purchase("p2", "Ravi", "2026-04-01", 100, 0),
        ];
        let sales = [
            sale("s1", "Meena", "2026-01-05", 400, 400, false),
            sale("s2", "Kiran", "2026-02-06", 300, 300, true),
        ];
        let payments = [
            sale_payment("s1", "2026-01-05", 150),
            sale_payment("s1", "2026-03-20", 250),
            sale_payment("s2", "2026-02-06", 300),
        ];

        let rows = monthly(&purchases, &sales, &payments);
        let months: Vec<_> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2026-01", "2026-02", "2026-03", "2026-04"]);
        assert_eq!(rows[0].profit, rs(-350));
        assert_eq!(rows[1].collected, Money::zero());
        assert_eq!(rows[2].collected, rs(250));
        assert_eq!(rows[3].purchases, rs(100));
    }

    #[test]
    fn test_monthly_crosses_year_boundary() {
        let purchases = [
            purchase("p1", "Ravi", "2025-12-10", 1, 0),
            purchase("p2", "Ravi", "2026-01-01", 1, 0),
        ];
        let rows = monthly(&purchases, &[], &[]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].month, "2026-01");
        assert!(monthly(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_dues_oldest_first_and_skip_settled() {
        let purchases = [
            purchase("p1", "Ravi", "2026-02-01", 500, 100),
            purchase("p2", "Anil", "2026-01-01", 200, 200),
        ];
        let sales = [
            sale("s1", "Meena", "2026-01-15", 400, 0, false),
            sale("s2", "Kiran", "2026-01-01", 300, 0, true),
        ];

        let entries = dues(&purchases, &sales);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "s1");
        assert_eq!(entries[0].kind, DueKind::Receivable);
        assert_eq!(entries[1].id, "p1");
        assert_eq!(entries[1].due, rs(400));
    }

    #[test]
    fn test_refunds_owed() {
        let mut settled = sale("s1", "Meena", "2026-01-15", 400, 400, true);
        settled.return_paid_back = rs(400);
        let open = sale("s2", "Kiran", "2026-01-01", 300, 300, true);

        let rows = refunds_owed(&[settled, open]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sale_id, "s2");
        assert_eq!(rows[0].remaining, rs(300));
    }
}
