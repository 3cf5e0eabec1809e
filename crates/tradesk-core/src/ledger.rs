//! # Ledger Rules
//!
//! Balance arithmetic shared by purchases (payables) and sales (receivables).
//!
//! ## Balance Lifecycle
//! ```text
//! total = qty × unit_cost          (purchase)
//! total = Σ line qty × unit_price  (sale)
//!
//!   paid = 0          paid < total          paid = total
//!  ┌─────────┐  pay   ┌─────────┐   pay    ┌─────────┐
//!  │ unpaid  │ ─────► │ partial │ ───────► │  paid   │
//!  └─────────┘        └─────────┘          └─────────┘
//!       │                                       ▲
//!       └──────────────── pay full ─────────────┘
//!
//! due = total − paid   (never stored independently of paid)
//! pay(amount) with amount > due  →  Overpayment, nothing written
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{ParentType, PaymentStatus, Sale};
use crate::validation::{
    normalize_optional, normalize_unit, validate_id, validate_name, validate_payment_amount,
    validate_price, validate_quantity, validate_total,
};

// =============================================================================
// Payment Status
// =============================================================================

/// Derives the payment status from paid vs total.
///
/// A zero-total record with nothing paid is `unpaid`.
pub fn payment_status(paid: Money, total: Money) -> PaymentStatus {
    if !paid.is_positive() {
        PaymentStatus::Unpaid
    } else if paid >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    }
}

// =============================================================================
// Balance
// =============================================================================

/// Total and paid amount of a purchase or sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    total: Money,
    paid: Money,
}

impl Balance {
    pub fn new(total: Money, paid: Money) -> Self {
        Balance { total, paid }
    }

    /// Rebuilds a balance from the full payment history of its parent.
    pub fn from_payments<I>(total: Money, payments: I) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        Balance {
            total,
            paid: payments.into_iter().sum(),
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.total
    }

    #[inline]
    pub fn paid(&self) -> Money {
        self.paid
    }

    #[inline]
    pub fn due(&self) -> Money {
        self.total - self.paid
    }

    #[inline]
    pub fn status(&self) -> PaymentStatus {
        payment_status(self.paid, self.total)
    }

    /// Returns the balance after a payment of `amount`.
    ///
    /// ## Errors
    /// - `Validation` if `amount` is not strictly positive
    /// - `Overpayment` if `amount` exceeds the current due
    pub fn accept_payment(&self, amount: Money) -> CoreResult<Balance> {
        validate_payment_amount("amount", amount)?;

        let due = self.due();
        if amount > due {
            return Err(CoreError::Overpayment {
                due,
                attempted: amount,
            });
        }

        Ok(Balance {
            total: self.total,
            paid: self.paid + amount,
        })
    }
}

/// A returned sale is closed to further customer payments.
pub fn ensure_sale_accepts_payments(sale: &Sale) -> CoreResult<()> {
    if sale.is_return {
        return Err(CoreError::AlreadyReturned {
            sale_id: sale.id.clone(),
        });
    }
    Ok(())
}

/// Validates an up-front amount paid at creation time against the new total.
pub(crate) fn validate_paid_now(paid_now: Money, total: Money) -> CoreResult<()> {
    validate_price("paid_now", paid_now)?;
    if paid_now > total {
        return Err(CoreError::Overpayment {
            due: total,
            attempted: paid_now,
        });
    }
    Ok(())
}

// =============================================================================
// Purchase Entry
// =============================================================================

/// A raw-material purchase as entered by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub supplier_name: String,
    pub item: String,
    pub qty: Quantity,
    #[serde(default)]
    pub unit: String,
    pub unit_cost: Money,
    /// Recorded as the purchase's first payment when positive.
    #[serde(default)]
    pub paid_now: Money,
    #[serde(default)]
    pub low_stock_threshold: Quantity,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// A validated purchase ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDraft {
    pub date: NaiveDate,
    pub supplier_name: String,
    pub item: String,
    pub qty: Quantity,
    pub unit: String,
    pub unit_cost: Money,
    pub total: Money,
    pub paid_now: Money,
    pub low_stock_threshold: Quantity,
    pub notes: Option<String>,
    pub image_ref: Option<String>,
}

impl PurchaseDraft {
    pub fn balance(&self) -> Balance {
        Balance::new(self.total, self.paid_now)
    }
}

impl NewPurchase {
    /// Normalizes the entry and computes `total = qty × unit_cost`.
    pub fn validate(self) -> CoreResult<PurchaseDraft> {
        let supplier_name = validate_name("supplier_name", &self.supplier_name)?;
        let item = validate_name("item", &self.item)?;
        validate_quantity("qty", self.qty)?;
        let unit = normalize_unit(&self.unit)?;
        validate_price("unit_cost", self.unit_cost)?;

        if self.low_stock_threshold.is_negative() {
            return Err(ValidationError::negative("low_stock_threshold").into());
        }

        let total = validate_total("total", self.unit_cost.checked_multiply_quantity(self.qty))?;
        validate_paid_now(self.paid_now, total)?;

        Ok(PurchaseDraft {
            date: self.date,
            supplier_name,
            item,
            qty: self.qty,
            unit,
            unit_cost: self.unit_cost,
            total,
            paid_now: self.paid_now,
            low_stock_threshold: self.low_stock_threshold,
            notes: normalize_optional("notes", self.notes.as_deref())?,
            image_ref: normalize_optional("image_ref", self.image_ref.as_deref())?,
        })
    }
}

// =============================================================================
// Payment Request
// =============================================================================

/// A payment against a purchase or a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub parent_type: ParentType,
    pub parent_id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentRequest {
    /// Checks the request shape; the due check needs the parent and happens
    /// in [`Balance::accept_payment`].
    pub fn validate(self) -> CoreResult<PaymentRequest> {
        let parent_id = self.parent_id.trim().to_string();
        validate_id("parent_id", &parent_id)?;
        validate_payment_amount("amount", self.amount)?;

        Ok(PaymentRequest {
            parent_id,
            notes: normalize_optional("notes", self.notes.as_deref())?,
            ..self
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rupees(r: i64) -> Money {
        Money::from_rupees(r)
    }

    fn purchase(qty: i64, unit_cost: i64) -> NewPurchase {
        NewPurchase {
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            supplier_name: " Ravi Traders ".into(),
            item: "Sugar".into(),
            qty: Quantity::from_units(qty),
            unit: String::new(),
            unit_cost: rupees(unit_cost),
            paid_now: Money::zero(),
            low_stock_threshold: Quantity::zero(),
            notes: None,
            image_ref: None,
        }
    }

    #[test]
    fn test_purchase_total_beyond_bounds_is_rejected() {
        let mut entry = purchase(1000, 0);
        entry.unit_cost = Money::from_paise(i64::MAX / 10);
        let err = entry.validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "unit_cost"
        ));

        // each factor in range, the product is not
        let mut entry = purchase(0, 0);
        entry.qty = Quantity::MAX;
        entry.unit_cost = Money::MAX;
        let err = entry.validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "total"
        ));
    }

    #[test]
    fn test_payment_status_derivation() {
        assert_eq!(payment_status(Money::zero(), rupees(100)), PaymentStatus::Unpaid);
        assert_eq!(payment_status(rupees(40), rupees(100)), PaymentStatus::Partial);
        assert_eq!(payment_status(rupees(100), rupees(100)), PaymentStatus::Paid);
        // zero total, nothing paid
        assert_eq!(payment_status(Money::zero(), Money::zero()), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_payment_sequence() {
        let balance = Balance::new(rupees(500), Money::zero());
        assert_eq!(balance.status(), PaymentStatus::Unpaid);

        let balance = balance.accept_payment(rupees(300)).unwrap();
        assert_eq!(balance.due(), rupees(200));
        assert_eq!(balance.status(), PaymentStatus::Partial);

        let balance = balance.accept_payment(rupees(200)).unwrap();
        assert_eq!(balance.due(), Money::zero());
        assert_eq!(balance.status(), PaymentStatus::Paid);

        let err = balance.accept_payment(rupees(1)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Overpayment { due, attempted } if due.is_zero() && attempted == rupees(1)
        ));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let balance = Balance::new(rupees(500), Money::zero());
        assert!(matches!(
            balance.accept_payment(Money::zero()),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            balance.accept_payment(Money::from_paise(-100)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_from_payments_sums_history() {
        let balance = Balance::from_payments(rupees(500), [rupees(100), rupees(150)]);
        assert_eq!(balance.paid(), rupees(250));
        assert_eq!(balance.due(), rupees(250));
    }

    #[test]
    fn test_purchase_validation_computes_total() {
        let draft = purchase(10, 50).validate().unwrap();
        assert_eq!(draft.total, rupees(500));
        assert_eq!(draft.supplier_name, "Ravi Traders");
        assert_eq!(draft.unit, "units");
        assert_eq!(draft.balance().status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_purchase_fractional_qty_rounds_to_paisa() {
        let mut entry = purchase(0, 0);
        entry.qty = Quantity::from_milli(2500);
        entry.unit_cost = Money::from_paise(3333);
        // 2.5 × 33.33 = 83.325 → 83.33
        assert_eq!(entry.validate().unwrap().total, Money::from_paise(8333));
    }

    #[test]
    fn test_purchase_paid_now_over_total_rejected() {
        let mut entry = purchase(10, 50);
        entry.paid_now = rupees(501);
        assert!(matches!(entry.validate(), Err(CoreError::Overpayment { .. })));
    }

    #[test]
    fn test_purchase_rejects_bad_fields() {
        let mut entry = purchase(10, 50);
        entry.qty = Quantity::zero();
        assert!(entry.validate().is_err());

        let mut entry = purchase(10, 50);
        entry.supplier_name = "  ".into();
        assert!(entry.validate().is_err());

        let mut entry = purchase(10, 50);
        entry.low_stock_threshold = Quantity::from_units(-1);
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_payment_request_validation() {
        let request = PaymentRequest {
            parent_type: ParentType::Sale,
            parent_id: " 550e8400-e29b-41d4-a716-446655440000 ".into(),
            amount: rupees(10),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            notes: Some("  ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(request.parent_id, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(request.notes, None);

        let bad_id = PaymentRequest {
            parent_id: "abc".into(),
            ..request.clone()
        };
        assert!(bad_id.validate().is_err());

        let bad = PaymentRequest {
            amount: Money::zero(),
            ..request
        };
        assert!(bad.validate().is_err());
    }
}
