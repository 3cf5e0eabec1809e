//! # Validation Module
//!
//! Input validation run before any ledger write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard form                                               │
//! │  └── Immediate feedback only, never trusted                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by tradesk-core rules)                   │
//! │  ├── Names trimmed and required                                        │
//! │  ├── qty > 0, prices ≥ 0, payments > 0                                 │
//! │  ├── Amounts ≤ Money::MAX, quantities ≤ Quantity::MAX                  │
//! │  └── Dates parsed as YYYY-MM-DD                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::{DEFAULT_UNIT, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required name-like field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use tradesk_core::validation::validate_name;
///
/// assert_eq!(validate_name("supplier_name", "  Ravi Traders ").unwrap(), "Ravi Traders");
/// assert!(validate_name("supplier_name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Normalizes a unit label; blank means the default `units`.
pub fn normalize_unit(unit: &str) -> ValidationResult<String> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Ok(DEFAULT_UNIT.to_string());
    }
    validate_name("unit", unit)
}

/// Trims optional free text; blank becomes `None`.
pub fn normalize_optional(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(value.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn out_of_range(field: &str, min: impl ToString, max: impl ToString) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

/// Validates a line or purchase quantity (must be > 0 and ≤ `Quantity::MAX`).
pub fn validate_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    if qty > Quantity::MAX {
        return Err(out_of_range(field, Quantity::from_milli(1), Quantity::MAX));
    }
    Ok(())
}

/// Validates a price or cost (zero allowed, negative rejected).
///
/// ## Example
/// ```rust
/// use tradesk_core::money::Money;
/// use tradesk_core::validation::validate_price;
///
/// assert!(validate_price("unit_price", Money::from_paise(1099)).is_ok());
/// assert!(validate_price("unit_price", Money::zero()).is_ok());
/// assert!(validate_price("unit_price", Money::from_paise(-1)).is_err());
/// assert!(validate_price("unit_price", Money::from_paise(i64::MAX)).is_err());
/// ```
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::negative(field));
    }
    if amount > Money::MAX {
        return Err(out_of_range(field, Money::zero(), Money::MAX));
    }
    Ok(())
}

/// Validates a payment or refund amount (must be > 0 and ≤ `Money::MAX`).
pub fn validate_payment_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    if amount > Money::MAX {
        return Err(out_of_range(field, Money::from_paise(1), Money::MAX));
    }
    Ok(())
}

/// Validates a computed total, where `None` means the arithmetic overflowed.
///
/// Returns the total so callers can chain it straight into the record.
pub fn validate_total(field: &str, total: Option<Money>) -> ValidationResult<Money> {
    match total {
        Some(total) if total >= Money::zero() && total <= Money::MAX => Ok(total),
        _ => Err(out_of_range(field, Money::zero(), Money::MAX)),
    }
}

/// Validates the number of lines on an order.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("lines"));
    }
    if count > MAX_ORDER_LINES {
        return Err(out_of_range("lines", 1, MAX_ORDER_LINES));
    }
    Ok(())
}

// =============================================================================
// Date / Identifier Validators
// =============================================================================

/// Parses a business date in `YYYY-MM-DD` form.
///
/// ## Example
/// ```rust
/// use tradesk_core::validation::parse_date;
///
/// assert!(parse_date("2026-03-31").is_ok());
/// assert!(parse_date("2026-02-30").is_err());
/// assert!(parse_date("31/03/2026").is_err());
/// ```
pub fn parse_date(value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: "must be a calendar date as YYYY-MM-DD".to_string(),
        }
    })
}

/// Validates a UUID string id.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
