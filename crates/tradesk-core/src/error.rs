//! # Error Types
//!
//! Domain-specific error types for tradesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tradesk-core errors (this file)                                       │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tradesk-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → HTTP layer → Dashboard  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is a user-input problem: it is rejected before any write
//! and is never retried automatically.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown purchase, product or sale id (within the caller's tenant).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Payment larger than the current due.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale total ₹500, paid ₹500
    ///      │
    ///      ▼
    /// apply_payment(₹1)
    ///      │
    ///      ▼
    /// Overpayment { due: ₹0.00, attempted: ₹0.01 }
    ///      │
    ///      ▼
    /// UI shows: "Payment ₹0.01 exceeds amount due ₹0.00"
    /// ```
    ///
    /// Rejected rather than clamped so the operator notices the typo instead
    /// of silently losing the excess.
    #[error("Payment {attempted} exceeds amount due {due}")]
    Overpayment { due: Money, attempted: Money },

    /// The sale was already returned; returns are one-way.
    #[error("Sale {sale_id} has already been returned")]
    AlreadyReturned { sale_id: String },

    /// A refund payback was recorded against a sale that was never returned.
    #[error("Sale {sale_id} has not been returned")]
    SaleNotReturned { sale_id: String },

    /// Refund payback larger than what is still owed to the customer.
    #[error("Refund {attempted} exceeds remaining refund {remaining}")]
    OverRefund { remaining: Money, attempted: Money },
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each message names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: String, max: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A field conflicts with another field of the same request.
    #[error("{field} is invalid: {reason}")]
    Inconsistent { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive { field: field.into() }
    }

    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::Negative { field: field.into() }
    }

    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Inconsistent { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::Overpayment {
            due: Money::zero(),
            attempted: Money::from_paise(100),
        };
        assert_eq!(err.to_string(), "Payment ₹1.00 exceeds amount due ₹0.00");

        let err = CoreError::not_found("Sale", "abc");
        assert_eq!(err.to_string(), "Sale not found: abc");

        let err = CoreError::OverRefund {
            remaining: Money::from_paise(2500),
            attempted: Money::from_paise(3000),
        };
        assert_eq!(err.to_string(), "Refund ₹30.00 exceeds remaining refund ₹25.00");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("customer_name");
        assert_eq!(err.to_string(), "customer_name is required");
        assert_eq!(err.field(), "customer_name");

        let err = ValidationError::must_be_positive("qty");
        assert_eq!(err.to_string(), "qty must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("supplier_name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
