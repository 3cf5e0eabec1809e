//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (ledger rule)          SQLite Error (sqlx::Error)           │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer ← code() + Display, is_user_error() picks 4xx vs 5xx       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tradesk_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A ledger rule rejected the operation; nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database (or not visible to the tenant).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A concurrent writer got there first.
    ///
    /// ## When This Occurs
    /// - A version-checked update matched no row
    /// - SQLite reported the database or a table as busy/locked
    ///
    /// The transaction was rolled back; the caller may re-read and retry.
    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key or CHECK constraint violation.
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Invalid configuration value (usually from the environment).
    #[error("Invalid configuration {key}: '{value}'")]
    InvalidConfig { key: String, value: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error for a given entity type and ID.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Domain(core) => match core {
                CoreError::Validation(_) => "VALIDATION_ERROR",
                CoreError::NotFound { .. } => "NOT_FOUND",
                CoreError::Overpayment { .. } => "OVERPAYMENT",
                CoreError::AlreadyReturned { .. } => "ALREADY_RETURNED",
                CoreError::SaleNotReturned { .. } => "SALE_NOT_RETURNED",
                CoreError::OverRefund { .. } => "OVER_REFUND",
            },
            DbError::NotFound { .. } => "NOT_FOUND",
            DbError::Conflict { .. } => "CONFLICT",
            DbError::UniqueViolation { .. } => "DUPLICATE",
            DbError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            DbError::InvalidConfig { .. } => "INVALID_CONFIG",
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => "DATABASE_ERROR",
        }
    }

    /// `true` for problems with the request, `false` for infrastructure faults.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DbError::Domain(_)
                | DbError::NotFound { .. }
                | DbError::Conflict { .. }
                | DbError::UniqueViolation { .. }
        )
    }
}

/// SQLite primary codes 5 (BUSY) and 6 (LOCKED) and their extended forms.
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → busy/locked → Conflict, constraints by message
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if db_err.code().as_deref().map_or(false, is_busy_code)
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Conflict {
                        entity: "database".to_string(),
                        id: "busy".to_string(),
                    }
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed")
                    || msg.contains("CHECK constraint failed")
                {
                    DbError::ConstraintViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<tradesk_core::ValidationError> for DbError {
    fn from(err: tradesk_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tradesk_core::{Money, ValidationError};

    #[test]
    fn test_codes() {
        let err: DbError = CoreError::Overpayment {
            due: Money::zero(),
            attempted: Money::from_paise(1),
        }
        .into();
        assert_eq!(err.code(), "OVERPAYMENT");
        assert!(err.is_user_error());

        let err: DbError = ValidationError::required("item").into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Validation error: item is required");

        assert_eq!(DbError::conflict("Sale", "s1").code(), "CONFLICT");
        assert_eq!(DbError::PoolExhausted.code(), "DATABASE_ERROR");
        assert!(!DbError::PoolExhausted.is_user_error());
    }

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code("5"));
        assert!(is_busy_code("517"));
        assert!(is_busy_code("6"));
        assert!(!is_busy_code("19"));
        assert!(!is_busy_code("not-a-code"));
    }
}
