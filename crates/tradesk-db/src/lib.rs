//! # tradesk-db: Database Layer for TradDesk
//!
//! Persists the ledger in SQLite through sqlx and owns every transaction
//! boundary. The bookkeeping rules themselves live in `tradesk-core`; this
//! crate loads current rows, applies those rules and writes the result back
//! atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TradDesk Data Flow                               │
//! │                                                                         │
//! │  HTTP handler / seed binary                                            │
//! │       │  (authenticated TenantId)                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tradesk-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ PurchaseRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo    │    │ 001_initial_ │  │   │
//! │  │   │ DbConfig      │    │ SaleRepo       │    │  schema.sql  │  │   │
//! │  │   │               │    │ PaymentRepo    │    │              │  │   │
//! │  │   │               │    │ ReportRepo     │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                              │                                  │   │
//! │  │                              ▼                                  │   │
//! │  │                   tradesk-core (pure rules)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (TRADESK_DB_PATH)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tradesk_db::{Database, DbConfig};
//! use tradesk_core::TenantId;
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let tenant = TenantId::new(tradesk_core::DEFAULT_TENANT_ID);
//!
//! let receipt = db.sales().create_order(&tenant, order).await?;
//! for warning in &receipt.warnings {
//!     // below defined price, oversold stock, ...
//! }
//! let dues = db.reports().dues(&tenant).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::payment::{PaymentParent, PaymentReceipt, PaymentRepository};
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::{OrderReceipt, RefundReceipt, SaleRepository};
