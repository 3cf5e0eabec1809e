//! # tradesk-core: Pure Ledger Logic for TradDesk
//!
//! This crate holds the bookkeeping rules of TradDesk as pure functions with
//! zero I/O dependencies: how purchases, orders, payments and returns turn
//! into running totals, stock levels and dues.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TradDesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Dashboard (presentation, HTTP, auth)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ TenantId + requests                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               tradesk-db (repositories, SQLite)                 │   │
//! │  │   purchases() products() sales() payments() reports()           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tradesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌────────┐ ┌──────────┐ ┌────────┐ ┌───────────┐ ┌────────┐   │   │
//! │  │  │ money  │ │ quantity │ │ ledger │ │ inventory │ │ order  │   │   │
//! │  │  └────────┘ └──────────┘ └────────┘ └───────────┘ └────────┘   │   │
//! │  │  ┌────────┐ ┌──────────┐ ┌────────┐                            │   │
//! │  │  │ types  │ │validation│ │ report │                            │   │
//! │  │  └────────┘ └──────────┘ └────────┘                            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer paise
//! - [`quantity`] - Quantities in thousandths of a unit
//! - [`types`] - Domain records (Purchase, Product, Sale, Payment, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validators
//! - [`ledger`] - Balances, payment status and payment acceptance
//! - [`inventory`] - Raw-material and finished-goods stock math
//! - [`order`] - Order pricing, returns and refund paybacks
//! - [`report`] - Summary, monthly, dues and refund projections
//!
//! ## Example Usage
//!
//! ```rust
//! use tradesk_core::ledger::Balance;
//! use tradesk_core::{Money, PaymentStatus, Quantity};
//!
//! // 10 units at ₹50
//! let total = Money::from_rupees(50)
//!     .checked_multiply_quantity(Quantity::from_units(10))
//!     .unwrap();
//! let balance = Balance::new(total, Money::zero())
//!     .accept_payment(Money::from_rupees(300))
//!     .unwrap();
//!
//! assert_eq!(balance.due(), Money::from_rupees(200));
//! assert_eq!(balance.status(), PaymentStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod inventory;
pub mod ledger;
pub mod money;
pub mod order;
pub mod quantity;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the seeding tool and single-shop deployments.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Unit label applied when a purchase, product or line leaves it blank.
pub const DEFAULT_UNIT: &str = "units";

/// Maximum length of names (supplier, customer, item, product, unit).
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of free-text notes.
pub const MAX_NOTES_LEN: usize = 1000;

/// Maximum lines on a single order.
pub const MAX_ORDER_LINES: usize = 100;
