//! # bazaar-db: Storage & Checkout Layer for Bazaar
//!
//! This crate provides database access and the checkout orchestrator for
//! the Bazaar marketplace core. It uses SQLite for storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bazaar Data Flow                                │
//! │                                                                         │
//! │  Caller (API layer, seed tool, tests)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bazaar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ CheckoutService│   │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (checkout.rs) │    │ (item.rs etc) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ one unit of   │───►│ ItemRepo      │    │ 001_initial_ │  │   │
//! │  │   │ work per      │    │ DiscountRepo  │    │ schema.sql   │  │   │
//! │  │   │ purchase      │    │ TransactionRepo│   │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              SQLite Database (WAL, foreign keys ON)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and combined store error types
//! - [`repository`] - Repository implementations (item, discount, ...)
//! - [`checkout`] - The purchase orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{CheckoutService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/bazaar.db")).await?;
//!
//! let checkout = CheckoutService::new(db);
//! let receipt = checkout.create_transaction(buyer_id, &request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, StoreError};
pub use pool::{Database, DbConfig};

pub use checkout::{
    CheckoutLine, CheckoutReceipt, CheckoutRequest, CheckoutService, LineReceipt,
    TransactionRecord,
};

// Repository re-exports for convenience
pub use repository::delivery::DeliveryOptionRepository;
pub use repository::discount::DiscountRepository;
pub use repository::item::ItemRepository;
pub use repository::transaction::{TransactionLine, TransactionRepository};
