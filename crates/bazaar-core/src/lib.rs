//! # bazaar-core: Pure Business Logic for the Bazaar Transaction Core
//!
//! This crate is the **heart** of the marketplace transaction core. It
//! contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Bazaar Architecture                          │
//! │                                                                    │
//! │  ┌──────────────────────────────────────────────────────────────┐  │
//! │  │            HTTP / API layer (outside this repo)              │  │
//! │  │      auth, request parsing, catalog CRUD, responses          │  │
//! │  └──────────────────────────────┬───────────────────────────────┘  │
//! │                                 │                                  │
//! │  ┌──────────────────────────────▼───────────────────────────────┐  │
//! │  │                bazaar-db (persistence layer)                 │  │
//! │  │   SQLite repositories, stock reservation, snapshot upsert,   │  │
//! │  │   checkout orchestration in one database transaction         │  │
//! │  └──────────────────────────────┬───────────────────────────────┘  │
//! │                                 │                                  │
//! │  ┌──────────────────────────────▼───────────────────────────────┐  │
//! │  │               ★ bazaar-core (THIS CRATE) ★                   │  │
//! │  │                                                              │  │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────┐     │  │
//! │  │   │  types   │ │  money   │ │ discount │ │ validation │     │  │
//! │  │   │  Item    │ │  Money   │ │ matcher  │ │   rules    │     │  │
//! │  │   │  Discount│ │ quantize │ │ stacking │ │   checks   │     │  │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └────────────┘     │  │
//! │  │                                                              │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Discount, Transaction, ...)
//! - [`money`] - Decimal money with ceiling quantization
//! - [`discount`] - Discount matching and multiplicative stacking
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: exact decimal arithmetic, rounding only at the
//!    defined quantization points
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single checkout request.
///
/// Prevents runaway requests and keeps the unit of work bounded.
pub const MAX_CHECKOUT_LINES: usize = 100;

/// Maximum quantity of a single item per line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
