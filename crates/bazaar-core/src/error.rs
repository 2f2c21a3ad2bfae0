//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                │
//! │                                                                    │
//! │  bazaar-core errors (this file)                                    │
//! │  ├── CoreError        - Domain rule violations                     │
//! │  └── ValidationError  - Input validation failures                  │
//! │                                                                    │
//! │  bazaar-db errors (separate crate)                                 │
//! │  ├── DbError          - Database operation failures                │
//! │  └── StoreError       - CoreError ∪ DbError (caller-facing)        │
//! │                                                                    │
//! │  Flow: ValidationError → CoreError → StoreError → API layer        │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every variant carries the offending identifiers, so a caller can
//!    correct the request (reduce quantity, drop a code, ...)
//! 3. Errors are enum variants callers can pattern-match, never strings
//! 4. Nothing is retried internally; the whole operation aborts and the
//!    first error surfaces

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised synchronously during transaction creation and
/// finalization.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested item id does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Available stock cannot cover the requested quantity. The caller
    /// must reduce the quantity or pick another item.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: i64,
        available: i64,
    },

    /// The discount code does not resolve to an active discount (unknown,
    /// or outside its validity window).
    #[error("Active discount with code {0} not found")]
    DiscountNotFound(String),

    /// The delivery option id does not exist.
    #[error("Delivery option not found: {0}")]
    DeliveryOptionNotFound(String),

    /// No transaction with this id belongs to this buyer.
    #[error("Transaction {transaction_id} of buyer {buyer_id} not found")]
    TransactionNotFound {
        transaction_id: String,
        buyer_id: String,
    },

    /// The transaction was already finalized; the open → finalized
    /// transition happens exactly once.
    #[error("Transaction {0} is already finalized")]
    TransactionAlreadyFinalized(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
        let err = CoreError::InsufficientStock {
            item_id: "item-1".to_string(),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for item item-1: requested 5, available 3"
        );

        let err = CoreError::DiscountNotFound("SALE10".to_string());
        assert_eq!(err.to_string(), "Active discount with code SALE10 not found");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
