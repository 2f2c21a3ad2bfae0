//! # Validation Module
//!
//! Input validation for checkout requests and catalog writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                             │
//! │                                                                    │
//! │  Layer 1: API layer (outside this repo)                            │
//! │  └── Type validation (deserialization), auth                       │
//! │           │                                                        │
//! │           ▼                                                        │
//! │  Layer 2: THIS MODULE - business rule validation                   │
//! │           │                                                        │
//! │           ▼                                                        │
//! │  Layer 3: Database (SQLite)                                        │
//! │  ├── NOT NULL / CHECK (stock >= 0) constraints                     │
//! │  ├── UNIQUE constraints                                            │
//! │  └── Foreign key constraints                                       │
//! │                                                                    │
//! │  Defense in depth: multiple layers catch different errors          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CHECKOUT_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (>= 1)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price.
///
/// ## Rules
/// - Must be non-negative; zero is allowed (free items)
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount percentage.
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_percentage(pct: Decimal) -> ValidationResult<()> {
    if pct.is_sign_negative() || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a checkout request.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CHECKOUT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 0,
            max: MAX_CHECKOUT_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a discount code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
pub fn validate_discount_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "discount_code".to_string(),
        });
    }

    if code.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "discount_code".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::new(dec!(10.99))).is_ok());
        assert!(validate_price(Money::new(dec!(-0.01))).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(dec!(0)).is_ok());
        assert!(validate_percentage(dec!(10)).is_ok());
        assert!(validate_percentage(dec!(100)).is_ok());
        assert!(validate_percentage(dec!(100.1)).is_err());
        assert!(validate_percentage(dec!(-1)).is_err());
    }

    #[test]
    fn test_validate_discount_code() {
        assert!(validate_discount_code("SALE10").is_ok());
        assert!(validate_discount_code("").is_err());
        assert!(validate_discount_code("   ").is_err());
        assert!(validate_discount_code(&"A".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
