//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                        │
//! │                                                                    │
//! │  In f64 arithmetic:                                                │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                      │
//! │                                                                    │
//! │  Stacked percentage discounts multiply prices repeatedly, and      │
//! │  catalog prices may carry more than two decimal places. We keep    │
//! │  exact decimal precision through the whole computation and round   │
//! │  ONLY at the defined quantization points:                          │
//! │                                                                    │
//! │    • each line's post-discount unit price                          │
//! │    • the final transaction total                                   │
//! │                                                                    │
//! │  Quantization is CEILING rounding to 2 decimal places: any         │
//! │  non-zero remainder beyond 2 decimals rounds up, so the payee      │
//! │  never receives less than the computed value.                      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//!
//! let price: Money = "10.001".parse().unwrap();
//! assert_eq!(price.quantize(), "10.01".parse().unwrap());
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimal places monetary values are quantized to.
const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount with exact decimal precision.
///
/// ## Design Decisions
/// - **`rust_decimal::Decimal` inside**: exact arithmetic, no binary
///   floating point anywhere in the pricing path
/// - **Single field tuple struct**: zero-cost abstraction over `Decimal`
/// - **Unquantized by default**: intermediate values keep full precision;
///   callers invoke [`Money::quantize`] at the points the pricing rules
///   define
///
/// Every monetary value in the system (catalog prices, delivery prices,
/// line prices, totals) flows through this type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from a raw decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the inner decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds to 2 decimal places using ceiling semantics (round toward
    /// positive infinity at the third decimal digit).
    ///
    /// Any non-zero remainder beyond two decimals rounds UP. This biases
    /// consistently in the payee's favor: sellers and carriers never
    /// receive less than the computed value because of rounding.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let a: Money = "12.991".parse().unwrap();
    /// assert_eq!(a.quantize(), "13.00".parse().unwrap());
    ///
    /// let b: Money = "12.985".parse().unwrap();
    /// assert_eq!(b.quantize(), "12.99".parse().unwrap());
    /// ```
    #[must_use]
    pub fn quantize(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToPositiveInfinity),
        )
    }

    /// Applies a percentage discount, returning the reduced amount.
    ///
    /// `percentage` is expressed on a 0–100 scale: a 10% discount turns
    /// 45.00 into 40.50. The result is NOT quantized; stacked discounts
    /// multiply through at full precision and the caller quantizes once
    /// at the end.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let price: Money = "45".parse().unwrap();
    /// let once = price.apply_percentage(Decimal::from(10));
    /// let twice = once.apply_percentage(Decimal::from(10));
    /// assert_eq!(twice.quantize(), "36.45".parse().unwrap());
    /// ```
    #[must_use]
    pub fn apply_percentage(&self, percentage: Decimal) -> Money {
        Money(self.0 * (Decimal::ONE - percentage / Decimal::ONE_HUNDRED))
    }

    /// Multiplies the amount by a line quantity.
    #[must_use]
    pub fn multiply_quantity(&self, qty: i64) -> Money {
        Money(self.0 * Decimal::from(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the raw decimal amount; currency formatting belongs to
/// the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Money(Decimal::from_str(s)?))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

// =============================================================================
// sqlx Integration (feature-gated)
// =============================================================================
// SQLite has no native decimal type; Money is stored as TEXT so values
// round-trip exactly. Integer and float affinity would both lose digits.

#[cfg(feature = "sqlx")]
mod sqlx_impl {
    use std::borrow::Cow;
    use std::str::FromStr;

    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};

    use super::Money;

    impl sqlx::Type<Sqlite> for Money {
        fn type_info() -> SqliteTypeInfo {
            <&str as sqlx::Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <&str as sqlx::Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> sqlx::Encode<'q, Sqlite> for Money {
        fn encode_by_ref(
            &self,
            args: &mut Vec<SqliteArgumentValue<'q>>,
        ) -> Result<IsNull, BoxDynError> {
            args.push(SqliteArgumentValue::Text(Cow::Owned(self.0.to_string())));
            Ok(IsNull::No)
        }
    }

    impl<'r> sqlx::Decode<'r, Sqlite> for Money {
        fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
            let text = <&str as sqlx::Decode<Sqlite>>::decode(value)?;
            Ok(Money(rust_decimal::Decimal::from_str(text)?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantize_ceiling_rounds_up() {
        assert_eq!(Money::new(dec!(12.991)).quantize(), Money::new(dec!(13.00)));
        assert_eq!(Money::new(dec!(10.001)).quantize(), Money::new(dec!(10.01)));
        assert_eq!(Money::new(dec!(12.985)).quantize(), Money::new(dec!(12.99)));
    }

    #[test]
    fn test_quantize_exact_values_unchanged() {
        assert_eq!(Money::new(dec!(36.45)).quantize(), Money::new(dec!(36.45)));
        assert_eq!(Money::new(dec!(10)).quantize(), Money::new(dec!(10.00)));
        assert_eq!(Money::zero().quantize(), Money::zero());
    }

    #[test]
    fn test_stacked_percentages() {
        // 45 * 0.9 * 0.9 = 36.45 exactly; quantize must not move it
        let price = Money::new(dec!(45));
        let discounted = price
            .apply_percentage(dec!(10))
            .apply_percentage(dec!(10));
        assert_eq!(discounted.quantize(), Money::new(dec!(36.45)));
    }

    #[test]
    fn test_apply_percentage_keeps_precision() {
        // 10.00 at 3% = 9.7, at 7% more = 9.021; only quantize rounds
        let price = Money::new(dec!(10));
        let discounted = price.apply_percentage(dec!(3)).apply_percentage(dec!(7));
        assert_eq!(discounted.amount(), dec!(9.021));
        assert_eq!(discounted.quantize(), Money::new(dec!(9.03)));
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(dec!(10.50));
        let b = Money::new(dec!(0.25));
        assert_eq!(a + b, Money::new(dec!(10.75)));
        assert_eq!(a - b, Money::new(dec!(10.25)));
        assert_eq!(a * 3, Money::new(dec!(31.50)));

        let mut acc = Money::zero();
        acc += a;
        acc += b;
        assert_eq!(acc, Money::new(dec!(10.75)));
    }

    #[test]
    fn test_parse_and_display() {
        let m: Money = "19.99".parse().unwrap();
        assert_eq!(m, Money::new(dec!(19.99)));
        assert_eq!(m.to_string(), "19.99");
        assert!("not-a-price".parse::<Money>().is_err());
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_negative());
        assert!(Money::new(dec!(-0.01)).is_negative());
        assert!(!Money::new(dec!(0.01)).is_negative());
    }
}
