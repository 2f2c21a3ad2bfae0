//! # Discount Repository
//!
//! Database operations for discount codes and their applicability scope.
//!
//! The validity window is enforced HERE, at the fetch boundary: an expired
//! or not-yet-started code is treated exactly like a code that does not
//! exist, so the matcher and the stacking logic never see it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::{DbError, DbResult, StoreResult};
use bazaar_core::validation::{validate_discount_code, validate_percentage};
use bazaar_core::{CoreError, Discount};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw discounts row. `percentage` is stored as TEXT to keep its exact
/// decimal value, so it arrives as a string and is parsed on the way out.
#[derive(sqlx::FromRow)]
struct DiscountRow {
    code: String,
    percentage: String,
    item_ids: Option<Json<Vec<String>>>,
    brands: Option<Json<Vec<String>>>,
    categories: Option<Json<HashMap<String, Vec<String>>>>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = DbError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let percentage = Decimal::from_str(&row.percentage)
            .map_err(|e| DbError::Internal(format!("bad percentage for {}: {e}", row.code)))?;

        Ok(Discount {
            code: row.code,
            percentage,
            item_ids: row.item_ids.map(|j| j.0).unwrap_or_default(),
            brands: row.brands.map(|j| j.0).unwrap_or_default(),
            categories: row.categories.map(|j| j.0).unwrap_or_default(),
            valid_from: row.valid_from,
            valid_until: row.valid_until,
        })
    }
}

const SELECT_ACTIVE: &str = r#"
    SELECT code, percentage, item_ids, brands, categories,
           valid_from, valid_until
    FROM discounts
    WHERE code = ?1
      AND (valid_from IS NULL OR valid_from <= ?2)
      AND (valid_until IS NULL OR valid_until >= ?2)
"#;

// =============================================================================
// Unit-of-Work Operations
// =============================================================================

/// Resolves the supplied codes to active discounts, preserving input order.
///
/// Input order matters: stacked percentages multiply in the order the
/// buyer supplied the codes. Any code that is missing OR outside its
/// validity window fails the whole resolution with `DiscountNotFound`.
/// An empty input resolves to an empty list.
pub async fn resolve_codes(
    conn: &mut SqliteConnection,
    codes: &[String],
) -> StoreResult<Vec<Discount>> {
    let now = Utc::now();
    let mut discounts = Vec::with_capacity(codes.len());

    for code in codes {
        debug!(code = %code, "Resolving discount code");

        let row = sqlx::query_as::<_, DiscountRow>(SELECT_ACTIVE)
            .bind(code)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::DiscountNotFound(code.clone()))?;

        discounts.push(Discount::try_from(row)?);
    }

    Ok(discounts)
}

// =============================================================================
// Discount Repository
// =============================================================================

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Inserts a new discount. The code must be non-empty and the
    /// percentage within 0-100.
    pub async fn insert(&self, discount: &Discount) -> StoreResult<()> {
        validate_discount_code(&discount.code)?;
        validate_percentage(discount.percentage)?;

        debug!(code = %discount.code, percentage = %discount.percentage, "Inserting discount");

        sqlx::query(
            r#"
            INSERT INTO discounts (
                code, percentage, item_ids, brands, categories,
                valid_from, valid_until, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&discount.code)
        .bind(discount.percentage.to_string())
        .bind(Json(&discount.item_ids))
        .bind(Json(&discount.brands))
        .bind(Json(&discount.categories))
        .bind(discount.valid_from)
        .bind(discount.valid_until)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a discount by code, ignoring the validity window. Catalog
    /// reads see expired codes; only checkout filters them out.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let row = sqlx::query_as::<_, DiscountRow>(
            r#"
            SELECT code, percentage, item_ids, brands, categories,
                   valid_from, valid_until
            FROM discounts
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Discount::try_from).transpose()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn discount(code: &str) -> Discount {
        Discount {
            code: code.to_string(),
            percentage: dec!(10),
            ..Discount::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = test_db().await;
        let mut d = discount("SALE10");
        d.brands = vec!["Acme".to_string()];
        d.categories
            .insert("shoes".to_string(), vec!["boots".to_string()]);
        db.discounts().insert(&d).await.unwrap();

        let loaded = db.discounts().get_by_code("SALE10").await.unwrap().unwrap();
        assert_eq!(loaded.percentage, dec!(10));
        assert_eq!(loaded.brands, vec!["Acme".to_string()]);
        assert_eq!(
            loaded.categories.get("shoes"),
            Some(&vec!["boots".to_string()])
        );
        assert!(loaded.item_ids.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_discount() {
        let db = test_db().await;

        // Percentage above 100.
        let mut d = discount("TOOBIG");
        d.percentage = dec!(150);
        let err = db.discounts().insert(&d).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        // Empty code.
        let err = db.discounts().insert(&discount("")).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resolve_preserves_input_order() {
        let db = test_db().await;
        db.discounts().insert(&discount("A")).await.unwrap();
        db.discounts().insert(&discount("B")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let resolved = resolve_codes(&mut conn, &["B".to_string(), "A".to_string()])
            .await
            .unwrap();

        let codes: Vec<&str> = resolved.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_fails() {
        let db = test_db().await;
        db.discounts().insert(&discount("A")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = resolve_codes(&mut conn, &["A".to_string(), "NOPE".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Domain(CoreError::DiscountNotFound(ref c)) if c == "NOPE"
        ));
    }

    #[tokio::test]
    async fn test_resolve_empty_input_is_empty() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let resolved = resolve_codes(&mut conn, &[]).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_expired_code_resolves_like_missing() {
        let db = test_db().await;
        let mut d = discount("EXPIRED");
        d.valid_until = Some(Utc::now() - Duration::days(1));
        db.discounts().insert(&d).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = resolve_codes(&mut conn, &["EXPIRED".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::DiscountNotFound(_))
        ));
        drop(conn);

        // Catalog read still sees it.
        assert!(db.discounts().get_by_code("EXPIRED").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_future_code_resolves_like_missing() {
        let db = test_db().await;
        let mut d = discount("SOON");
        d.valid_from = Some(Utc::now() + Duration::days(1));
        db.discounts().insert(&d).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = resolve_codes(&mut conn, &["SOON".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::DiscountNotFound(_))
        ));
    }
}
