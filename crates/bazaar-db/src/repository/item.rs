//! # Item Repository
//!
//! Database operations for catalog items and their immutable snapshots.
//!
//! ## Stock Reservation
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                  Guarded Stock Decrement                           │
//! │                                                                    │
//! │  ❌ WRONG: read-modify-write (oversells under concurrency)        │
//! │     stock = SELECT stock ...; UPDATE items SET stock = {stock-n}   │
//! │                                                                    │
//! │  ✅ CORRECT: conditional single-row atomic update                 │
//! │     UPDATE items SET stock = stock - n                             │
//! │     WHERE item_id = ? AND stock >= n                               │
//! │                                                                    │
//! │  The database serializes concurrent decrements on the row; a       │
//! │  caller that loses the race sees rows_affected == 0 and reports    │
//! │  InsufficientStock with the post-race availability.                │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Upsert
//! The first purchase of an item version must freeze a snapshot exactly
//! once, even when two buyers hit the same version concurrently. A
//! check-then-insert would race; `INSERT ... ON CONFLICT DO NOTHING` on
//! the `(item_id, updated_at)` primary key makes the duplicate writer a
//! no-op instead of an error.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbResult, StoreError, StoreResult};
use bazaar_core::validation::{validate_price, validate_uuid};
use bazaar_core::{CoreError, Item, ItemSnapshot, Money};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw items row; JSON-typed columns are decoded through `sqlx::types::Json`.
#[derive(sqlx::FromRow)]
struct ItemRow {
    item_id: String,
    name: String,
    category: String,
    subcategories: Option<Json<Vec<String>>>,
    brand: Option<String>,
    price: Money,
    description: Option<String>,
    features: Option<Json<serde_json::Value>>,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.item_id,
            name: row.name,
            category: row.category,
            subcategories: row.subcategories.map(|j| j.0).unwrap_or_default(),
            brand: row.brand,
            price: row.price,
            description: row.description,
            features: row.features.map(|j| j.0),
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    item_id: String,
    updated_at: DateTime<Utc>,
    name: String,
    category: String,
    subcategories: Option<Json<Vec<String>>>,
    brand: Option<String>,
    price: Money,
    description: Option<String>,
    features: Option<Json<serde_json::Value>>,
    created_at: DateTime<Utc>,
}

impl From<SnapshotRow> for ItemSnapshot {
    fn from(row: SnapshotRow) -> Self {
        ItemSnapshot {
            item_id: row.item_id,
            updated_at: row.updated_at,
            name: row.name,
            category: row.category,
            subcategories: row.subcategories.map(|j| j.0).unwrap_or_default(),
            brand: row.brand,
            price: row.price,
            description: row.description,
            features: row.features.map(|j| j.0),
            created_at: row.created_at,
        }
    }
}

const SELECT_ITEM: &str = r#"
    SELECT item_id, name, category, subcategories, brand, price,
           description, features, stock, created_at, updated_at
    FROM items
    WHERE item_id = ?1
"#;

// =============================================================================
// Unit-of-Work Operations
// =============================================================================
// These run on a `&mut SqliteConnection` so the checkout orchestrator can
// enlist them in one transaction.

/// Atomically reserves `quantity` units of an item.
///
/// Returns the PRE-decrement item record: pricing and the snapshot use
/// the item as it was read, and the price is read before the decrement.
///
/// ## Errors
/// * `ItemNotFound` - item id does not exist
/// * `InsufficientStock` - carries requested vs. available, also when a
///   concurrent reservation wins the race between the read and the
///   guarded update
pub async fn reserve(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> StoreResult<Item> {
    debug!(item_id = %item_id, quantity = %quantity, "Reserving stock");

    let item: Item = sqlx::query_as::<_, ItemRow>(SELECT_ITEM)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Into::into)
        .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;

    if item.stock < quantity {
        return Err(StoreError::Domain(CoreError::InsufficientStock {
            item_id: item_id.to_string(),
            requested: quantity,
            available: item.stock,
        }));
    }

    // The guard re-checks stock so concurrent reservations cannot
    // together drive it negative.
    let result = sqlx::query(
        r#"
        UPDATE items
        SET stock = stock - ?2
        WHERE item_id = ?1 AND stock >= ?2
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Lost the race; report what is left now.
        let available: i64 = sqlx::query_scalar("SELECT stock FROM items WHERE item_id = ?1")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);

        return Err(StoreError::Domain(CoreError::InsufficientStock {
            item_id: item_id.to_string(),
            requested: quantity,
            available,
        }));
    }

    Ok(item)
}

/// Ensures exactly one snapshot exists for the item's current version.
///
/// Idempotent under concurrent calls: the conflict target is the
/// `(item_id, updated_at)` primary key, and a concurrent writer having
/// already inserted the row is success, not an error.
pub async fn ensure_snapshot(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
    debug!(item_id = %item.id, version = %item.updated_at, "Ensuring item snapshot");

    let snapshot = ItemSnapshot::capture(item);

    sqlx::query(
        r#"
        INSERT INTO items_snapshots (
            item_id, updated_at, name, category, subcategories,
            brand, price, description, features, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (item_id, updated_at) DO NOTHING
        "#,
    )
    .bind(&snapshot.item_id)
    .bind(snapshot.updated_at)
    .bind(&snapshot.name)
    .bind(&snapshot.category)
    .bind(Json(&snapshot.subcategories))
    .bind(&snapshot.brand)
    .bind(snapshot.price)
    .bind(&snapshot.description)
    .bind(snapshot.features.as_ref().map(Json))
    .bind(snapshot.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Item Repository
// =============================================================================

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, ItemRow>(SELECT_ITEM)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item.map(Into::into))
    }

    /// Inserts a new item. The id must be a UUID and the price
    /// non-negative.
    pub async fn insert(&self, item: &Item) -> StoreResult<()> {
        validate_uuid(&item.id)?;
        validate_price(item.price)?;

        debug!(item_id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                item_id, name, category, subcategories, brand, price,
                description, features, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(Json(&item.subcategories))
        .bind(&item.brand)
        .bind(item.price)
        .bind(&item.description)
        .bind(item.features.as_ref().map(Json))
        .bind(item.stock)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an item's catalog fields and bumps `updated_at`.
    ///
    /// Bumping the timestamp starts a new item version: the next purchase
    /// freezes a fresh snapshot while old transactions keep pointing at
    /// the version they bought.
    pub async fn update(&self, item: &Item) -> StoreResult<DateTime<Utc>> {
        validate_price(item.price)?;

        debug!(item_id = %item.id, "Updating item");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                category = ?3,
                subcategories = ?4,
                brand = ?5,
                price = ?6,
                description = ?7,
                features = ?8,
                stock = ?9,
                updated_at = ?10
            WHERE item_id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(Json(&item.subcategories))
        .bind(&item.brand)
        .bind(item.price)
        .bind(&item.description)
        .bind(item.features.as_ref().map(Json))
        .bind(item.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Item", &item.id).into());
        }

        Ok(now)
    }

    /// Gets a snapshot by its (item id, version key).
    pub async fn get_snapshot(
        &self,
        item_id: &str,
        updated_at: DateTime<Utc>,
    ) -> DbResult<Option<ItemSnapshot>> {
        let snapshot = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT item_id, updated_at, name, category, subcategories,
                   brand, price, description, features, created_at
            FROM items_snapshots
            WHERE item_id = ?1 AND updated_at = ?2
            "#,
        )
        .bind(item_id)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(snapshot.map(Into::into))
    }

    /// Counts snapshots for an item (for tests and diagnostics).
    pub async fn snapshot_count(&self, item_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items_snapshots WHERE item_id = ?1")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Counts catalog items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bazaar_core::CoreError;
    use rust_decimal_macros::dec;

    fn test_item(stock: i64) -> Item {
        let now = Utc::now();
        Item {
            id: generate_item_id(),
            name: "Trail Boot".to_string(),
            category: "shoes".to_string(),
            subcategories: vec!["boots".to_string()],
            brand: Some("Acme".to_string()),
            price: Money::new(dec!(45)),
            description: Some("Waterproof trail boot".to_string()),
            features: Some(serde_json::json!({"waterproof": true, "sizes": [40, 41, 42]})),
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = test_db().await;
        let item = test_item(5);
        db.items().insert(&item).await.unwrap();

        let loaded = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, item.name);
        assert_eq!(loaded.price, item.price);
        assert_eq!(loaded.subcategories, item.subcategories);
        assert_eq!(loaded.features, item.features);
        assert_eq!(loaded.stock, 5);
        assert_eq!(loaded.updated_at, item.updated_at);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_item() {
        let db = test_db().await;

        // Negative price.
        let mut item = test_item(5);
        item.price = Money::new(dec!(-1));
        let err = db.items().insert(&item).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        // Non-UUID id.
        let mut item = test_item(5);
        item.id = "not-a-uuid".to_string();
        let err = db.items().insert(&item).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        assert_eq!(db.items().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_returns_pre_decrement_item() {
        let db = test_db().await;
        let item = test_item(5);
        db.items().insert(&item).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let reserved = reserve(&mut conn, &item.id, 3).await.unwrap();
        assert_eq!(reserved.stock, 5); // pre-decrement view
        drop(conn);

        let after = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_missing_item() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = reserve(&mut conn, "no-such-item", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reserve_insufficient_stock_reports_availability() {
        let db = test_db().await;
        let item = test_item(2);
        db.items().insert(&item).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = reserve(&mut conn, &item.id, 3).await.unwrap_err();
        match err {
            StoreError::Domain(CoreError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The failed reservation must not have touched the stock.
        drop(conn);
        let after = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 2);
    }

    #[tokio::test]
    async fn test_sequential_reserves_never_oversell() {
        let db = test_db().await;
        let item = test_item(5);
        db.items().insert(&item).await.unwrap();

        let mut granted = 0;
        for _ in 0..4 {
            let mut conn = db.pool().acquire().await.unwrap();
            if reserve(&mut conn, &item.id, 2).await.is_ok() {
                granted += 2;
            }
        }

        // 5 units: two reservations of 2 succeed, the rest fail.
        assert_eq!(granted, 4);
        let after = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 1);
    }

    #[tokio::test]
    async fn test_ensure_snapshot_is_idempotent() {
        let db = test_db().await;
        let item = test_item(5);
        db.items().insert(&item).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        ensure_snapshot(&mut conn, &item).await.unwrap();
        ensure_snapshot(&mut conn, &item).await.unwrap();
        drop(conn);

        assert_eq!(db.items().snapshot_count(&item.id).await.unwrap(), 1);

        let snap = db
            .items()
            .get_snapshot(&item.id, item.updated_at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.price, item.price);
        assert_eq!(snap.brand, item.brand);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_new_snapshot_is_separate() {
        let db = test_db().await;
        let mut item = test_item(5);
        db.items().insert(&item).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        ensure_snapshot(&mut conn, &item).await.unwrap();
        drop(conn);

        // Catalog edit: price change starts a new version.
        item.price = Money::new(dec!(49.99));
        let new_version = db.items().update(&item).await.unwrap();
        item.updated_at = new_version;

        let mut conn = db.pool().acquire().await.unwrap();
        ensure_snapshot(&mut conn, &item).await.unwrap();
        drop(conn);

        assert_eq!(db.items().snapshot_count(&item.id).await.unwrap(), 2);
    }
}
