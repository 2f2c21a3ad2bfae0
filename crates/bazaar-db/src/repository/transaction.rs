//! # Transaction Repository
//!
//! Persistence for transactions, their line items, and their discount
//! associations.
//!
//! ## Write Path
//! The insert functions run on `&mut SqliteConnection` so checkout can
//! enlist them in the same unit of work as stock reservation: either the
//! whole purchase commits or none of it does.
//!
//! ## Finalization
//! `finalize` must succeed exactly once per transaction, even when two
//! fulfilment workers race. The guard lives in the UPDATE itself:
//!
//! ```text
//! UPDATE transactions SET status = 'finalized', finalized_at = ?
//! WHERE transaction_id = ? AND buyer_id = ? AND status = 'open'
//! ```
//!
//! Zero rows affected means the transaction is missing, belongs to
//! another buyer, or was already finalized; a follow-up read tells
//! those cases apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbResult, StoreError, StoreResult};
use bazaar_core::{CoreError, Money, Transaction, TransactionItem, TransactionStatus};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct TransactionRow {
    transaction_id: String,
    buyer_id: String,
    status: TransactionStatus,
    delivery_option_id: String,
    delivery_details: sqlx::types::Json<serde_json::Value>,
    total_price: bazaar_core::Money,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.transaction_id,
            buyer_id: row.buyer_id,
            status: row.status,
            delivery_option_id: row.delivery_option_id,
            delivery_details: row.delivery_details.0,
            total_price: row.total_price,
            created_at: row.created_at,
            finalized_at: row.finalized_at,
        }
    }
}

/// One stored line joined to the snapshot it was priced against.
///
/// The name, category, and catalog price come from the `(item_id,
/// item_updated_at)` snapshot, NOT the live item: a catalog edit after
/// the purchase must not change what this read reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLine {
    pub item_id: String,
    /// Version key of the snapshot this line was priced against.
    pub item_updated_at: DateTime<Utc>,
    pub name: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub brand: Option<String>,
    /// Unit price of the purchased item version, before discounts.
    pub unit_price: Money,
    /// Stored post-discount unit price, quantized.
    pub unit_price_after_discounts: Money,
    pub quantity: i64,
}

#[derive(sqlx::FromRow)]
struct TransactionLineRow {
    item_id: String,
    item_updated_at: DateTime<Utc>,
    name: String,
    category: String,
    subcategories: Option<Json<Vec<String>>>,
    brand: Option<String>,
    unit_price: Money,
    unit_price_after_discounts: Money,
    quantity: i64,
}

impl From<TransactionLineRow> for TransactionLine {
    fn from(row: TransactionLineRow) -> Self {
        TransactionLine {
            item_id: row.item_id,
            item_updated_at: row.item_updated_at,
            name: row.name,
            category: row.category,
            subcategories: row.subcategories.map(|j| j.0).unwrap_or_default(),
            brand: row.brand,
            unit_price: row.unit_price,
            unit_price_after_discounts: row.unit_price_after_discounts,
            quantity: row.quantity,
        }
    }
}

const SELECT_TRANSACTION: &str = r#"
    SELECT transaction_id, buyer_id, status, delivery_option_id,
           delivery_details, total_price, created_at, finalized_at
    FROM transactions
    WHERE transaction_id = ?1 AND buyer_id = ?2
"#;

// =============================================================================
// Unit-of-Work Operations
// =============================================================================

/// Inserts the transaction header inside a checkout unit of work.
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> DbResult<()> {
    debug!(transaction_id = %transaction.id, buyer_id = %transaction.buyer_id, "Inserting transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (
            transaction_id, buyer_id, status, delivery_option_id,
            delivery_details, total_price, created_at, finalized_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.buyer_id)
    .bind(transaction.status)
    .bind(&transaction.delivery_option_id)
    .bind(sqlx::types::Json(&transaction.delivery_details))
    .bind(transaction.total_price)
    .bind(transaction.created_at)
    .bind(transaction.finalized_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one purchased line inside a checkout unit of work.
pub async fn insert_item(conn: &mut SqliteConnection, line: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            transaction_id, item_id, item_updated_at, quantity, unit_price
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&line.transaction_id)
    .bind(&line.item_id)
    .bind(line.item_updated_at)
    .bind(line.quantity)
    .bind(line.unit_price)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Records that a discount code was applied to at least one line of a
/// transaction. Each code links at most once per transaction: the
/// checkout deduplicates before calling.
pub async fn insert_discount_link(
    conn: &mut SqliteConnection,
    transaction_id: &str,
    discount_code: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_discounts (transaction_id, discount_code)
        VALUES (?1, ?2)
        "#,
    )
    .bind(transaction_id)
    .bind(discount_code)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Transaction Repository
// =============================================================================

/// Repository for transaction reads and finalization. All reads are
/// scoped to a buyer: a transaction id alone never grants access.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by id, scoped to the buyer who owns it.
    pub async fn get_by_id(
        &self,
        buyer_id: &str,
        transaction_id: &str,
    ) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(SELECT_TRANSACTION)
            .bind(transaction_id)
            .bind(buyer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Lists a buyer's transactions, most recent first.
    pub async fn list_for_buyer(&self, buyer_id: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT transaction_id, buyer_id, status, delivery_option_id,
                   delivery_details, total_price, created_at, finalized_at
            FROM transactions
            WHERE buyer_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Gets the lines of a transaction with their snapshot details.
    ///
    /// Joins each line to the `(item_id, item_updated_at)` snapshot so
    /// the purchased-version name, scope fields, and catalog price are
    /// reported even after the live item changes.
    pub async fn lines_for(&self, transaction_id: &str) -> DbResult<Vec<TransactionLine>> {
        let rows = sqlx::query_as::<_, TransactionLineRow>(
            r#"
            SELECT ti.item_id,
                   ti.item_updated_at,
                   s.name,
                   s.category,
                   s.subcategories,
                   s.brand,
                   s.price AS unit_price,
                   ti.unit_price AS unit_price_after_discounts,
                   ti.quantity
            FROM transaction_items ti
            JOIN items_snapshots s
              ON s.item_id = ti.item_id AND s.updated_at = ti.item_updated_at
            WHERE ti.transaction_id = ?1
            ORDER BY ti.item_id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Gets the discount codes that were applied to a transaction.
    pub async fn discount_codes_for(&self, transaction_id: &str) -> DbResult<Vec<String>> {
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT discount_code
            FROM transaction_discounts
            WHERE transaction_id = ?1
            ORDER BY discount_code
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    /// Moves a transaction from open to finalized, exactly once.
    ///
    /// ## Errors
    /// * `TransactionNotFound` - no such transaction for this buyer
    /// * `TransactionAlreadyFinalized` - the transition already happened
    pub async fn finalize(
        &self,
        buyer_id: &str,
        transaction_id: &str,
    ) -> StoreResult<Transaction> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?3, finalized_at = ?4
            WHERE transaction_id = ?1 AND buyer_id = ?2 AND status = ?5
            "#,
        )
        .bind(transaction_id)
        .bind(buyer_id)
        .bind(TransactionStatus::Finalized)
        .bind(now)
        .bind(TransactionStatus::Open)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "not yours/missing" from "already finalized".
            return match self.get_by_id(buyer_id, transaction_id).await? {
                Some(_) => Err(StoreError::Domain(CoreError::TransactionAlreadyFinalized(
                    transaction_id.to_string(),
                ))),
                None => Err(StoreError::Domain(CoreError::TransactionNotFound {
                    transaction_id: transaction_id.to_string(),
                    buyer_id: buyer_id.to_string(),
                })),
            };
        }

        info!(transaction_id = %transaction_id, buyer_id = %buyer_id, "Transaction finalized");

        let finalized = self
            .get_by_id(buyer_id, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
                buyer_id: buyer_id.to_string(),
            })?;

        Ok(finalized)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
