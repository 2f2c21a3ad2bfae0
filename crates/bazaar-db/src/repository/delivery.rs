//! Delivery option repository. Small catalog table; checkout reads a
//! single option inside its unit of work.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbResult, StoreResult};
use bazaar_core::validation::{validate_price, validate_uuid};
use bazaar_core::{CoreError, DeliveryOption, Money};

#[derive(sqlx::FromRow)]
struct DeliveryOptionRow {
    option_id: String,
    name: String,
    price: Money,
}

impl From<DeliveryOptionRow> for DeliveryOption {
    fn from(row: DeliveryOptionRow) -> Self {
        DeliveryOption {
            id: row.option_id,
            name: row.name,
            price: row.price,
        }
    }
}

const SELECT_OPTION: &str = r#"
    SELECT option_id, name, price
    FROM delivery_options
    WHERE option_id = ?1
"#;

/// Fetches the delivery option inside a checkout unit of work.
///
/// ## Errors
/// * `DeliveryOptionNotFound` - option id does not exist
pub async fn get(conn: &mut SqliteConnection, option_id: &str) -> StoreResult<DeliveryOption> {
    let option = sqlx::query_as::<_, DeliveryOptionRow>(SELECT_OPTION)
        .bind(option_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Into::into)
        .ok_or_else(|| CoreError::DeliveryOptionNotFound(option_id.to_string()))?;

    Ok(option)
}

/// Repository for delivery option database operations.
#[derive(Debug, Clone)]
pub struct DeliveryOptionRepository {
    pool: SqlitePool,
}

impl DeliveryOptionRepository {
    /// Creates a new DeliveryOptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeliveryOptionRepository { pool }
    }

    /// Inserts a new delivery option. The id must be a UUID and the
    /// price non-negative.
    pub async fn insert(&self, option: &DeliveryOption) -> StoreResult<()> {
        validate_uuid(&option.id)?;
        validate_price(option.price)?;

        debug!(option_id = %option.id, name = %option.name, "Inserting delivery option");

        sqlx::query(
            r#"
            INSERT INTO delivery_options (option_id, name, price)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&option.id)
        .bind(&option.name)
        .bind(option.price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a delivery option by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DeliveryOption>> {
        let option = sqlx::query_as::<_, DeliveryOptionRow>(SELECT_OPTION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(option.map(Into::into))
    }

    /// Lists all delivery options, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<DeliveryOption>> {
        let rows = sqlx::query_as::<_, DeliveryOptionRow>(
            r#"
            SELECT option_id, name, price
            FROM delivery_options
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
