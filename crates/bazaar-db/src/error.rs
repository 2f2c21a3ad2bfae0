//! # Database Error Types
//!
//! Error types for database operations, plus the caller-facing union of
//! domain and infrastructure errors.
//!
//! ## Error Flow
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                               │
//! │                                                                    │
//! │  SQLite Error (sqlx::Error)                                        │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  DbError (this module)  ← adds context and categorization          │
//! │       │                                                            │
//! │       │        CoreError (bazaar-core) ← domain rule violations    │
//! │       │              │                                             │
//! │       ▼              ▼                                             │
//! │  StoreError = Db(DbError) | Domain(CoreError)                      │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  API layer maps each variant to a structured response              │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain errors are never retried here; the whole unit of work aborts
//! and rolls back, so a caller retry is always safe.

use bazaar_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These wrap sqlx errors and provide additional context for debugging
/// and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Store Error
// =============================================================================

/// The caller-facing error surface of this crate: either a domain rule
/// violation (pattern-matchable, actionable by the caller) or an
/// infrastructure failure (retry the whole request; nothing partial was
/// committed).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Db(err.into())
    }
}

impl From<bazaar_core::ValidationError> for StoreError {
    fn from(err: bazaar_core::ValidationError) -> Self {
        StoreError::Domain(err.into())
    }
}

/// Result type for store-level operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Item", "abc");
        assert_eq!(err.to_string(), "Item not found: abc");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: StoreError = CoreError::DiscountNotFound("SALE10".to_string()).into();
        assert_eq!(err.to_string(), "Active discount with code SALE10 not found");
        assert!(matches!(
            err,
            StoreError::Domain(CoreError::DiscountNotFound(_))
        ));
    }
}
