//! # Database Error Types
//!
//! Errors for warung-db operations.
//!
//! ## Taxonomy
//! - [`DbError::Checkout`] - client-caused; the request was rejected before
//!   any mutation and may be corrected and resubmitted
//! - [`DbError::StockRaceLost`] - transient; a concurrent commit consumed
//!   the stock between validation and decrement. Nothing was written, so
//!   retrying the identical request is safe.
//! - everything else - infrastructure; the commit transaction guarantees
//!   rollback of any stock decrement before one of these surfaces

use thiserror::Error;

use warung_core::CheckoutError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conditional stock decrement lost to a concurrent commit.
    ///
    /// Raised when the decrement matches no rows (the other commit already
    /// consumed the units) or when SQLite refuses the write because this
    /// transaction's read snapshot went stale under it (busy/snapshot
    /// conflict). The whole commit rolls back; no partial decrement, no
    /// partial sale.
    #[error("stock changed concurrently for product {product_id}; retry the sale")]
    StockRaceLost { product_id: String },

    /// Product appears in committed sales and cannot be deleted.
    /// Deactivate it instead.
    #[error("product {id} is referenced by sales and cannot be deleted")]
    ProductInUse { id: String },

    /// Checkout request rejected before any mutation.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Catalog input rejected.
    #[error(transparent)]
    Validation(#[from] warung_core::validation::ValidationError),

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed. When raised from inside the commit
    /// transaction this is the durable store failing the write; the
    /// transaction has already rolled back.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not be started or committed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// True for failures the caller may safely retry with the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::StockRaceLost { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "record",
                id: "unknown".to_string(),
            },

            // Constraint violations (the stock CHECK should be unreachable
            // behind the conditional decrement) surface with their SQLite
            // message intact.
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// True when SQLite is reporting a write conflict with another transaction:
/// SQLITE_BUSY (5, a writer holds the lock) or SQLITE_BUSY_SNAPSHOT (517,
/// this transaction's read snapshot is stale and cannot be upgraded).
///
/// On a multi-connection pool the losing side of a stock race surfaces this
/// way instead of as zero rows affected, so the commit path checks it before
/// the generic `From<sqlx::Error>` mapping turns it into `QueryFailed`.
pub(crate) fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("5") | Some("517"))
                || db_err.message().contains("database is locked")
        }
        _ => false,
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
// Unit Tests
// =============================================================================
