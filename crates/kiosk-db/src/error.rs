//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module)  ← constraint kind, entity, id                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (station)     ← code + message for the register              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE constraint violation (category name, folio, second open
    /// session for a card).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// FOREIGN KEY constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a category that still has products
    /// - Deleting a product that is part of a combo
    /// - Deleting a tier referenced by a time session
    /// - Referencing a row that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Classifies sqlx errors.
///
/// SQLite reports constraint failures with an error kind; the message names
/// the offending columns (`UNIQUE constraint failed: categories.name`).
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match err {
            sqlx::Error::RowNotFound => return DbError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => return DbError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                return DbError::ConnectionFailed("Pool is closed".to_string())
            }
            sqlx::Error::Database(db_err) => db_err,
            other => return DbError::Internal(other.to_string()),
        };

        let message = db_err.message().to_string();
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                let columns = message.rsplit(": ").next().unwrap_or(&message);
                DbError::duplicate(columns, "unknown")
            }
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                DbError::CheckViolation { message }
            }
            _ => DbError::QueryFailed(message),
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
