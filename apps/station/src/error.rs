//! # API Error Type
//!
//! Unified error type for station commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kiosk POS                              │
//! │                                                                         │
//! │  Command Function  ──►  Result<T, ApiError>                             │
//! │        │                                                                │
//! │        ├── Database error?   DbError::UniqueViolation ─────┐            │
//! │        ├── Business rule?    CoreError::NoOpenSession ─────┼─► ApiError │
//! │        └── Bad input?        ValidationError::Required ────┘            │
//! │                                                                         │
//! │  The register shows `message` in a dialog and branches on `code`.       │
//! │  The NFC loop logs it and waits for the next scan.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::state::CartError;
use kiosk_core::{CoreError, ValidationError};
use kiosk_db::DbError;

/// Error returned from station commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Tag 04A1B2C3 already has an open session"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Record already exists or the card is already inside
    Conflict,

    /// Database operation failed
    DatabaseError,

    /// Business rule prevents the operation
    BusinessLogic,

    /// Internal error
    Internal,

    /// Cart operation failed
    CartError,

    /// Payment could not be settled
    PaymentError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(
                    ErrorCode::BusinessLogic,
                    "Record is referenced by other records or references a missing one",
                )
            }
            DbError::CheckViolation { message } => ApiError::validation(message),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::PriceTierNotFound(id) => ApiError::not_found("Price tier", &id),
            CoreError::SaleItemNotFound { .. } | CoreError::NoOpenSession { .. } => {
                ApiError::new(ErrorCode::NotFound, message)
            }
            CoreError::SessionAlreadyOpen { .. } => ApiError::new(ErrorCode::Conflict, message),
            CoreError::NoPriceTiers
            | CoreError::InvalidSaleStatus { .. }
            | CoreError::ReturnExceedsSold { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, message)
            }
            CoreError::EmptyCart | CoreError::CartTooLarge { .. } => ApiError::cart(message),
            CoreError::QuantityTooLarge { .. } => ApiError::validation(message),
            CoreError::InsufficientPayment { .. } | CoreError::InvalidPaymentAmount { .. } => {
                ApiError::new(ErrorCode::PaymentError, message)
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::cart(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
