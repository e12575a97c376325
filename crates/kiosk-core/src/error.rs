//! # Error Types
//!
//! Domain-specific error types for kiosk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kiosk-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kiosk-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  station errors (in app)                                               │
//! │  └── ApiError         - What the register UI sees (serialized)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError                          │
//! │                          DbError   → ApiError                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No active price tier is configured, so a time session cannot be billed.
    #[error("No time price tiers are configured")]
    NoPriceTiers,

    /// Price tier cannot be found (or is inactive).
    #[error("Price tier not found: {0}")]
    PriceTierNotFound(String),

    /// The NFC tag already has an open time session.
    ///
    /// ## When This Occurs
    /// An explicit check-in for a card that was never checked out. The scan
    /// handler never raises this: it checks out instead.
    #[error("Tag {nfc_uid} already has an open session")]
    SessionAlreadyOpen { nfc_uid: String },

    /// The NFC tag has no open time session.
    #[error("Tag {nfc_uid} has no open session")]
    NoOpenSession { nfc_uid: String },

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Finalizing a sale that is already completed or cancelled
    /// - Returning items from a sale that is still pending
    /// - Adding time lines to a closed sale
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Sale line does not belong to the sale.
    #[error("Sale item {item_id} not found in sale {sale_id}")]
    SaleItemNotFound { sale_id: String, item_id: String },

    /// Return quantity exceeds what is still returnable.
    #[error("Cannot return {requested} of '{name}': only {returnable} returnable")]
    ReturnExceedsSold {
        name: String,
        returnable: i64,
        requested: i64,
    },

    /// Cart or sale has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cash tendered does not cover the total.
    #[error("Tendered {tendered_cents} does not cover total {total_cents}")]
    InsufficientPayment {
        total_cents: i64,
        tendered_cents: i64,
    },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are the required-field checks the register performs before any
/// write reaches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid NFC UID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Date range is inverted.
    #[error("{field}: start must be before end")]
    InvalidRange { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ReturnExceedsSold {
            name: "Jugo".to_string(),
            returnable: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot return 3 of 'Jugo': only 1 returnable"
        );

        let err = CoreError::SessionAlreadyOpen {
            nfc_uid: "04A1B2C3".to_string(),
        };
        assert_eq!(err.to_string(), "Tag 04A1B2C3 already has an open session");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10000,
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 10000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "concept".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
