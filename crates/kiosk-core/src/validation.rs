//! # Validation Module
//!
//! Input validation for Kiosk POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register UI                                                  │
//! │  └── Required fields, immediate feedback                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Station command (Rust)                                       │
//! │  └── THIS MODULE: names, amounts, quantities, NFC UIDs                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{FULL_BPS, MAX_ITEM_QUANTITY, MAX_TIER_MINUTES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest name accepted for catalog entries, tiers and concepts.
pub const MAX_NAME_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (category, product, combo, tier label, concept).
///
/// ## Rules
/// - Must not be blank
/// - At most 100 characters
///
/// ```rust
/// use kiosk_core::validation::validate_name;
///
/// assert!(validate_name("name", "Palomitas").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates and normalizes an NFC card UID.
///
/// Readers in keyboard mode type the UID in different shapes
/// (`04:a1:b2:c3`, `04 A1 B2 C3`, `04a1b2c3`). All of them map to the same
/// uppercase hex string.
///
/// ## Rules
/// - Separators `:`, `-` and whitespace are dropped
/// - Only hex digits
/// - 8 to 20 digits (4, 7 and 10 byte UIDs)
///
/// ```rust
/// use kiosk_core::validation::normalize_nfc_uid;
///
/// assert_eq!(normalize_nfc_uid("04:a1:b2:c3").unwrap(), "04A1B2C3");
/// assert!(normalize_nfc_uid("hello").is_err());
/// ```
pub fn normalize_nfc_uid(raw: &str) -> ValidationResult<String> {
    let uid: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if uid.is_empty() {
        return Err(ValidationError::Required {
            field: "nfc_uid".to_string(),
        });
    }

    if !uid.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidFormat {
            field: "nfc_uid".to_string(),
            reason: "must contain only hexadecimal digits".to_string(),
        });
    }

    if uid.len() < 8 || uid.len() > 20 {
        return Err(ValidationError::InvalidFormat {
            field: "nfc_uid".to_string(),
            reason: "must be 8 to 20 hexadecimal digits".to_string(),
        });
    }

    Ok(uid)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value (1..=999).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (courtesy items).
///
/// ```rust
/// use kiosk_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a cash amount (movement, counted cash, tendered).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a counted-cash figure. An empty drawer counts as zero.
pub fn validate_counted_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "counted cash".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount in basis points (0..=10000).
pub fn validate_discount_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=FULL_BPS).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: FULL_BPS,
        });
    }

    Ok(())
}

/// Validates the minutes of a price tier (1..=1440).
pub fn validate_tier_minutes(minutes: i64) -> ValidationResult<()> {
    if !(1..=MAX_TIER_MINUTES).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "minutes".to_string(),
            min: 1,
            max: MAX_TIER_MINUTES,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier / Range Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use kiosk_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates that `start` is strictly before `end`.
pub fn validate_range<T: PartialOrd>(field: &str, start: &T, end: &T) -> ValidationResult<()> {
    if start >= end {
        return Err(ValidationError::InvalidRange {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
