//! # Domain Types
//!
//! Core domain types used throughout Kiosk POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog            Time billing            Sales             Drawer   │
//! │  ─────────          ────────────            ─────             ──────   │
//! │  Category           TimePriceTier           Sale              CashMovement
//! │  Product            TimeSession             SaleItem          CashCut  │
//! │  Combo              SessionStatus           SaleReturn        MovementKind
//! │  ComboItem                                  SaleStatus                 │
//! │                                             PaymentMethod              │
//! │                                             ItemKind                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string. Money fields are `*_cents`,
//! percentages are `*_bps`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_discount_bps, validate_name, validate_price_cents, validate_quantity,
    validate_tier_minutes, validate_uuid, ValidationResult,
};

/// Generates a new entity ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category (e.g. "Bebidas", "Snacks").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Category {
            id: new_id(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Category this product is listed under.
    pub category_id: Option<String>,
    pub name: String,
    /// Price in cents.
    pub price_cents: i64,
    /// Inactive products stay in the catalog but cannot be added to a cart.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price_cents: i64, category_id: Option<String>) -> Self {
        let now = Utc::now();
        Product {
            id: new_id(),
            category_id,
            name: name.into(),
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_price_cents(self.price_cents)?;
        if let Some(category_id) = &self.category_id {
            validate_uuid(category_id)?;
        }
        Ok(())
    }
}

/// A bundle of products sold at its own price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Combo {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Combo {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Combo {
            id: new_id(),
            name: name.into(),
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_price_cents(self.price_cents)
    }
}

/// One product line inside a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ComboItem {
    pub combo_id: String,
    pub product_id: String,
    pub quantity: i64,
}

impl ComboItem {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid(&self.product_id)?;
        validate_quantity(self.quantity)
    }
}

// =============================================================================
// Time Billing
// =============================================================================

/// Price for a block of play time (e.g. "1 hora" = 60 min for $80.00).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TimePriceTier {
    pub id: String,
    /// Label printed on the ticket.
    pub label: String,
    pub minutes: i64,
    pub price_cents: i64,
    /// Position on the register's tier picker.
    pub display_order: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TimePriceTier {
    pub fn new(label: impl Into<String>, minutes: i64, price_cents: i64, display_order: i64) -> Self {
        let now = Utc::now();
        TimePriceTier {
            id: new_id(),
            label: label.into(),
            minutes,
            price_cents,
            display_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("label", &self.label)?;
        validate_tier_minutes(self.minutes)?;
        validate_price_cents(self.price_cents)
    }
}

/// Whether a time session is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Patron is inside.
    Open,
    /// Patron left and the session was billed.
    Closed,
}

/// A billed time session identified by an NFC card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TimeSession {
    pub id: String,
    /// Normalized card UID (uppercase hex).
    pub nfc_uid: String,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub entered_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub exited_at: Option<DateTime<Utc>>,
    /// Tier bought at the entrance, if any.
    pub prepaid_tier_id: Option<String>,
    /// Minutes of the prepaid tier when it was sold.
    pub prepaid_minutes: Option<i64>,
    /// Price of the prepaid tier when it was sold; the tab's Time line.
    pub prepaid_price_cents: Option<i64>,
    /// Discount applied to the whole time charge (basis points).
    pub discount_bps: i64,
    /// Minutes billed at exit.
    pub billed_minutes: Option<i64>,
    /// Total time charge after discount, set at exit.
    pub charged_cents: Option<i64>,
    /// Pending sale that collects the time charge.
    pub sale_id: Option<String>,
    pub cashier: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TimeSession {
    /// A session opened at `entered_at`, keeping the terms of the tier
    /// `prepaid` as sold.
    pub fn new(
        nfc_uid: impl Into<String>,
        prepaid: Option<&TimePriceTier>,
        discount_bps: i64,
        cashier: impl Into<String>,
        entered_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        TimeSession {
            id: new_id(),
            nfc_uid: nfc_uid.into(),
            status: SessionStatus::Open,
            entered_at,
            exited_at: None,
            prepaid_tier_id: prepaid.map(|t| t.id.clone()),
            prepaid_minutes: prepaid.map(|t| t.minutes),
            prepaid_price_cents: prepaid.map(|t| t.price_cents),
            discount_bps,
            billed_minutes: None,
            charged_cents: None,
            sale_id: None,
            cashier: cashier.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// `tier` as it was sold to this session. Repricing a tier never
    /// changes what a patron already inside paid for.
    pub fn prepaid_as_sold(&self, mut tier: TimePriceTier) -> TimePriceTier {
        if let Some(minutes) = self.prepaid_minutes {
            tier.minutes = minutes;
        }
        if let Some(price_cents) = self.prepaid_price_cents {
            tier.price_cents = price_cents;
        }
        tier
    }
}

/// Parameters for an explicit check-in at the entrance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub nfc_uid: String,
    pub prepaid_tier_id: Option<String>,
    pub discount_bps: i64,
}

impl CheckIn {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_discount_bps(self.discount_bps)?;
        if let Some(tier_id) = &self.prepaid_tier_id {
            validate_uuid(tier_id)?;
        }
        Ok(())
    }
}

// =============================================================================
// Sales
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Open tab: lines can still be added, nothing collected yet.
    Pending,
    /// Paid and closed.
    Completed,
    /// Abandoned before payment.
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Goes into the drawer and counts for the cash cut.
    Cash,
    /// Card on an external terminal.
    Card,
}

/// What a sale line is charging for.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Product,
    Combo,
    /// Play time (tier price).
    Time,
    /// Minutes beyond a prepaid tier.
    Overage,
}

/// A sale (venta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Human-readable number: `YYYYMMDD-NNNN`.
    pub folio: String,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub tendered_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub cashier: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale line (detalle de venta). Name and price are frozen at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub kind: ItemKind,
    /// Product, combo, tier or session the line came from.
    pub reference_id: Option<String>,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Builds a line for `sale_id` with `line_total = unit × quantity`.
    pub fn new(
        sale_id: impl Into<String>,
        kind: ItemKind,
        reference_id: Option<String>,
        name: impl Into<String>,
        unit_price_cents: i64,
        quantity: i64,
    ) -> Self {
        SaleItem {
            id: new_id(),
            sale_id: sale_id.into(),
            kind,
            reference_id,
            name_snapshot: name.into(),
            unit_price_cents,
            quantity,
            line_total_cents: unit_price_cents * quantity,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A returned quantity of one sale line (devolución).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    pub sale_item_id: String,
    pub quantity: i64,
    /// Cash handed back; leaves the drawer.
    pub refund_cents: i64,
    pub reason: Option<String>,
    pub cashier: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Payment collected when a sale is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub method: PaymentMethod,
    /// Cash handed over by the customer. Ignored for card payments.
    pub tendered_cents: Option<i64>,
}

// =============================================================================
// Cash Register
// =============================================================================

/// Kind of manual drawer movement.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Change fund placed in the drawer at the start of a shift.
    OpeningFloat,
    /// Cash put into the drawer.
    Deposit,
    /// Cash taken out of the drawer.
    Withdrawal,
}

impl MovementKind {
    /// Sign of this movement in the drawer balance.
    pub fn sign(&self) -> i64 {
        match self {
            MovementKind::OpeningFloat | MovementKind::Deposit => 1,
            MovementKind::Withdrawal => -1,
        }
    }
}

/// A cash-register movement (movimiento de caja).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub kind: MovementKind,
    /// Always positive; direction comes from `kind`.
    pub amount_cents: i64,
    pub concept: String,
    pub cashier: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    pub fn new(
        kind: MovementKind,
        amount_cents: i64,
        concept: impl Into<String>,
        cashier: impl Into<String>,
    ) -> Self {
        CashMovement {
            id: new_id(),
            kind,
            amount_cents,
            concept: concept.into(),
            cashier: cashier.into(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.amount_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            });
        }
        validate_name("concept", &self.concept)
    }

    /// Signed contribution to the drawer.
    #[inline]
    pub fn signed_amount(&self) -> Money {
        Money::from_cents(self.amount_cents * self.kind.sign())
    }
}

/// End-of-shift reconciliation (corte de caja).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashCut {
    pub id: String,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
    pub opening_float_cents: i64,
    pub deposits_cents: i64,
    pub withdrawals_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub refunds_cents: i64,
    pub expected_cents: i64,
    pub counted_cents: i64,
    /// counted − expected (negative = drawer short).
    pub difference_cents: i64,
    pub cashier: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_default_and_display() {
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
        assert_eq!(SaleStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_session_keeps_prepaid_terms() {
        let mut hour = TimePriceTier::new("1 hora", 60, 8000, 2);
        let session = TimeSession::new("04A1B2C3", Some(&hour), 0, "ana", Utc::now());
        assert_eq!(session.prepaid_price_cents, Some(8000));

        hour.price_cents = 9000;
        hour.minutes = 45;
        let sold = session.prepaid_as_sold(hour);
        assert_eq!(sold.price_cents, 8000);
        assert_eq!(sold.minutes, 60);
        assert_eq!(sold.label, "1 hora");
    }

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem::new("sale", ItemKind::Product, None, "Jugo", 2500, 3);
        assert_eq!(item.line_total_cents, 7500);
    }

    #[test]
    fn test_movement_signed_amount() {
        let w = CashMovement::new(MovementKind::Withdrawal, 5000, "Proveedor", "ana");
        assert_eq!(w.signed_amount().cents(), -5000);

        let f = CashMovement::new(MovementKind::OpeningFloat, 50000, "Fondo", "ana");
        assert_eq!(f.signed_amount().cents(), 50000);
    }

    #[test]
    fn test_movement_requires_positive_amount() {
        let m = CashMovement::new(MovementKind::Deposit, 0, "Cambio", "ana");
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_product_validate() {
        assert!(Product::new("Agua", 1500, None).validate().is_ok());
        assert!(Product::new("", 1500, None).validate().is_err());
        assert!(Product::new("Agua", -1, None).validate().is_err());
        assert!(Product::new("Agua", 1, Some("nope".to_string())).validate().is_err());
    }
}
