//! # kiosk-core: Pure Business Logic for Kiosk POS
//!
//! All business rules of the play-area point of sale live here as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kiosk POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │       NFC reader  ──►  station loop / commands                  │   │
//! │  │    handle_scan, create_sale, finalize_sale, close_cut, ...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kiosk-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐ ┌──────────┐  │   │
//! │  │   │  types  │ │  money  │ │ billing │ │ ticket │ │   cash   │  │   │
//! │  │   │ Product │ │  Money  │ │  tiers  │ │ totals │ │ summary  │  │   │
//! │  │   │  Sale   │ │         │ │ overage │ │ refund │ │  corte   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO HARDWARE • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kiosk-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, TimeSession, Sale, CashCut, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`billing`] - Time-session billing: tier selection, overage, discount
//! - [`ticket`] - Sale totals, change and refund pro-rating
//! - [`cash`] - Cash register reconciliation (corte de caja)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kiosk_core::billing::quote;
//! use kiosk_core::TimePriceTier;
//!
//! let tiers = vec![
//!     TimePriceTier::new("30 min", 30, 5000, 1),
//!     TimePriceTier::new("1 hora", 60, 8000, 2),
//! ];
//!
//! // 45 minutes of play falls in the one-hour tier
//! let q = quote(&tiers, 45).unwrap();
//! assert_eq!(q.total_cents, 8000);
//! ```

pub mod billing;
pub mod cash;
pub mod error;
pub mod money;
pub mod ticket;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Maximum quantity of a single line in a cart or sale.
///
/// Prevents typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum distinct lines in a cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Longest session a single price tier may describe (24 hours).
pub const MAX_TIER_MINUTES: i64 = 24 * 60;

/// 100% in basis points.
pub const FULL_BPS: i64 = 10_000;
