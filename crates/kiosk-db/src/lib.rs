//! # kiosk-db: Database Layer for Kiosk POS
//!
//! SQLite storage through sqlx: pool, embedded migrations and one repository
//! per table group.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  station command (check_out, finalize_sale, close_cut, ...)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kiosk-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────────────┐   ┌────────────┐  │   │
//! │  │   │  Database    │   │  Repositories        │   │ Migrations │  │   │
//! │  │   │  (pool.rs)   │◄──│  categories products │   │ (embedded) │  │   │
//! │  │   │  SqlitePool  │   │  combos price_tiers  │   │ 001_...sql │  │   │
//! │  │   │              │   │  sessions sales      │   │            │  │   │
//! │  │   │              │   │  returns cash        │   │            │  │   │
//! │  │   └──────────────┘   └──────────────────────┘   └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kiosk.db (WAL) in the platform data directory                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kiosk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kiosk.db")).await?;
//! let tiers = db.price_tiers().list_active().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CashRepository, CategoryRepository, Checkout, ComboRepository, PriceTierRepository,
    ProductRepository, ReturnRepository, SaleRepository, TabEntry, TimeSessionRepository,
};
