//! # State Module
//!
//! Separate state types instead of one `AppState`; each command takes only
//! what it needs.
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐
//! │   DbState    │  │  CartState   │  │   ConfigState    │
//! │  Database    │  │  Arc<Mutex<  │  │  store_name      │
//! │  (SQLite     │  │    Cart      │  │  cashier         │
//! │   pool)      │  │  >>          │  │  grace_minutes   │
//! └──────────────┘  └──────────────┘  └──────────────────┘
//! ```
//!
//! - DbState: the pool is thread-safe
//! - CartState: exclusive access through the mutex
//! - ConfigState: read-only after startup

mod cart;
mod config;
mod db;

pub use cart::{Cart, CartError, CartItem, CartState};
pub use config::ConfigState;
pub use db::DbState;
