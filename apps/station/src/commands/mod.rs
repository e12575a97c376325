//! # Station Commands
//!
//! One async function per register operation. This is the surface the
//! register UI calls; the NFC loop calls [`time::handle_scan`].
//!
//! ```text
//! commands/
//! ├── catalog.rs  ◄─── categories, products, combos, price tiers
//! ├── cart.rs     ◄─── counter cart manipulation
//! ├── sale.rs     ◄─── create / finalize / cancel, receipts
//! ├── returns.rs  ◄─── returns against completed sales
//! ├── time.rs     ◄─── check-in, check-out, scan handler
//! ├── cash.rs     ◄─── drawer movements, corte de caja
//! └── config.rs   ◄─── configuration retrieval
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs database
//! async fn list_open_sessions(db: &DbState) -> Result<Vec<TimeSession>, ApiError>
//!
//! // Only needs cart
//! fn get_cart(cart: &CartState) -> CartResponse
//!
//! // Needs all three
//! async fn create_sale(db: &DbState, cart: &CartState, config: &ConfigState, ..)
//! ```

pub mod cart;
pub mod cash;
pub mod catalog;
pub mod config;
pub mod returns;
pub mod sale;
pub mod time;
