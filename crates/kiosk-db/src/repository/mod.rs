//! # Repositories
//!
//! One repository per table group. Each holds a clone of the pool; writes
//! that touch several rows open a transaction inside the repository.
//!
//! - [`CategoryRepository`] - categories
//! - [`ProductRepository`] - products, search by name
//! - [`ComboRepository`] - combos and their product lines
//! - [`PriceTierRepository`] - time price tiers
//! - [`TimeSessionRepository`] - check-in / check-out with the session's tab
//! - [`SaleRepository`] - sales, lines, folios, settlement
//! - [`ReturnRepository`] - returns against completed sales
//! - [`CashRepository`] - drawer movements and cuts

pub mod cash;
pub mod category;
pub mod combo;
pub mod price_tier;
pub mod product;
pub mod returns;
pub mod sale;
pub mod time_session;

pub use cash::CashRepository;
pub use category::CategoryRepository;
pub use combo::ComboRepository;
pub use price_tier::PriceTierRepository;
pub use product::ProductRepository;
pub use returns::ReturnRepository;
pub use sale::{SaleRepository, TabEntry};
pub use time_session::{Checkout, TimeSessionRepository};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }
}
