//! # Product Repository
//!
//! ## Key Operations
//! - CRUD
//! - Listing by category for the register's product grid
//! - Name search (`LIKE`, case-insensitive) for the search box
//!
//! Products are hard-deleted. A product that is part of a combo cannot be
//! deleted (foreign key); deactivate it instead. Sale lines keep their own
//! name and price snapshot, so history is unaffected.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kiosk_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT id, category_id, name, price_cents, is_active, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ```rust,ignore
/// let repo = db.products();
/// let drinks = repo.list_by_category(&bebidas.id).await?;
/// let hits = repo.search("jugo", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products whose name contains `query`.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        // Escape LIKE wildcards typed by the cashier
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"{SELECT_PRODUCT}
            WHERE is_active = 1
              AND name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2"#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    async fn list_active(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE is_active = 1 ORDER BY name COLLATE NOCASE LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Every product, active or not, by name (catalog screen).
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} ORDER BY name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products of one category, by name.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE category_id = ?1 AND is_active = 1 ORDER BY name COLLATE NOCASE"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - category does not exist
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, category_id, name, price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, price_cents = product.price_cents, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                category_id = ?2,
                name = ?3,
                price_cents = ?4,
                is_active = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - a combo still includes it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (seed and diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
