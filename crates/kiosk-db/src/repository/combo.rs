//! # Combo Repository
//!
//! Combos and their product lines. The lines are replaced as a whole inside
//! one transaction so a combo is never seen half-edited.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kiosk_core::{Combo, ComboItem};

const SELECT_COMBO: &str = r#"
    SELECT id, name, price_cents, is_active, created_at, updated_at
    FROM combos
"#;

#[derive(Debug, Clone)]
pub struct ComboRepository {
    pool: SqlitePool,
}

impl ComboRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ComboRepository { pool }
    }

    pub async fn insert(&self, combo: &Combo) -> DbResult<Combo> {
        debug!(id = %combo.id, name = %combo.name, "Inserting combo");

        sqlx::query(
            r#"
            INSERT INTO combos (id, name, price_cents, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&combo.id)
        .bind(&combo.name)
        .bind(combo.price_cents)
        .bind(combo.is_active)
        .bind(combo.created_at)
        .bind(combo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(combo.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Combo>> {
        let combo = sqlx::query_as::<_, Combo>(&format!("{SELECT_COMBO} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(combo)
    }

    pub async fn list(&self) -> DbResult<Vec<Combo>> {
        let combos =
            sqlx::query_as::<_, Combo>(&format!("{SELECT_COMBO} ORDER BY name COLLATE NOCASE"))
                .fetch_all(&self.pool)
                .await?;

        Ok(combos)
    }

    pub async fn update(&self, combo: &Combo) -> DbResult<()> {
        debug!(id = %combo.id, "Updating combo");

        let result = sqlx::query(
            r#"
            UPDATE combos SET
                name = ?2,
                price_cents = ?3,
                is_active = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&combo.id)
        .bind(&combo.name)
        .bind(combo.price_cents)
        .bind(combo.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", &combo.id));
        }

        Ok(())
    }

    /// Deletes a combo and its lines.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting combo");

        let result = sqlx::query("DELETE FROM combos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", id));
        }

        Ok(())
    }

    /// Replaces the product lines of a combo.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - combo does not exist
    /// * `Err(DbError::ForeignKeyViolation)` - a product does not exist
    pub async fn set_items(&self, combo_id: &str, items: &[ComboItem]) -> DbResult<()> {
        debug!(combo_id = %combo_id, lines = items.len(), "Replacing combo items");

        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM combos WHERE id = ?1")
            .bind(combo_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Combo", combo_id));
        }

        sqlx::query("DELETE FROM combo_items WHERE combo_id = ?1")
            .bind(combo_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO combo_items (combo_id, product_id, quantity)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(combo_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE combos SET updated_at = ?2 WHERE id = ?1")
            .bind(combo_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_items(&self, combo_id: &str) -> DbResult<Vec<ComboItem>> {
        let items = sqlx::query_as::<_, ComboItem>(
            r#"
            SELECT ci.combo_id, ci.product_id, ci.quantity
            FROM combo_items ci
            INNER JOIN products p ON p.id = ci.product_id
            WHERE ci.combo_id = ?1
            ORDER BY p.name COLLATE NOCASE
            "#,
        )
        .bind(combo_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use kiosk_core::Product;

    fn line(combo: &Combo, product: &Product, quantity: i64) -> ComboItem {
        ComboItem {
            combo_id: combo.id.clone(),
            product_id: product.id.clone(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_combo_round_trip_with_items() {
        let db = db().await;
        let popcorn = Product::new("Palomitas", 3000, None);
        let juice = Product::new("Jugo", 2500, None);
        db.products().insert(&popcorn).await.unwrap();
        db.products().insert(&juice).await.unwrap();

        let repo = db.combos();
        let combo = Combo::new("Combo Fiesta", 5000);
        repo.insert(&combo).await.unwrap();
        repo.set_items(&combo.id, &[line(&combo, &popcorn, 1), line(&combo, &juice, 2)])
            .await
            .unwrap();

        let items = repo.get_items(&combo.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, juice.id);
        assert_eq!(items[0].quantity, 2);

        // Replacing drops the old lines
        repo.set_items(&combo.id, &[line(&combo, &popcorn, 3)]).await.unwrap();
        let items = repo.get_items(&combo.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);

        let mut changed = repo.get_by_id(&combo.id).await.unwrap().unwrap();
        changed.price_cents = 5500;
        repo.update(&changed).await.unwrap();
        assert_eq!(repo.get_by_id(&combo.id).await.unwrap().unwrap().price_cents, 5500);

        repo.delete(&combo.id).await.unwrap();
        assert!(repo.get_by_id(&combo.id).await.unwrap().is_none());
        assert!(repo.get_items(&combo.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_product_in_combo_cannot_be_deleted() {
        let db = db().await;
        let popcorn = Product::new("Palomitas", 3000, None);
        db.products().insert(&popcorn).await.unwrap();
        let combo = Combo::new("Combo Cine", 4000);
        db.combos().insert(&combo).await.unwrap();
        db.combos()
            .set_items(&combo.id, &[line(&combo, &popcorn, 1)])
            .await
            .unwrap();

        let result = db.products().delete(&popcorn.id).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_set_items_rolls_back_on_unknown_product() {
        let db = db().await;
        let popcorn = Product::new("Palomitas", 3000, None);
        db.products().insert(&popcorn).await.unwrap();
        let combo = Combo::new("Combo Cine", 4000);
        db.combos().insert(&combo).await.unwrap();
        db.combos()
            .set_items(&combo.id, &[line(&combo, &popcorn, 1)])
            .await
            .unwrap();

        let ghost = Product::new("Fantasma", 100, None);
        let result = db
            .combos()
            .set_items(&combo.id, &[line(&combo, &popcorn, 2), line(&combo, &ghost, 1)])
            .await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));

        let items = db.combos().get_items(&combo.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_set_items_unknown_combo() {
        let db = db().await;
        let result = db.combos().set_items("missing", &[]).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }
}
