//! # Price Tier Repository
//!
//! Time price tiers (precios de tiempo). Billing reads the active tiers; the
//! register's tier picker lists them by `display_order`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kiosk_core::TimePriceTier;

const SELECT_TIER: &str = r#"
    SELECT id, label, minutes, price_cents, display_order, is_active, created_at, updated_at
    FROM time_price_tiers
"#;

#[derive(Debug, Clone)]
pub struct PriceTierRepository {
    pool: SqlitePool,
}

impl PriceTierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceTierRepository { pool }
    }

    pub async fn insert(&self, tier: &TimePriceTier) -> DbResult<TimePriceTier> {
        debug!(id = %tier.id, minutes = tier.minutes, price_cents = tier.price_cents, "Inserting price tier");

        sqlx::query(
            r#"
            INSERT INTO time_price_tiers (
                id, label, minutes, price_cents, display_order, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tier.id)
        .bind(&tier.label)
        .bind(tier.minutes)
        .bind(tier.price_cents)
        .bind(tier.display_order)
        .bind(tier.is_active)
        .bind(tier.created_at)
        .bind(tier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(tier.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TimePriceTier>> {
        let tier = sqlx::query_as::<_, TimePriceTier>(&format!("{SELECT_TIER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tier)
    }

    /// All tiers, including retired ones.
    pub async fn list(&self) -> DbResult<Vec<TimePriceTier>> {
        let tiers = sqlx::query_as::<_, TimePriceTier>(&format!(
            "{SELECT_TIER} ORDER BY display_order, minutes"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tiers)
    }

    /// Tiers offered at the register, ordered by `display_order, minutes`.
    pub async fn list_active(&self) -> DbResult<Vec<TimePriceTier>> {
        let tiers = sqlx::query_as::<_, TimePriceTier>(&format!(
            "{SELECT_TIER} WHERE is_active = 1 ORDER BY display_order, minutes"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tiers)
    }

    pub async fn update(&self, tier: &TimePriceTier) -> DbResult<()> {
        debug!(id = %tier.id, "Updating price tier");

        let result = sqlx::query(
            r#"
            UPDATE time_price_tiers SET
                label = ?2,
                minutes = ?3,
                price_cents = ?4,
                display_order = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&tier.id)
        .bind(&tier.label)
        .bind(tier.minutes)
        .bind(tier.price_cents)
        .bind(tier.display_order)
        .bind(tier.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Price tier", &tier.id));
        }

        Ok(())
    }

    /// Deletes a tier.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - a time session was prepaid with it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting price tier");

        let result = sqlx::query("DELETE FROM time_price_tiers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Price tier", id));
        }

        Ok(())
    }
}
