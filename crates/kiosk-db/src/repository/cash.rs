//! # Cash Repository
//!
//! Drawer movements and cash cuts (cortes de caja).
//!
//! ```text
//! ──●────────────●───────────────●──────────────────────► time
//!   first        cut #1          cut #2          now
//!   activity     period_end      period_end
//!   │◄─ cut #1 ─►│◄─── cut #2 ──►│◄── preview ───►│
//! ```
//!
//! Cuts are append-only; each period starts where the previous one ended.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use kiosk_core::{CashCut, CashMovement};

const SELECT_MOVEMENT: &str = r#"
    SELECT id, kind, amount_cents, concept, cashier, created_at
    FROM cash_movements
"#;

const SELECT_CUT: &str = r#"
    SELECT
        id, period_start, period_end,
        opening_float_cents, deposits_cents, withdrawals_cents,
        cash_sales_cents, card_sales_cents, refunds_cents,
        expected_cents, counted_cents, difference_cents,
        cashier, notes, created_at
    FROM cash_cuts
"#;

#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    pub async fn insert_movement(&self, movement: &CashMovement) -> DbResult<CashMovement> {
        sqlx::query(
            r#"
            INSERT INTO cash_movements (id, kind, amount_cents, concept, cashier, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.kind)
        .bind(movement.amount_cents)
        .bind(&movement.concept)
        .bind(&movement.cashier)
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            movement_id = %movement.id,
            kind = ?movement.kind,
            amount_cents = movement.amount_cents,
            cashier = %movement.cashier,
            "Cash movement recorded"
        );
        Ok(movement.clone())
    }

    /// Movements in `[from, to)`, oldest first.
    pub async fn list_movements(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(&format!(
            "{SELECT_MOVEMENT} WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Earliest drawer activity: a movement or a completed sale.
    pub async fn first_activity_at(&self) -> DbResult<Option<DateTime<Utc>>> {
        let first: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT MIN(at) FROM (
                SELECT MIN(created_at) AS at FROM cash_movements
                UNION ALL
                SELECT MIN(completed_at) AS at FROM sales WHERE status = 'completed'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(first)
    }

    /// Most recent cut, if any.
    pub async fn last_cut(&self) -> DbResult<Option<CashCut>> {
        let cut = sqlx::query_as::<_, CashCut>(&format!(
            "{SELECT_CUT} ORDER BY period_end DESC, created_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(cut)
    }

    pub async fn insert_cut(&self, cut: &CashCut) -> DbResult<CashCut> {
        debug!(cut_id = %cut.id, "Inserting cash cut");

        sqlx::query(
            r#"
            INSERT INTO cash_cuts (
                id, period_start, period_end,
                opening_float_cents, deposits_cents, withdrawals_cents,
                cash_sales_cents, card_sales_cents, refunds_cents,
                expected_cents, counted_cents, difference_cents,
                cashier, notes, created_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15
            )
            "#,
        )
        .bind(&cut.id)
        .bind(cut.period_start)
        .bind(cut.period_end)
        .bind(cut.opening_float_cents)
        .bind(cut.deposits_cents)
        .bind(cut.withdrawals_cents)
        .bind(cut.cash_sales_cents)
        .bind(cut.card_sales_cents)
        .bind(cut.refunds_cents)
        .bind(cut.expected_cents)
        .bind(cut.counted_cents)
        .bind(cut.difference_cents)
        .bind(&cut.cashier)
        .bind(&cut.notes)
        .bind(cut.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            cut_id = %cut.id,
            expected_cents = cut.expected_cents,
            counted_cents = cut.counted_cents,
            difference_cents = cut.difference_cents,
            "Cash cut closed"
        );
        Ok(cut.clone())
    }

    pub async fn get_cut(&self, id: &str) -> DbResult<Option<CashCut>> {
        let cut = sqlx::query_as::<_, CashCut>(&format!("{SELECT_CUT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cut)
    }

    /// Latest cuts first.
    pub async fn list_cuts(&self, limit: i64) -> DbResult<Vec<CashCut>> {
        let cuts = sqlx::query_as::<_, CashCut>(&format!(
            "{SELECT_CUT} ORDER BY period_end DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(cuts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use chrono::Duration;
    use kiosk_core::cash::CashSummary;
    use kiosk_core::{Money, MovementKind};

    #[tokio::test]
    async fn test_movements_in_range() {
        let db = db().await;
        let repo = db.cash();
        assert!(repo.first_activity_at().await.unwrap().is_none());

        let float = CashMovement::new(MovementKind::OpeningFloat, 50000, "Fondo", "ana");
        repo.insert_movement(&float).await.unwrap();
        repo.insert_movement(&CashMovement::new(MovementKind::Withdrawal, 8000, "Hielo", "ana"))
            .await
            .unwrap();

        let from = Utc::now() - Duration::minutes(1);
        let to = Utc::now() + Duration::minutes(1);
        let movements = repo.list_movements(from, to).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::OpeningFloat);

        assert_eq!(repo.first_activity_at().await.unwrap(), Some(float.created_at));
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let db = db().await;
        let result = db
            .cash()
            .insert_movement(&CashMovement::new(MovementKind::Deposit, -10, "Error", "ana"))
            .await;

        assert!(matches!(result, Err(crate::DbError::CheckViolation { .. })));
    }

    #[tokio::test]
    async fn test_cut_round_trip() {
        let db = db().await;
        let repo = db.cash();
        assert!(repo.last_cut().await.unwrap().is_none());

        let end = Utc::now();
        let start = end - Duration::hours(8);
        let summary = CashSummary::compute(
            &[CashMovement::new(MovementKind::OpeningFloat, 50000, "Fondo", "ana")],
            Money::from_cents(30000),
            Money::zero(),
            Money::zero(),
        );
        let cut = summary.into_cut(start, end, Money::from_cents(79500), "ana", None);
        repo.insert_cut(&cut).await.unwrap();

        let loaded = repo.get_cut(&cut.id).await.unwrap().unwrap();
        assert_eq!(loaded, cut);
        assert_eq!(loaded.difference_cents, -500);
        assert_eq!(repo.last_cut().await.unwrap().unwrap().id, cut.id);
        assert_eq!(repo.list_cuts(10).await.unwrap().len(), 1);
    }
}
