//! # Return Repository
//!
//! Returns (devoluciones) against lines of completed sales. Each refund is
//! cash leaving the drawer and is subtracted in the next cash cut.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use kiosk_core::SaleReturn;

const SELECT_RETURN: &str = r#"
    SELECT id, sale_id, sale_item_id, quantity, refund_cents, reason, cashier, created_at
    FROM sale_returns
"#;

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Units of a sale line returned so far.
    pub async fn returned_quantity(&self, sale_item_id: &str) -> DbResult<i64> {
        let returned: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM sale_returns WHERE sale_item_id = ?1",
        )
        .bind(sale_item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(returned)
    }

    /// Cash refunded so far against a sale.
    pub async fn refunded_for_sale(&self, sale_id: &str) -> DbResult<i64> {
        let refunded: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(refund_cents), 0) FROM sale_returns WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(refunded)
    }

    /// Records a return.
    ///
    /// The insert only happens while the line still has `quantity` units
    /// left to return, the sale is completed and its refunds stay within
    /// the sale total, so two registers cannot over-return the same line.
    ///
    /// ## Returns
    /// * `Err(DbError::CheckViolation)` - nothing left to return
    pub async fn insert(&self, sale_return: &SaleReturn) -> DbResult<SaleReturn> {
        let result = sqlx::query(
            r#"
            INSERT INTO sale_returns (
                id, sale_id, sale_item_id, quantity, refund_cents, reason, cashier, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            WHERE si.id = ?3
              AND si.sale_id = ?2
              AND s.status = 'completed'
              AND si.quantity - (
                  SELECT COALESCE(SUM(r.quantity), 0)
                  FROM sale_returns r
                  WHERE r.sale_item_id = ?3
              ) >= ?4
              AND s.total_cents - (
                  SELECT COALESCE(SUM(r.refund_cents), 0)
                  FROM sale_returns r
                  WHERE r.sale_id = ?2
              ) >= ?5
            "#,
        )
        .bind(&sale_return.id)
        .bind(&sale_return.sale_id)
        .bind(&sale_return.sale_item_id)
        .bind(sale_return.quantity)
        .bind(sale_return.refund_cents)
        .bind(&sale_return.reason)
        .bind(&sale_return.cashier)
        .bind(sale_return.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::CheckViolation {
                message: format!(
                    "sale item {} has fewer than {} returnable units",
                    sale_return.sale_item_id, sale_return.quantity
                ),
            });
        }

        info!(
            sale_id = %sale_return.sale_id,
            sale_item_id = %sale_return.sale_item_id,
            quantity = sale_return.quantity,
            refund_cents = sale_return.refund_cents,
            "Return recorded"
        );
        Ok(sale_return.clone())
    }

    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleReturn>> {
        let returns = sqlx::query_as::<_, SaleReturn>(&format!(
            "{SELECT_RETURN} WHERE sale_id = ?1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Returns recorded in `[from, to)`.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<SaleReturn>> {
        let returns = sqlx::query_as::<_, SaleReturn>(&format!(
            "{SELECT_RETURN} WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Cash refunded in `[from, to)`.
    pub async fn refunds_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(refund_cents), 0)
            FROM sale_returns
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use crate::TabEntry;
    use chrono::Duration;
    use kiosk_core::ticket::Settlement;
    use kiosk_core::{new_id, ItemKind, PaymentMethod};

    fn sale_return(sale_id: &str, item_id: &str, quantity: i64, refund: i64) -> SaleReturn {
        SaleReturn {
            id: new_id(),
            sale_id: sale_id.to_string(),
            sale_item_id: item_id.to_string(),
            quantity,
            refund_cents: refund,
            reason: Some("Caducado".to_string()),
            cashier: "ana".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_returns_limited_to_sold_quantity() {
        let db = db().await;
        let settlement = Settlement {
            method: PaymentMethod::Cash,
            tendered_cents: 5000,
            change_cents: 0,
        };
        let sale = db
            .sales()
            .create(
                &[TabEntry::new(ItemKind::Product, None, "Jugo", 2500, 2)],
                0,
                "ana",
                Some(&settlement),
                None,
            )
            .await
            .unwrap();
        let item = db.sales().get_items(&sale.id).await.unwrap().remove(0);
        let repo = db.returns();

        repo.insert(&sale_return(&sale.id, &item.id, 1, 2500)).await.unwrap();
        assert_eq!(repo.returned_quantity(&item.id).await.unwrap(), 1);

        let result = repo.insert(&sale_return(&sale.id, &item.id, 2, 5000)).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));

        repo.insert(&sale_return(&sale.id, &item.id, 1, 2500)).await.unwrap();
        assert_eq!(repo.list_for_sale(&sale.id).await.unwrap().len(), 2);
        assert_eq!(repo.refunded_for_sale(&sale.id).await.unwrap(), 5000);

        let from = Utc::now() - Duration::minutes(1);
        let to = Utc::now() + Duration::minutes(1);
        assert_eq!(repo.refunds_between(from, to).await.unwrap(), 5000);
        assert_eq!(repo.list_between(from, to).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refunds_limited_to_sale_total() {
        let db = db().await;
        let settlement = Settlement {
            method: PaymentMethod::Cash,
            tendered_cents: 2999,
            change_cents: 0,
        };
        let sale = db
            .sales()
            .create(
                &[TabEntry::new(ItemKind::Product, None, "Jugo", 1000, 3)],
                1,
                "ana",
                Some(&settlement),
                None,
            )
            .await
            .unwrap();
        let item = db.sales().get_items(&sale.id).await.unwrap().remove(0);
        let repo = db.returns();

        repo.insert(&sale_return(&sale.id, &item.id, 2, 2000)).await.unwrap();
        let result = repo.insert(&sale_return(&sale.id, &item.id, 1, 1000)).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));

        repo.insert(&sale_return(&sale.id, &item.id, 1, 999)).await.unwrap();
        assert_eq!(repo.refunded_for_sale(&sale.id).await.unwrap(), 2999);
    }

    #[tokio::test]
    async fn test_pending_sale_cannot_be_returned() {
        let db = db().await;
        let sale = db
            .sales()
            .create(
                &[TabEntry::new(ItemKind::Product, None, "Jugo", 2500, 1)],
                0,
                "ana",
                None,
                None,
            )
            .await
            .unwrap();
        let item = db.sales().get_items(&sale.id).await.unwrap().remove(0);

        let result = db.returns().insert(&sale_return(&sale.id, &item.id, 1, 2500)).await;
        assert!(matches!(result, Err(DbError::CheckViolation { .. })));
    }
}
