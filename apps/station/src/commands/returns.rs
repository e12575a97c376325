//! # Return Commands
//!
//! Completed sales are never edited; units handed back are recorded as
//! returns. The refund carries the line's share of any sale discount and
//! leaves the drawer, so it is subtracted at the next cash cut.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use kiosk_core::ticket::{check_return, refund_for_item};
use kiosk_core::validation::validate_range;
use kiosk_core::{new_id, CoreError, SaleReturn, SaleStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnInput {
    pub sale_id: String,
    pub sale_item_id: String,
    pub quantity: i64,
    pub reason: Option<String>,
    /// Defaults to the station's cashier
    pub user: Option<String>,
}

pub async fn register_return(
    db: &DbState,
    config: &ConfigState,
    input: ReturnInput,
) -> Result<SaleReturn, ApiError> {
    debug!(
        sale_id = %input.sale_id,
        sale_item_id = %input.sale_item_id,
        quantity = input.quantity,
        "register_return command"
    );

    let sale = db
        .inner()
        .sales()
        .get_by_id(&input.sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &input.sale_id))?;

    if sale.status != SaleStatus::Completed {
        return Err(CoreError::InvalidSaleStatus {
            sale_id: sale.folio,
            current_status: sale.status.to_string(),
        }
        .into());
    }

    let item = db
        .inner()
        .sales()
        .get_item(&input.sale_item_id)
        .await?
        .filter(|item| item.sale_id == sale.id)
        .ok_or_else(|| CoreError::SaleItemNotFound {
            sale_id: sale.id.clone(),
            item_id: input.sale_item_id.clone(),
        })?;

    let already_returned = db.inner().returns().returned_quantity(&item.id).await?;
    check_return(&item, input.quantity, already_returned)?;

    let refunded = db.inner().returns().refunded_for_sale(&sale.id).await?;
    let refund = refund_for_item(&item, input.quantity, already_returned, &sale, refunded);
    let sale_return = SaleReturn {
        id: new_id(),
        sale_id: sale.id.clone(),
        sale_item_id: item.id.clone(),
        quantity: input.quantity,
        refund_cents: refund.cents(),
        reason: input.reason.filter(|r| !r.trim().is_empty()),
        cashier: input.user.unwrap_or_else(|| config.cashier.clone()),
        created_at: Utc::now(),
    };

    let sale_return = db.inner().returns().insert(&sale_return).await?;

    info!(
        folio = %sale.folio,
        item = %item.name_snapshot,
        quantity = sale_return.quantity,
        refund = %config.format_currency(sale_return.refund_cents),
        "Return registered"
    );
    Ok(sale_return)
}

pub async fn list_returns(db: &DbState, sale_id: &str) -> Result<Vec<SaleReturn>, ApiError> {
    Ok(db.inner().returns().list_for_sale(sale_id).await?)
}

/// Returns recorded in `[from, to)`, for checking a cut's refunds line.
pub async fn list_returns_between(
    db: &DbState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SaleReturn>, ApiError> {
    validate_range("date range", &from, &to)?;
    Ok(db.inner().returns().list_between(from, to).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{product, states};
    use crate::error::ErrorCode;
    use kiosk_core::ticket::settle;
    use kiosk_core::{ItemKind, Money, PaymentInput, PaymentMethod, Sale};
    use kiosk_db::TabEntry;

    /// Two juices and a snack with a $8.00 discount: subtotal $130.00,
    /// total $122.00.
    async fn discounted_sale(db: &DbState) -> Sale {
        let jugo = product(db, "Jugo de naranja", 2500).await;
        let nachos = product(db, "Nachos con queso", 8000).await;
        let entries = vec![
            TabEntry::new(ItemKind::Product, Some(jugo.id), "Jugo de naranja", 2500, 2),
            TabEntry::new(ItemKind::Product, Some(nachos.id), "Nachos con queso", 8000, 1),
        ];
        let settlement = settle(
            Money::from_cents(12200),
            &PaymentInput {
                method: PaymentMethod::Cash,
                tendered_cents: None,
            },
        )
        .unwrap();

        db.inner()
            .sales()
            .create(&entries, 800, "ana", Some(&settlement), None)
            .await
            .unwrap()
    }

    fn input(sale: &Sale, item_id: &str, quantity: i64) -> ReturnInput {
        ReturnInput {
            sale_id: sale.id.clone(),
            sale_item_id: item_id.to_string(),
            quantity,
            reason: Some("Derramado".to_string()),
            user: None,
        }
    }

    #[tokio::test]
    async fn test_refund_is_prorated() {
        let (db, _, config) = states().await;
        let sale = discounted_sale(&db).await;
        assert_eq!(sale.total_cents, 12200);
        let items = db.inner().sales().get_items(&sale.id).await.unwrap();

        let returned = register_return(&db, &config, input(&sale, &items[0].id, 1))
            .await
            .unwrap();

        // 25.00 × 122 / 130
        assert_eq!(returned.refund_cents, 2346);
        assert_eq!(returned.cashier, "caja");
        assert_eq!(list_returns(&db, &sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unit_by_unit_returns_refund_what_was_paid() {
        let (db, _, config) = states().await;
        let settlement = settle(
            Money::from_cents(2999),
            &PaymentInput {
                method: PaymentMethod::Cash,
                tendered_cents: None,
            },
        )
        .unwrap();
        let sale = db
            .inner()
            .sales()
            .create(
                &[TabEntry::new(ItemKind::Product, None, "Paleta", 1000, 3)],
                1,
                "ana",
                Some(&settlement),
                None,
            )
            .await
            .unwrap();
        let line = db.inner().sales().get_items(&sale.id).await.unwrap().remove(0);

        let mut refunded = 0;
        for _ in 0..3 {
            refunded += register_return(&db, &config, input(&sale, &line.id, 1))
                .await
                .unwrap()
                .refund_cents;
        }
        assert_eq!(refunded, sale.total_cents);

        let from = sale.created_at - chrono::Duration::minutes(1);
        let to = Utc::now() + chrono::Duration::minutes(1);
        let listed = list_returns_between(&db, from, to).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed.iter().map(|r| r.refund_cents).sum::<i64>(), 2999);

        let err = list_returns_between(&db, to, from).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_cannot_exceed_sold() {
        let (db, _, config) = states().await;
        let sale = discounted_sale(&db).await;
        let items = db.inner().sales().get_items(&sale.id).await.unwrap();
        let jugo = &items[0];

        register_return(&db, &config, input(&sale, &jugo.id, 2))
            .await
            .unwrap();
        let err = register_return(&db, &config, input(&sale, &jugo.id, 1))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert!(err.message.contains("only 0 returnable"));
    }

    #[tokio::test]
    async fn test_pending_sale_rejected() {
        let (db, _, config) = states().await;
        let pending = db
            .inner()
            .sales()
            .create(
                &[TabEntry::new(ItemKind::Product, None, "Gomitas", 1500, 1)],
                0,
                "ana",
                None,
                None,
            )
            .await
            .unwrap();
        let items = db.inner().sales().get_items(&pending.id).await.unwrap();

        let err = register_return(&db, &config, input(&pending, &items[0].id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_item_from_another_sale() {
        let (db, _, config) = states().await;
        let first = discounted_sale(&db).await;
        let second = discounted_sale(&db).await;
        let other_items = db.inner().sales().get_items(&second.id).await.unwrap();

        let err = register_return(&db, &config, input(&first, &other_items[0].id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
