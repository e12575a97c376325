//! # Cash Drawer Commands
//!
//! Manual movements (opening float, deposits, withdrawals) and the cash cut
//! that closes a period.
//!
//! A period runs from the end of the previous cut (or the first drawer
//! activity ever recorded) up to the moment the new cut is taken, so
//! consecutive cuts never overlap and never leave gaps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use kiosk_core::cash::CashSummary;
use kiosk_core::validation::{validate_counted_cents, validate_range};
use kiosk_core::{CashCut, CashMovement, Money, MovementKind};

const DEFAULT_CUT_LIMIT: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementInput {
    pub kind: MovementKind,
    pub amount_cents: i64,
    pub concept: String,
    /// Defaults to the station's cashier
    pub user: Option<String>,
}

/// The figures a cut would record if it were taken at `period_end`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPreview {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub summary: CashSummary,
}

pub async fn record_movement(
    db: &DbState,
    config: &ConfigState,
    input: MovementInput,
) -> Result<CashMovement, ApiError> {
    debug!(kind = ?input.kind, amount_cents = input.amount_cents, "record_movement command");

    let movement = CashMovement::new(
        input.kind,
        input.amount_cents,
        input.concept.trim(),
        input.user.unwrap_or_else(|| config.cashier.clone()),
    );
    movement.validate()?;

    Ok(db.inner().cash().insert_movement(&movement).await?)
}

/// Movements in `[from, to)`.
pub async fn list_movements(
    db: &DbState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<CashMovement>, ApiError> {
    validate_range("date range", &from, &to)?;
    Ok(db.inner().cash().list_movements(from, to).await?)
}

/// Summarizes the open period up to `now` without closing it.
pub async fn preview_cut(db: &DbState, now: DateTime<Utc>) -> Result<CutPreview, ApiError> {
    let cash = db.inner().cash();

    let period_start = match cash.last_cut().await? {
        Some(cut) => cut.period_end,
        None => cash.first_activity_at().await?.unwrap_or(now),
    };
    // Clock went backwards since the last cut
    let period_end = now.max(period_start);

    let (cash_sales, card_sales) = db
        .inner()
        .sales()
        .totals_by_method(period_start, period_end)
        .await?;
    let refunds = db
        .inner()
        .returns()
        .refunds_between(period_start, period_end)
        .await?;
    let movements = cash.list_movements(period_start, period_end).await?;

    let summary = CashSummary::compute(
        &movements,
        Money::from_cents(cash_sales),
        Money::from_cents(card_sales),
        Money::from_cents(refunds),
    );

    Ok(CutPreview {
        period_start,
        period_end,
        summary,
    })
}

/// Closes the open period against the cash the cashier counted.
///
/// ## Errors
/// - `VALIDATION_ERROR` - negative counted amount
pub async fn close_cut(
    db: &DbState,
    config: &ConfigState,
    counted_cents: i64,
    user: Option<String>,
    notes: Option<String>,
) -> Result<CashCut, ApiError> {
    debug!(counted_cents, "close_cut command");
    validate_counted_cents(counted_cents)?;

    let CutPreview {
        period_start,
        period_end,
        summary,
    } = preview_cut(db, Utc::now()).await?;

    let cut = summary.into_cut(
        period_start,
        period_end,
        Money::from_cents(counted_cents),
        user.unwrap_or_else(|| config.cashier.clone()),
        notes.filter(|n| !n.trim().is_empty()),
    );
    let cut = db.inner().cash().insert_cut(&cut).await?;

    if cut.difference_cents != 0 {
        warn!(
            cut_id = %cut.id,
            expected = %config.format_currency(cut.expected_cents),
            counted = %config.format_currency(cut.counted_cents),
            difference = %config.format_currency(cut.difference_cents),
            "Drawer does not match"
        );
    } else {
        info!(cut_id = %cut.id, expected = %config.format_currency(cut.expected_cents), "Drawer matches");
    }
    Ok(cut)
}

/// Latest cuts first (30 by default).
pub async fn list_cuts(db: &DbState, limit: Option<i64>) -> Result<Vec<CashCut>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_CUT_LIMIT).clamp(1, 365);
    Ok(db.inner().cash().list_cuts(limit).await?)
}

pub async fn get_cut(db: &DbState, id: &str) -> Result<CashCut, ApiError> {
    db.inner()
        .cash()
        .get_cut(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cash cut", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_product_to_cart;
    use crate::commands::returns::{register_return, ReturnInput};
    use crate::commands::sale::create_sale;
    use crate::commands::test_support::{product, states};
    use crate::error::ErrorCode;
    use crate::state::CartState;
    use kiosk_core::{PaymentInput, PaymentMethod};

    fn movement(kind: MovementKind, amount_cents: i64, concept: &str) -> MovementInput {
        MovementInput {
            kind,
            amount_cents,
            concept: concept.to_string(),
            user: None,
        }
    }

    async fn sell(
        db: &DbState,
        cart: &CartState,
        config: &ConfigState,
        price: i64,
        method: PaymentMethod,
    ) -> String {
        let item = product(db, "Paleta", price).await;
        add_product_to_cart(db, cart, &item.id, None).await.unwrap();
        let payment = PaymentInput {
            method,
            tendered_cents: None,
        };
        create_sale(db, cart, config, Some(payment), None)
            .await
            .unwrap()
            .sale
            .id
    }

    #[tokio::test]
    async fn test_cut_reconciles_drawer() {
        let (db, cart, config) = states().await;
        record_movement(&db, &config, movement(MovementKind::OpeningFloat, 50000, "Fondo"))
            .await
            .unwrap();
        record_movement(&db, &config, movement(MovementKind::Withdrawal, 10000, "Hielo"))
            .await
            .unwrap();
        let cash_sale = sell(&db, &cart, &config, 12000, PaymentMethod::Cash).await;
        sell(&db, &cart, &config, 30000, PaymentMethod::Card).await;

        let items = db.inner().sales().get_items(&cash_sale).await.unwrap();
        register_return(
            &db,
            &config,
            ReturnInput {
                sale_id: cash_sale.clone(),
                sale_item_id: items[0].id.clone(),
                quantity: 1,
                reason: None,
                user: None,
            },
        )
        .await
        .unwrap();

        let cut = close_cut(&db, &config, 51000, None, Some("Turno matutino".into()))
            .await
            .unwrap();

        assert_eq!(cut.opening_float_cents, 50000);
        assert_eq!(cut.withdrawals_cents, 10000);
        assert_eq!(cut.cash_sales_cents, 12000);
        assert_eq!(cut.card_sales_cents, 30000);
        assert_eq!(cut.refunds_cents, 12000);
        // 500 - 100 + 120 - 120
        assert_eq!(cut.expected_cents, 40000);
        assert_eq!(cut.difference_cents, 11000);
        assert_eq!(cut.cashier, "caja");
        assert_eq!(get_cut(&db, &cut.id).await.unwrap(), cut);
    }

    #[tokio::test]
    async fn test_next_period_starts_at_last_cut() {
        let (db, cart, config) = states().await;
        sell(&db, &cart, &config, 8000, PaymentMethod::Cash).await;
        let first = close_cut(&db, &config, 8000, None, None).await.unwrap();
        assert_eq!(first.difference_cents, 0);

        let preview = preview_cut(&db, Utc::now()).await.unwrap();
        assert_eq!(preview.period_start, first.period_end);
        assert_eq!(preview.summary.cash_sales_cents, 0);

        sell(&db, &cart, &config, 4500, PaymentMethod::Cash).await;
        let second = close_cut(&db, &config, 4000, Some("luis".into()), None)
            .await
            .unwrap();
        assert_eq!(second.period_start, first.period_end);
        assert_eq!(second.cash_sales_cents, 4500);
        assert_eq!(second.difference_cents, -500);

        let cuts = list_cuts(&db, None).await.unwrap();
        assert_eq!(cuts.len(), 2);
        assert_eq!(cuts[0].id, second.id);
    }

    #[tokio::test]
    async fn test_empty_drawer_cut() {
        let (db, _, config) = states().await;

        let cut = close_cut(&db, &config, 0, None, None).await.unwrap();
        assert_eq!(cut.expected_cents, 0);
        assert_eq!(cut.difference_cents, 0);
        assert_eq!(cut.period_start, cut.period_end);

        let err = close_cut(&db, &config, -1, None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_invalid_movements() {
        let (db, _, config) = states().await;

        let err = record_movement(&db, &config, movement(MovementKind::Deposit, 0, "Cambio"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = record_movement(&db, &config, movement(MovementKind::Deposit, 1000, "  "))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let from = Utc::now() - chrono::Duration::hours(1);
        assert!(list_movements(&db, from, Utc::now()).await.unwrap().is_empty());
    }
}
