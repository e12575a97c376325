//! # Sale Commands
//!
//! ```text
//!                    create_sale(payment)
//!   cart ──────────────────────────────────────────► COMPLETED
//!     │
//!     │ create_sale(None)        finalize_sale(payment)
//!     └────────────────► PENDING ──────────────────► COMPLETED
//!                           │      (tendered, change)
//!   check_out ──────────────┤
//!   (time lines)            │ cancel_sale
//!                           └──────────────────────► CANCELLED
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use kiosk_core::ticket::settle;
use kiosk_core::validation::validate_range;
use kiosk_core::{
    CoreError, Money, PaymentInput, PaymentMethod, Sale, SaleItem, SaleReturn, SaleStatus,
};

/// A sale with its lines and any returns against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub returns: Vec<SaleReturn>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub terminal_id: String,
    pub folio: String,
    pub status: SaleStatus,
    pub timestamp: String,
    pub cashier: String,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub total: String,
    pub payment_method: Option<PaymentMethod>,
    pub tendered: Option<String>,
    pub change: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub line_total: String,
}

/// Rings up the cart.
///
/// With a payment the sale completes at once; without one it stays pending
/// and shows up in [`list_pending_sales`]. Either way the lines that were
/// rung up leave the cart; anything added meanwhile stays.
pub async fn create_sale(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    payment: Option<PaymentInput>,
    notes: Option<String>,
) -> Result<SaleDetail, ApiError> {
    debug!(with_payment = payment.is_some(), "create_sale command");

    let (entries, totals) = cart.with_cart(|c| (c.to_entries(), c.totals()));
    if entries.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let settlement = payment
        .map(|p| settle(Money::from_cents(totals.total_cents), &p))
        .transpose()?;

    let sale = db
        .inner()
        .sales()
        .create(&entries, 0, &config.cashier, settlement.as_ref(), notes)
        .await?;

    cart.with_cart_mut(|c| c.remove_sold(&entries));

    info!(
        sale_id = %sale.id,
        folio = %sale.folio,
        status = %sale.status,
        total = %config.format_currency(sale.total_cents),
        lines = entries.len(),
        "Sale rung up"
    );
    get_sale(db, &sale.id).await
}

/// Collects payment on a pending sale (a tab or a check-out).
pub async fn finalize_sale(
    db: &DbState,
    sale_id: &str,
    payment: PaymentInput,
) -> Result<SaleDetail, ApiError> {
    debug!(sale_id = %sale_id, method = ?payment.method, "finalize_sale command");

    let sale = pending_sale(db, sale_id).await?;
    let settlement = settle(sale.total(), &payment)?;

    db.inner().sales().finalize(sale_id, &settlement).await?;

    get_sale(db, sale_id).await
}

pub async fn cancel_sale(db: &DbState, sale_id: &str) -> Result<Sale, ApiError> {
    debug!(sale_id = %sale_id, "cancel_sale command");

    pending_sale(db, sale_id).await?;
    Ok(db.inner().sales().cancel(sale_id).await?)
}

async fn pending_sale(db: &DbState, sale_id: &str) -> Result<Sale, ApiError> {
    let sale = db
        .inner()
        .sales()
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

    if sale.status != SaleStatus::Pending {
        return Err(CoreError::InvalidSaleStatus {
            sale_id: sale.folio,
            current_status: sale.status.to_string(),
        }
        .into());
    }
    Ok(sale)
}

/// Open tabs, oldest first.
pub async fn list_pending_sales(db: &DbState) -> Result<Vec<Sale>, ApiError> {
    Ok(db.inner().sales().list_pending().await?)
}

/// Sales completed in `[from, to)`.
pub async fn list_completed_sales(
    db: &DbState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Sale>, ApiError> {
    validate_range("date range", &from, &to)?;
    Ok(db.inner().sales().list_completed(from, to).await?)
}

/// Looks a sale up by the folio printed on its receipt.
pub async fn get_sale_by_folio(db: &DbState, folio: &str) -> Result<SaleDetail, ApiError> {
    let sale = db
        .inner()
        .sales()
        .get_by_folio(folio.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", folio))?;

    get_sale(db, &sale.id).await
}

pub async fn get_sale(db: &DbState, sale_id: &str) -> Result<SaleDetail, ApiError> {
    let repo = db.inner().sales();
    let sale = repo
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
    let items = repo.get_items(sale_id).await?;
    let returns = db.inner().returns().list_for_sale(sale_id).await?;

    Ok(SaleDetail {
        sale,
        items,
        returns,
    })
}

/// Receipt figures formatted for the printer. Pending sales print as a
/// pre-bill without payment lines.
pub async fn get_receipt(
    db: &DbState,
    config: &ConfigState,
    sale_id: &str,
) -> Result<Receipt, ApiError> {
    let SaleDetail { sale, items, .. } = get_sale(db, sale_id).await?;
    let money = |cents: i64| config.format_currency(cents);

    Ok(Receipt {
        store_name: config.store_name.clone(),
        terminal_id: config.terminal_id.clone(),
        folio: sale.folio,
        status: sale.status,
        timestamp: sale.completed_at.unwrap_or(sale.created_at).to_rfc3339(),
        cashier: sale.cashier,
        lines: items
            .into_iter()
            .map(|i| ReceiptLine {
                unit_price: money(i.unit_price_cents),
                line_total: money(i.line_total_cents),
                name: i.name_snapshot,
                quantity: i.quantity,
            })
            .collect(),
        subtotal: money(sale.subtotal_cents),
        discount: (sale.discount_cents > 0).then(|| money(sale.discount_cents)),
        total: money(sale.total_cents),
        payment_method: sale.payment_method,
        tendered: sale.tendered_cents.map(money),
        change: sale.change_cents.map(money),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_product_to_cart;
    use crate::commands::test_support::{product, states};
    use crate::error::ErrorCode;

    fn cash(tendered_cents: i64) -> PaymentInput {
        PaymentInput {
            method: PaymentMethod::Cash,
            tendered_cents: Some(tendered_cents),
        }
    }

    #[tokio::test]
    async fn test_pending_then_finalized_with_change() {
        let (db, cart, config) = states().await;
        let hot_dog = product(&db, "Hot dog", 3500).await;
        add_product_to_cart(&db, &cart, &hot_dog.id, Some(2)).await.unwrap();

        let pending = create_sale(&db, &cart, &config, None, None).await.unwrap();
        assert_eq!(pending.sale.status, SaleStatus::Pending);
        assert_eq!(pending.sale.total_cents, 7000);
        assert_eq!(pending.items.len(), 1);
        assert!(crate::commands::cart::get_cart(&cart).items.is_empty());
        assert_eq!(list_pending_sales(&db).await.unwrap().len(), 1);

        let done = finalize_sale(&db, &pending.sale.id, cash(10000)).await.unwrap();
        assert_eq!(done.sale.status, SaleStatus::Completed);
        assert_eq!(done.sale.tendered_cents, Some(10000));
        assert_eq!(done.sale.change_cents, Some(3000));
        assert!(list_pending_sales(&db).await.unwrap().is_empty());

        let err = finalize_sale(&db, &pending.sale.id, cash(10000)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_paid_sale_completes_immediately() {
        let (db, cart, config) = states().await;
        let malteada = product(&db, "Malteada", 4500).await;
        add_product_to_cart(&db, &cart, &malteada.id, None).await.unwrap();

        let card = PaymentInput {
            method: PaymentMethod::Card,
            tendered_cents: None,
        };
        let detail = create_sale(&db, &cart, &config, Some(card), None).await.unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.sale.payment_method, Some(PaymentMethod::Card));
        assert_eq!(detail.sale.change_cents, Some(0));

        let (folio_day, folio_seq) = detail.sale.folio.split_once('-').unwrap();
        assert_eq!(folio_day.len(), 8);
        assert_eq!(folio_seq, "0001");

        let from = Utc::now() - chrono::Duration::hours(1);
        let to = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(list_completed_sales(&db, from, to).await.unwrap().len(), 1);
        assert!(list_completed_sales(&db, to, from).await.is_err());
    }

    #[tokio::test]
    async fn test_short_payment_keeps_cart() {
        let (db, cart, config) = states().await;
        let pizza = product(&db, "Pizza individual", 6000).await;
        add_product_to_cart(&db, &cart, &pizza.id, None).await.unwrap();

        let err = create_sale(&db, &cart, &config, Some(cash(5000)), None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(crate::commands::cart::get_cart(&cart).items.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let (db, cart, config) = states().await;

        let err = create_sale(&db, &cart, &config, None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_cancelled_cannot_be_finalized() {
        let (db, cart, config) = states().await;
        let nachos = product(&db, "Nachos con queso", 4000).await;
        add_product_to_cart(&db, &cart, &nachos.id, None).await.unwrap();
        let pending = create_sale(&db, &cart, &config, None, None).await.unwrap();

        let cancelled = cancel_sale(&db, &pending.sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);

        let err = finalize_sale(&db, &pending.sale.id, cash(4000)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        let err = cancel_sale(&db, &pending.sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_receipt() {
        let (db, cart, config) = states().await;
        let cafe = product(&db, "Café americano", 3000).await;
        add_product_to_cart(&db, &cart, &cafe.id, Some(2)).await.unwrap();
        let sale = create_sale(&db, &cart, &config, Some(cash(10000)), None)
            .await
            .unwrap();

        let receipt = get_receipt(&db, &config, &sale.sale.id).await.unwrap();

        assert_eq!(receipt.folio, sale.sale.folio);
        assert_eq!(receipt.lines[0].unit_price, "$30.00");
        assert_eq!(receipt.lines[0].line_total, "$60.00");
        assert_eq!(receipt.total, "$60.00");
        assert_eq!(receipt.discount, None);
        assert_eq!(receipt.change.as_deref(), Some("$40.00"));

        let by_folio = get_sale_by_folio(&db, &format!(" {} ", receipt.folio))
            .await
            .unwrap();
        assert_eq!(by_folio.sale.id, sale.sale.id);
        assert_eq!(by_folio.items.len(), 1);

        let err = get_sale_by_folio(&db, "19990101-0001").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_lines_added_during_sale_stay_in_cart() {
        let (db, cart, config) = states().await;
        let hot_dog = product(&db, "Hot dog", 3500).await;
        let refresco = product(&db, "Refresco", 2200).await;
        add_product_to_cart(&db, &cart, &hot_dog.id, None).await.unwrap();

        // The second branch runs while the sale is being written
        let (detail, _) = tokio::join!(create_sale(&db, &cart, &config, None, None), async {
            cart.with_cart_mut(|c| c.add_product(&refresco, 1)).unwrap();
        });

        let detail = detail.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].name_snapshot, "Hot dog");

        let left = crate::commands::cart::get_cart(&cart);
        assert_eq!(left.items.len(), 1);
        assert_eq!(left.items[0].name, "Refresco");
    }
}
