//! # Cart Commands
//!
//! ```text
//! ┌──────────┐     ┌──────────┐     ┌──────────────────────────────────┐
//! │  Empty   │────►│ In Cart  │────►│ create_sale (sale.rs)            │
//! │  Cart    │     │          │     │  with payment ──► completed      │
//! └──────────┘     └──────────┘     │  without      ──► pending (tab)  │
//!      ▲                │           └──────────────────────────────────┘
//!      └── clear_cart ──┘                          │
//!      ▲                                           │
//!      └───────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{Cart, CartItem, CartState, DbState};
use kiosk_core::ticket::SaleTotals;

/// Cart response including items and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub total_quantity: i64,
    pub totals: SaleTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            items: cart.items.clone(),
            total_quantity: cart.total_quantity(),
            totals: cart.totals(),
        }
    }
}

pub fn get_cart(cart: &CartState) -> CartResponse {
    cart.with_cart(|c| CartResponse::from(c))
}

/// Adds a product at its current price (default quantity 1).
pub async fn add_product_to_cart(
    db: &DbState,
    cart: &CartState,
    product_id: &str,
    quantity: Option<i64>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(product_id = %product_id, quantity, "add_product_to_cart command");

    let product = db
        .inner()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    if !product.is_active {
        return Err(ApiError::validation("Product is not available for sale"));
    }

    cart.with_cart_mut(|c| {
        c.add_product(&product, quantity)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })
}

/// Adds a combo at its own price (default quantity 1).
pub async fn add_combo_to_cart(
    db: &DbState,
    cart: &CartState,
    combo_id: &str,
    quantity: Option<i64>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(combo_id = %combo_id, quantity, "add_combo_to_cart command");

    let combo = db
        .inner()
        .combos()
        .get_by_id(combo_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Combo", combo_id))?;

    if !combo.is_active {
        return Err(ApiError::validation("Combo is not available for sale"));
    }

    cart.with_cart_mut(|c| {
        c.add_combo(&combo, quantity)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })
}

/// Sets a line's quantity; 0 removes it.
pub fn update_cart_item(
    cart: &CartState,
    reference_id: &str,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(reference_id = %reference_id, quantity, "update_cart_item command");

    cart.with_cart_mut(|c| {
        c.update_quantity(reference_id, quantity)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })
}

pub fn remove_from_cart(cart: &CartState, reference_id: &str) -> Result<CartResponse, ApiError> {
    debug!(reference_id = %reference_id, "remove_from_cart command");

    cart.with_cart_mut(|c| {
        c.remove_item(reference_id)?;
        Ok::<_, ApiError>(CartResponse::from(&*c))
    })
}

pub fn clear_cart(cart: &CartState) -> CartResponse {
    cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::from(&*c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{product, states};
    use crate::error::ErrorCode;
    use kiosk_core::{Combo, ItemKind};

    #[tokio::test]
    async fn test_add_update_remove() {
        let (db, cart, _) = states().await;
        let jugo = product(&db, "Jugo de manzana", 2500).await;

        let response = add_product_to_cart(&db, &cart, &jugo.id, Some(2)).await.unwrap();
        assert_eq!(response.totals.subtotal_cents, 5000);

        let response = update_cart_item(&cart, &jugo.id, 3).unwrap();
        assert_eq!(response.total_quantity, 3);
        assert_eq!(response.totals.total_cents, 7500);

        let response = remove_from_cart(&cart, &jugo.id).unwrap();
        assert!(response.items.is_empty());

        let err = remove_from_cart(&cart, &jugo.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_inactive_and_unknown_products() {
        let (db, cart, _) = states().await;
        let mut agua = product(&db, "Agua natural", 1500).await;
        agua.is_active = false;
        db.inner().products().update(&agua).await.unwrap();

        let err = add_product_to_cart(&db, &cart, &agua.id, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = add_product_to_cart(&db, &cart, "missing", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert!(get_cart(&cart).items.is_empty());
    }

    #[tokio::test]
    async fn test_combo_line() {
        let (db, cart, _) = states().await;
        let combo = db
            .inner()
            .combos()
            .insert(&Combo::new("Combo Hot Dog", 5500))
            .await
            .unwrap();

        let response = add_combo_to_cart(&db, &cart, &combo.id, None).await.unwrap();
        assert_eq!(response.items[0].kind, ItemKind::Combo);
        assert_eq!(response.totals.total_cents, 5500);

        assert!(clear_cart(&cart).items.is_empty());
    }
}
