//! # Cart State
//!
//! The counter sale being rung up: products and combos with their prices
//! frozen when added.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register Action         Command                   Cart Change          │
//! │  ───────────────         ───────                   ───────────          │
//! │  Tap product ──────────► add_product_to_cart() ──► push / qty += n      │
//! │  Tap combo ────────────► add_combo_to_cart() ────► push / qty += n      │
//! │  Change quantity ──────► update_cart_item() ─────► qty = n (0 removes)  │
//! │  Remove ───────────────► remove_from_cart() ─────► retain               │
//! │  Cobrar / Pendiente ───► create_sale() ──────────► remove_sold          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time charges never go through the cart: they land on the session's
//! pending sale at check-out.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kiosk_core::ticket::SaleTotals;
use kiosk_core::validation::validate_quantity;
use kiosk_core::{Combo, ItemKind, Product, ValidationError, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};
use kiosk_db::TabEntry;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Item {0} is not in the cart")]
    NotInCart(String),

    #[error("Cart cannot have more than {max} items")]
    TooManyLines { max: usize },

    #[error("Quantity would exceed maximum of {max}")]
    QuantityTooLarge { max: i64 },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// `Product` or `Combo`
    pub kind: ItemKind,

    /// Product or combo id; unique within the cart
    pub reference_id: String,

    /// Name at time of adding (frozen)
    pub name: String,

    /// Price in cents at time of adding (frozen)
    pub unit_price_cents: i64,

    pub quantity: i64,

    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            kind: ItemKind::Product,
            reference_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    pub fn from_combo(combo: &Combo, quantity: i64) -> Self {
        CartItem {
            kind: ItemKind::Combo,
            reference_id: combo.id.clone(),
            name: combo.name.clone(),
            unit_price_cents: combo.price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    pub fn to_entry(&self) -> TabEntry {
        TabEntry::new(
            self.kind,
            Some(self.reference_id.clone()),
            self.name.clone(),
            self.unit_price_cents,
            self.quantity,
        )
    }
}

/// The cart.
///
/// ## Invariants
/// - Lines are unique by `reference_id` (adding again increases quantity)
/// - Quantity is 1..=999 per line
/// - At most 100 lines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_product(&mut self, product: &Product, quantity: i64) -> Result<(), CartError> {
        self.add_line(CartItem::from_product(product, quantity))
    }

    pub fn add_combo(&mut self, combo: &Combo, quantity: i64) -> Result<(), CartError> {
        self.add_line(CartItem::from_combo(combo, quantity))
    }

    fn add_line(&mut self, line: CartItem) -> Result<(), CartError> {
        validate_quantity(line.quantity)?;

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.reference_id == line.reference_id)
        {
            let new_qty = item.quantity + line.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CartError::QuantityTooLarge {
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CartError::TooManyLines {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(line);
        Ok(())
    }

    /// Sets the quantity of a line; 0 removes it.
    pub fn update_quantity(&mut self, reference_id: &str, quantity: i64) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(reference_id);
        }
        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.reference_id == reference_id)
            .ok_or_else(|| CartError::NotInCart(reference_id.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, reference_id: &str) -> Result<(), CartError> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.reference_id != reference_id);

        if self.items.len() == initial_len {
            Err(CartError::NotInCart(reference_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Takes what was rung up off the cart.
    ///
    /// Lines added, or quantities raised, after `sold` was copied stay in
    /// the cart.
    pub fn remove_sold(&mut self, sold: &[TabEntry]) {
        for entry in sold {
            let Some(reference_id) = entry.reference_id.as_deref() else {
                continue;
            };
            if let Some(item) = self
                .items
                .iter_mut()
                .find(|i| i.kind == entry.kind && i.reference_id == reference_id)
            {
                item.quantity -= entry.quantity;
            }
        }
        self.items.retain(|i| i.quantity > 0);
        if self.items.is_empty() {
            self.created_at = Utc::now();
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn totals(&self) -> SaleTotals {
        let subtotal = self.items.iter().map(CartItem::line_total_cents).sum();
        SaleTotals::from_subtotal(subtotal, 0)
    }

    /// Lines as they will be written on the sale.
    pub fn to_entries(&self) -> Vec<TabEntry> {
        self.items.iter().map(CartItem::to_entry).collect()
    }
}

/// Shared cart for the station's commands.
///
/// `Arc<Mutex<Cart>>`: commands may run concurrently, but only one of them
/// touches the cart at a time. The lock is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Runs `f` with write access to the cart.
    ///
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add_product(&product, 1))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let jugo = Product::new("Jugo de naranja", 2500, None);

        cart.add_product(&jugo, 2).unwrap();
        cart.add_product(&jugo, 1).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.totals().subtotal_cents, 7500);
        assert_eq!(cart.totals().total_cents, 7500);
    }

    #[test]
    fn test_products_and_combos() {
        let mut cart = Cart::new();
        cart.add_product(&Product::new("Palomitas", 3000, None), 1)
            .unwrap();
        cart.add_combo(&Combo::new("Combo Fiesta", 5000), 2).unwrap();

        let entries = cart.to_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, ItemKind::Combo);
        assert_eq!(entries[1].quantity, 2);
        assert_eq!(cart.totals().subtotal_cents, 13000);
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        let gomitas = Product::new("Gomitas", 1500, None);

        assert!(matches!(
            cart.add_product(&gomitas, 0),
            Err(CartError::Invalid(_))
        ));

        cart.add_product(&gomitas, 998).unwrap();
        assert!(matches!(
            cart.add_product(&gomitas, 2),
            Err(CartError::QuantityTooLarge { max: 999 })
        ));
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new();
        let refresco = Product::new("Refresco", 2200, None);
        cart.add_product(&refresco, 1).unwrap();

        cart.update_quantity(&refresco.id, 4).unwrap();
        assert_eq!(cart.total_quantity(), 4);

        cart.update_quantity(&refresco.id, 0).unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            cart.remove_item(&refresco.id),
            Err(CartError::NotInCart(_))
        ));
    }

    #[test]
    fn test_remove_sold_keeps_later_additions() {
        let mut cart = Cart::new();
        let jugo = Product::new("Jugo de naranja", 2500, None);
        let nachos = Product::new("Nachos con queso", 8000, None);
        cart.add_product(&jugo, 2).unwrap();
        let sold = cart.to_entries();

        // Rung up at another screen while the sale was being written
        cart.add_product(&jugo, 1).unwrap();
        cart.add_product(&nachos, 1).unwrap();
        cart.remove_sold(&sold);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].reference_id, jugo.id);
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.items[1].reference_id, nachos.id);

        let sold = cart.to_entries();
        cart.remove_sold(&sold);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_state_shared() {
        let state = CartState::new();
        let other = state.clone();

        state
            .with_cart_mut(|c| c.add_product(&Product::new("Galletas", 1800, None), 1))
            .unwrap();

        assert_eq!(other.with_cart(|c| c.total_quantity()), 1);
        other.with_cart_mut(|c| c.clear());
        assert!(state.with_cart(Cart::is_empty));
    }
}
