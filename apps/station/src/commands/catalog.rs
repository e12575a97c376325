//! # Catalog Commands
//!
//! Categories, products, combos and time price tiers: the register's
//! maintenance screens.
//!
//! ```text
//! ┌──────────────┐ 1     * ┌──────────────┐ *     * ┌──────────────┐
//! │  Category    │◄────────│   Product    │◄────────│    Combo     │
//! └──────────────┘         └──────────────┘  lines  └──────────────┘
//!
//! Deleting a category with products, or a product inside a combo, fails
//! with a BUSINESS_LOGIC error. Deactivate instead.
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use kiosk_core::{Category, Combo, ComboItem, Product, TimePriceTier};

/// Default page size for product search.
const DEFAULT_SEARCH_LIMIT: i64 = 50;

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

pub async fn list_categories(db: &DbState) -> Result<Vec<Category>, ApiError> {
    Ok(db.inner().categories().list().await?)
}

pub async fn create_category(db: &DbState, input: CategoryInput) -> Result<Category, ApiError> {
    let category = Category::new(input.name.trim(), input.description);
    category.validate()?;

    let category = db.inner().categories().insert(&category).await?;
    info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(category)
}

pub async fn update_category(
    db: &DbState,
    id: &str,
    input: CategoryInput,
) -> Result<Category, ApiError> {
    let repo = db.inner().categories();
    let mut category = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    category.name = input.name.trim().to_string();
    category.description = input.description;
    category.validate()?;
    repo.update(&category).await?;

    repo.get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))
}

pub async fn delete_category(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().categories().delete(id).await?;
    info!(category_id = %id, "Category deleted");
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub price_cents: i64,
    pub category_id: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

/// Name search for the register's product picker. An empty query lists the
/// active catalog.
pub async fn search_products(
    db: &DbState,
    query: &str,
    limit: Option<i64>,
) -> Result<Vec<Product>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 500);
    debug!(query = %query, limit, "search_products command");

    Ok(db.inner().products().search(query, limit).await?)
}

/// All products, or those of one category.
pub async fn list_products(
    db: &DbState,
    category_id: Option<&str>,
) -> Result<Vec<Product>, ApiError> {
    let repo = db.inner().products();
    let products = match category_id {
        Some(category_id) => repo.list_by_category(category_id).await?,
        None => repo.list().await?,
    };
    Ok(products)
}

pub async fn get_product(db: &DbState, id: &str) -> Result<Product, ApiError> {
    db.inner()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))
}

pub async fn create_product(db: &DbState, input: ProductInput) -> Result<Product, ApiError> {
    let mut product = Product::new(input.name.trim(), input.price_cents, input.category_id);
    product.is_active = input.is_active;
    product.validate()?;

    let product = db.inner().products().insert(&product).await?;
    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok(product)
}

pub async fn update_product(
    db: &DbState,
    id: &str,
    input: ProductInput,
) -> Result<Product, ApiError> {
    let mut product = get_product(db, id).await?;

    product.name = input.name.trim().to_string();
    product.price_cents = input.price_cents;
    product.category_id = input.category_id;
    product.is_active = input.is_active;
    product.validate()?;
    db.inner().products().update(&product).await?;

    get_product(db, id).await
}

pub async fn delete_product(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().products().delete(id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(())
}

// =============================================================================
// Combos
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboLineInput {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboInput {
    pub name: String,
    pub price_cents: i64,
    #[serde(default = "active")]
    pub is_active: bool,
    pub items: Vec<ComboLineInput>,
}

/// A combo with its product lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboDetail {
    pub combo: Combo,
    pub items: Vec<ComboItem>,
}

fn combo_items(combo_id: &str, lines: &[ComboLineInput]) -> Result<Vec<ComboItem>, ApiError> {
    let items: Vec<ComboItem> = lines
        .iter()
        .map(|line| ComboItem {
            combo_id: combo_id.to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        })
        .collect();

    for item in &items {
        item.validate()?;
    }
    Ok(items)
}

pub async fn list_combos(db: &DbState) -> Result<Vec<Combo>, ApiError> {
    Ok(db.inner().combos().list().await?)
}

pub async fn get_combo(db: &DbState, id: &str) -> Result<ComboDetail, ApiError> {
    let repo = db.inner().combos();
    let combo = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Combo", id))?;
    let items = repo.get_items(id).await?;

    Ok(ComboDetail { combo, items })
}

pub async fn create_combo(db: &DbState, input: ComboInput) -> Result<ComboDetail, ApiError> {
    let mut combo = Combo::new(input.name.trim(), input.price_cents);
    combo.is_active = input.is_active;
    combo.validate()?;
    let items = combo_items(&combo.id, &input.items)?;

    let repo = db.inner().combos();
    let combo = repo.insert(&combo).await?;
    if let Err(e) = repo.set_items(&combo.id, &items).await {
        // Lines reference a missing product; leave no half-built combo.
        repo.delete(&combo.id).await?;
        return Err(e.into());
    }

    info!(combo_id = %combo.id, name = %combo.name, lines = items.len(), "Combo created");
    get_combo(db, &combo.id).await
}

pub async fn update_combo(
    db: &DbState,
    id: &str,
    input: ComboInput,
) -> Result<ComboDetail, ApiError> {
    let repo = db.inner().combos();
    let mut combo = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Combo", id))?;

    combo.name = input.name.trim().to_string();
    combo.price_cents = input.price_cents;
    combo.is_active = input.is_active;
    combo.validate()?;
    let items = combo_items(id, &input.items)?;

    repo.update(&combo).await?;
    repo.set_items(id, &items).await?;

    get_combo(db, id).await
}

pub async fn delete_combo(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().combos().delete(id).await?;
    info!(combo_id = %id, "Combo deleted");
    Ok(())
}

// =============================================================================
// Price Tiers
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTierInput {
    pub label: String,
    pub minutes: i64,
    pub price_cents: i64,
    pub display_order: i64,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Tiers for the picker (`active_only`) or the maintenance screen.
pub async fn list_price_tiers(
    db: &DbState,
    active_only: bool,
) -> Result<Vec<TimePriceTier>, ApiError> {
    let repo = db.inner().price_tiers();
    let tiers = if active_only {
        repo.list_active().await?
    } else {
        repo.list().await?
    };
    Ok(tiers)
}

pub async fn create_price_tier(
    db: &DbState,
    input: PriceTierInput,
) -> Result<TimePriceTier, ApiError> {
    let mut tier = TimePriceTier::new(
        input.label.trim(),
        input.minutes,
        input.price_cents,
        input.display_order,
    );
    tier.is_active = input.is_active;
    tier.validate()?;

    let tier = db.inner().price_tiers().insert(&tier).await?;
    info!(
        tier_id = %tier.id,
        minutes = tier.minutes,
        price_cents = tier.price_cents,
        "Price tier created"
    );
    Ok(tier)
}

pub async fn update_price_tier(
    db: &DbState,
    id: &str,
    input: PriceTierInput,
) -> Result<TimePriceTier, ApiError> {
    let repo = db.inner().price_tiers();
    let mut tier = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Price tier", id))?;

    tier.label = input.label.trim().to_string();
    tier.minutes = input.minutes;
    tier.price_cents = input.price_cents;
    tier.display_order = input.display_order;
    tier.is_active = input.is_active;
    tier.validate()?;
    repo.update(&tier).await?;

    repo.get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Price tier", id))
}

/// Deletes a tier. Tiers that sessions were prepaid with cannot be deleted;
/// set `is_active = false` to retire them.
pub async fn delete_price_tier(db: &DbState, id: &str) -> Result<(), ApiError> {
    db.inner().price_tiers().delete(id).await?;
    info!(tier_id = %id, "Price tier deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{product, states};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_category_crud() {
        let (db, _, _) = states().await;

        let created = create_category(
            &db,
            CategoryInput {
                name: "  Bebidas ".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(created.name, "Bebidas");

        let updated = update_category(
            &db,
            &created.id,
            CategoryInput {
                name: "Bebidas frías".to_string(),
                description: Some("Refrigerador".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Bebidas frías");
        assert_eq!(list_categories(&db).await.unwrap(), vec![updated.clone()]);

        delete_category(&db, &created.id).await.unwrap();
        let err = delete_category(&db, &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (db, _, _) = states().await;

        let err = create_category(
            &db,
            CategoryInput {
                name: "   ".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(list_categories(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_in_use() {
        let (db, _, _) = states().await;
        let snacks = create_category(
            &db,
            CategoryInput {
                name: "Snacks".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        create_product(
            &db,
            ProductInput {
                name: "Palomitas".to_string(),
                price_cents: 3000,
                category_id: Some(snacks.id.clone()),
                is_active: true,
            },
        )
        .await
        .unwrap();

        let err = delete_category(&db, &snacks.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let listed = list_products(&db, Some(&snacks.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_product_update_and_search() {
        let (db, _, _) = states().await;
        let created = create_product(
            &db,
            ProductInput {
                name: "Jugo de naranja".to_string(),
                price_cents: 2500,
                category_id: None,
                is_active: true,
            },
        )
        .await
        .unwrap();

        let updated = update_product(
            &db,
            &created.id,
            ProductInput {
                name: "Jugo de naranja 500ml".to_string(),
                price_cents: 2800,
                category_id: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.price_cents, 2800);

        let hits = search_products(&db, "naranja", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, created.id);

        let err = create_product(
            &db,
            ProductInput {
                name: "Agua".to_string(),
                price_cents: -1,
                category_id: None,
                is_active: true,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        delete_product(&db, &created.id).await.unwrap();
        assert_eq!(
            get_product(&db, &created.id).await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_combo_with_lines() {
        let (db, _, _) = states().await;
        let palomitas = product(&db, "Palomitas", 3000).await;
        let refresco = product(&db, "Refresco", 2200).await;

        let detail = create_combo(
            &db,
            ComboInput {
                name: "Combo Fiesta".to_string(),
                price_cents: 5000,
                is_active: true,
                items: vec![
                    ComboLineInput {
                        product_id: palomitas.id.clone(),
                        quantity: 1,
                    },
                    ComboLineInput {
                        product_id: refresco.id.clone(),
                        quantity: 2,
                    },
                ],
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.items.len(), 2);

        let updated = update_combo(
            &db,
            &detail.combo.id,
            ComboInput {
                name: "Combo Fiesta".to_string(),
                price_cents: 4800,
                is_active: true,
                items: vec![ComboLineInput {
                    product_id: palomitas.id.clone(),
                    quantity: 2,
                }],
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.combo.price_cents, 4800);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].quantity, 2);

        // Still referenced by the combo
        let err = delete_product(&db, &palomitas.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        delete_combo(&db, &detail.combo.id).await.unwrap();
        delete_product(&db, &palomitas.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_combo_with_unknown_product_is_not_kept() {
        let (db, _, _) = states().await;

        let err = create_combo(
            &db,
            ComboInput {
                name: "Combo Fantasma".to_string(),
                price_cents: 5000,
                is_active: true,
                items: vec![ComboLineInput {
                    product_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert!(list_combos(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_price_tiers() {
        let (db, _, _) = states().await;

        let hour = create_price_tier(
            &db,
            PriceTierInput {
                label: "1 hora".to_string(),
                minutes: 60,
                price_cents: 8000,
                display_order: 2,
                is_active: true,
            },
        )
        .await
        .unwrap();
        create_price_tier(
            &db,
            PriceTierInput {
                label: "30 min".to_string(),
                minutes: 30,
                price_cents: 5000,
                display_order: 1,
                is_active: true,
            },
        )
        .await
        .unwrap();

        let err = create_price_tier(
            &db,
            PriceTierInput {
                label: "Día".to_string(),
                minutes: 2000,
                price_cents: 30000,
                display_order: 3,
                is_active: true,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        update_price_tier(
            &db,
            &hour.id,
            PriceTierInput {
                label: "1 hora".to_string(),
                minutes: 60,
                price_cents: 8000,
                display_order: 2,
                is_active: false,
            },
        )
        .await
        .unwrap();

        let active = list_price_tiers(&db, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].label, "30 min");
        assert_eq!(list_price_tiers(&db, false).await.unwrap().len(), 2);

        delete_price_tier(&db, &hour.id).await.unwrap();
    }
}
