//! # Seed Data Generator
//!
//! Populates a development database with a play-area catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p kiosk-db --bin seed
//! cargo run -p kiosk-db --bin seed -- --db ./data/kiosk.db
//! ```
//!
//! Creates categories with products, two combos and the usual time tiers
//! (30 min, 1 hora, 2 horas, 3 horas).

use std::env;

use kiosk_core::{Category, Combo, ComboItem, Product, TimePriceTier};
use kiosk_db::{Database, DbConfig};

/// Category name → (product, price in cents)
const CATALOG: &[(&str, &[(&str, i64)])] = &[
    (
        "Bebidas",
        &[
            ("Agua natural", 1500),
            ("Jugo de naranja", 2500),
            ("Jugo de manzana", 2500),
            ("Refresco", 2200),
            ("Malteada", 4500),
            ("Café americano", 3000),
        ],
    ),
    (
        "Snacks",
        &[
            ("Palomitas", 3000),
            ("Papas fritas", 2000),
            ("Nachos con queso", 4000),
            ("Gomitas", 1500),
            ("Galletas", 1800),
        ],
    ),
    (
        "Comida",
        &[
            ("Hot dog", 3500),
            ("Sándwich", 4500),
            ("Pizza individual", 6000),
            ("Quesadilla", 3800),
        ],
    ),
    (
        "Accesorios",
        &[("Calcetines antiderrapantes", 4000), ("Pulsera NFC", 5000)],
    ),
];

/// (label, minutes, price in cents)
const TIERS: &[(&str, i64, i64)] = &[
    ("30 min", 30, 5000),
    ("1 hora", 60, 8000),
    ("2 horas", 120, 14000),
    ("3 horas", 180, 19000),
];

/// Combo name → (price, [(product, quantity)])
const COMBOS: &[(&str, i64, &[(&str, i64)])] = &[
    ("Combo Fiesta", 5000, &[("Palomitas", 1), ("Refresco", 1)]),
    ("Combo Hot Dog", 5500, &[("Hot dog", 1), ("Jugo de naranja", 1)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kiosk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kiosk POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kiosk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kiosk POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut products: Vec<Product> = Vec::new();
    for (category_name, items) in CATALOG {
        let category = db.categories().insert(&Category::new(*category_name, None)).await?;
        for (name, price_cents) in items.iter() {
            let product = Product::new(*name, *price_cents, Some(category.id.clone()));
            products.push(db.products().insert(&product).await?);
        }
        println!("  {}: {} products", category.name, items.len());
    }

    for (name, price_cents, lines) in COMBOS {
        let combo = db.combos().insert(&Combo::new(*name, *price_cents)).await?;
        let items: Vec<ComboItem> = lines
            .iter()
            .filter_map(|(product_name, quantity)| {
                products
                    .iter()
                    .find(|p| p.name == *product_name)
                    .map(|p| ComboItem {
                        combo_id: combo.id.clone(),
                        product_id: p.id.clone(),
                        quantity: *quantity,
                    })
            })
            .collect();
        db.combos().set_items(&combo.id, &items).await?;
        println!("  {}: {} lines", combo.name, items.len());
    }

    for (order, (label, minutes, price_cents)) in TIERS.iter().enumerate() {
        let tier = TimePriceTier::new(*label, *minutes, *price_cents, order as i64 + 1);
        db.price_tiers().insert(&tier).await?;
    }
    println!("  {} time tiers", TIERS.len());

    println!();
    let hits = db.products().search("jugo", 10).await?;
    println!("  Search 'jugo': {} results", hits.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
