//! # Seed Data Generator
//!
//! Populates the database with a demo menu and a handful of promotions for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bistro.db
//! cargo run -p bistro-db --bin seed
//!
//! # Specify database path
//! cargo run -p bistro-db --bin seed -- --db ./data/bistro.db
//! ```
//!
//! ## Generated Data
//! - Menu: noodles, rice, drinks and desserts, prices in VND
//! - Promotions: one of each type, plus a coupon-only one

use std::env;

use bistro_core::{Dish, PromotionPayload};
use bistro_db::{Database, DbConfig};
use serde_json::json;
use uuid::Uuid;

/// (id, name, category, price)
const MENU: &[(&str, &str, &str, i64)] = &[
    ("pho-bo", "Phở bò", "c-noodle", 45_000),
    ("pho-ga", "Phở gà", "c-noodle", 40_000),
    ("bun-cha", "Bún chả", "c-noodle", 42_000),
    ("bun-bo-hue", "Bún bò Huế", "c-noodle", 48_000),
    ("com-tam", "Cơm tấm sườn", "c-rice", 50_000),
    ("com-ga", "Cơm gà Hội An", "c-rice", 45_000),
    ("ca-phe-sua", "Cà phê sữa đá", "c-drink", 25_000),
    ("tra-da", "Trà đá", "c-drink", 5_000),
    ("nuoc-mia", "Nước mía", "c-drink", 15_000),
    ("che-ba-mau", "Chè ba màu", "c-dessert", 20_000),
    ("banh-flan", "Bánh flan", "c-dessert", 15_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./bistro.db");

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
                println!("Bistro POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./bistro.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bistro POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.dishes().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} dishes", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Inserting menu...");
    for (id, name, category, price) in MENU {
        let dish = Dish {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price: *price,
            is_active: true,
        };
        if let Err(e) = db.dishes().insert(&dish).await {
            eprintln!("Failed to insert {}: {}", dish.id, e);
        }
    }
    println!("✓ Inserted {} dishes", db.dishes().count().await?);

    println!();
    println!("Inserting promotions...");
    let mut created = 0;
    for payload in demo_promotions() {
        let payload: PromotionPayload = serde_json::from_value(payload)?;
        let promotion = payload.into_promotion(Uuid::new_v4().to_string())?;
        match db.promotions().create(&promotion).await {
            Ok(p) => {
                created += 1;
                println!(
                    "  {} [{}]{}",
                    p.name,
                    p.promotion_type,
                    p.code.map(|c| format!(" code={}", c)).unwrap_or_default()
                );
            }
            Err(e) => eprintln!("Failed to insert {}: {}", promotion.name, e),
        }
    }
    println!("✓ Inserted {} promotions", created);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn demo_promotions() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": "10% off orders over 100k",
            "type": "order_percentage",
            "discount": { "percentage": 10 },
            "conditions": { "minOrderAmount": 100000 },
            "startDate": "2024-01-01",
            "endDate": "2030-12-31",
            "priority": 1
        }),
        json!({
            "name": "20k off, weekends",
            "type": "order_fixed",
            "discount": { "fixedAmount": 20000 },
            "conditions": {
                "minOrderAmount": 150000,
                "daysOfWeek": ["saturday", "sunday"],
                "excludeThirdParty": true
            },
            "startDate": "2024-01-01",
            "endDate": "2030-12-31"
        }),
        json!({
            "name": "Noodles 15% off",
            "type": "item_percentage",
            "discount": { "percentage": 15 },
            "applicableItems": "categories",
            "categories": ["c-noodle"],
            "startDate": "2024-01-01",
            "endDate": "2030-12-31"
        }),
        json!({
            "name": "Drinks 5k off each",
            "type": "item_fixed",
            "discount": { "fixedAmount": 5000 },
            "applicableItems": "categories",
            "categories": ["c-drink"],
            "startDate": "2024-01-01",
            "endDate": "2030-12-31"
        }),
        json!({
            "name": "Happy hour coffee 15k",
            "type": "happy_hour",
            "discountType": "uniform_price",
            "discount": { "uniformPrice": 15000 },
            "applicableItems": "specific_dishes",
            "specificDishes": ["ca-phe-sua"],
            "conditions": { "timeSlots": [{ "start": "14:00", "end": "17:00" }] },
            "startDate": "2024-01-01",
            "endDate": "2030-12-31",
            "priority": 5
        }),
        json!({
            "name": "Welcome coupon",
            "type": "order_percentage",
            "discount": { "percentage": 20 },
            "conditions": { "usageLimit": 100, "perCustomerLimit": 1 },
            "startDate": "2024-01-01",
            "endDate": "2030-12-31",
            "code": "WELCOME20"
        }),
    ]
}
