//! # Seed Data Generator
//!
//! Populates the database with test catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 items (default)
//! cargo run -p bazaar-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p bazaar-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db
//! ```
//!
//! ## Generated Data
//! Creates realistic marketplace data:
//! - Items across categories (shoes, apparel, bags, accessories) with
//!   subcategories, brands, prices, and free-form features
//! - Delivery options (standard, express, pickup)
//! - Discount codes spanning every scope shape: unrestricted, brand-only,
//!   category/subcategory, and item-id restricted

use chrono::Utc;
use rust_decimal::Decimal;
use std::env;
use uuid::Uuid;

use bazaar_core::{DeliveryOption, Discount, Item, Money};
use bazaar_db::{Database, DbConfig};

/// Catalog shape: (category, subcategories, item names).
const CATEGORIES: &[(&str, &[&str], &[&str])] = &[
    (
        "shoes",
        &["boots", "sneakers", "sandals"],
        &[
            "Trail Boot",
            "City Sneaker",
            "Canvas Low-Top",
            "Desert Chukka",
            "Rain Boot",
            "Slide Sandal",
            "Running Shoe",
            "Court Classic",
            "Hiking Mid",
            "Leather Loafer",
        ],
    ),
    (
        "apparel",
        &["jackets", "shirts", "trousers"],
        &[
            "Down Jacket",
            "Rain Shell",
            "Oxford Shirt",
            "Flannel Shirt",
            "Chino Trouser",
            "Cargo Pant",
            "Denim Jacket",
            "Linen Shirt",
            "Fleece Pullover",
            "Track Pant",
        ],
    ),
    (
        "bags",
        &["backpacks", "totes", "duffels"],
        &[
            "Commuter Backpack",
            "Canvas Tote",
            "Weekend Duffel",
            "Roll-Top Pack",
            "Laptop Sleeve",
            "Gym Duffel",
            "Market Tote",
            "Day Pack",
            "Travel Duffel",
            "Sling Bag",
        ],
    ),
    (
        "accessories",
        &["hats", "belts", "scarves"],
        &[
            "Wool Beanie",
            "Baseball Cap",
            "Leather Belt",
            "Woven Belt",
            "Wool Scarf",
            "Silk Scarf",
            "Bucket Hat",
            "Canvas Belt",
            "Knit Scarf",
            "Trucker Cap",
        ],
    ),
];

const BRANDS: &[&str] = &["Acme", "Northwind", "Contoso", "Fabrikam", "Tailspin"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Items: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing items
    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Delivery options
    println!();
    println!("Seeding delivery options...");
    for (name, price) in [("Standard", "10.00"), ("Express", "24.50"), ("Pickup", "0.00")] {
        let option = DeliveryOption {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price: Money::new(price.parse::<Decimal>()?),
        };
        db.delivery_options().insert(&option).await?;
        println!("  {} ({})", option.name, option.price);
    }

    // Items
    println!();
    println!("Generating items...");

    let mut generated = 0;
    let mut first_item_ids: Vec<String> = Vec::new();
    let start = std::time::Instant::now();

    'outer: loop {
        for (category_idx, (category, subcategories, names)) in CATEGORIES.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated + category_idx * 31 + name_idx * 7;
                let item = generate_item(category, subcategories, name, seed, generated / 40);

                if first_item_ids.len() < 3 {
                    first_item_ids.push(item.id.clone());
                }

                if let Err(e) = db.items().insert(&item).await {
                    eprintln!("Failed to insert {}: {}", item.name, e);
                    continue;
                }

                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} items...", generated);
                }
            }
        }

        if generated >= count {
            break;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    // Discounts, one per scope shape
    println!();
    println!("Seeding discounts...");

    let discounts = [
        Discount {
            code: "WELCOME5".to_string(),
            percentage: Decimal::from(5),
            ..Discount::default()
        },
        Discount {
            code: "ACME10".to_string(),
            percentage: Decimal::from(10),
            brands: vec!["Acme".to_string()],
            ..Discount::default()
        },
        Discount {
            code: "BOOTS15".to_string(),
            percentage: Decimal::from(15),
            categories: [("shoes".to_string(), vec!["boots".to_string()])]
                .into_iter()
                .collect(),
            ..Discount::default()
        },
        Discount {
            code: "PICKED20".to_string(),
            percentage: Decimal::from(20),
            item_ids: first_item_ids,
            ..Discount::default()
        },
    ];

    for discount in &discounts {
        db.discounts().insert(discount).await?;
        println!("  {} ({}% off)", discount.code, discount.percentage);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single item with realistic data.
fn generate_item(
    category: &str,
    subcategories: &[&str],
    name: &str,
    seed: usize,
    batch: usize,
) -> Item {
    let now = Utc::now();

    // Price: 4.99 - 199.99, with a spread of odd cents.
    let cents = 499 + ((seed * 731) % 19500) as i64;
    let price = Money::new(Decimal::new(cents, 2));

    // One or two subcategories per item.
    let mut subs = vec![subcategories[seed % subcategories.len()].to_string()];
    if seed % 3 == 0 {
        let second = subcategories[(seed + 1) % subcategories.len()];
        if !subs.iter().any(|s| s == second) {
            subs.push(second.to_string());
        }
    }

    // Most items are branded; every seventh is not.
    let brand = if seed % 7 == 0 {
        None
    } else {
        Some(BRANDS[seed % BRANDS.len()].to_string())
    };

    let display_name = if batch == 0 {
        name.to_string()
    } else {
        format!("{} (v{})", name, batch + 1)
    };

    Item {
        id: Uuid::new_v4().to_string(),
        name: display_name,
        category: category.to_string(),
        subcategories: subs,
        brand,
        price,
        description: Some(format!("A dependable {} for everyday use.", name.to_lowercase())),
        features: Some(serde_json::json!({
            "color": (["black", "navy", "olive", "sand"][seed % 4]),
            "weight_grams": 150 + (seed % 900),
        })),
        stock: (seed % 50) as i64,
        created_at: now,
        updated_at: now,
    }
}
