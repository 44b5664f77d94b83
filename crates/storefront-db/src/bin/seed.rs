//! # Seed Data Generator
//!
//! Populates a development database with a small marketplace.
//!
//! ## Usage
//! ```bash
//! # Seed ./storefront.db (or STOREFRONT_DATABASE_PATH)
//! cargo run -p storefront-db --bin seed
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db
//!
//! # Fewer or more buyers
//! cargo run -p storefront-db --bin seed -- --buyers 25
//! ```
//!
//! ## Generated Data
//! - One account per seller, starting at $0.00
//! - `--buyers` buyer accounts with $25.00 - $250.00
//! - Catalog products, each listed by every seller with some stock
//! - One coupon per seller for that seller's first listing, valid 30 days

use std::env;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use storefront_core::{Coupon, Money, Product};
use storefront_db::{Database, StoreConfig};

/// Sellers listing the whole catalog
const SELLERS: &[&str] = &["seller-northwind", "seller-contoso", "seller-fabrikam"];

/// Catalog: (name, price in cents)
const PRODUCTS: &[(&str, i64)] = &[
    ("Ceramic Mug", 1200),
    ("Cast Iron Skillet", 4500),
    ("Chef Knife", 8900),
    ("Linen Apron", 2600),
    ("Pour-Over Kettle", 5400),
    ("Bamboo Cutting Board", 1900),
    ("Spice Grinder", 3200),
    ("Tea Towel Set", 1500),
    ("Salad Bowl", 2800),
    ("Measuring Spoons", 800),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = StoreConfig::load()?;
    let mut buyers: usize = 10;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--buyers" | "-b" => {
                if i + 1 < args.len() {
                    buyers = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./storefront.db)");
                println!("  -b, --buyers <N>     Number of buyer accounts (default: 10)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database_path.display());
    println!("Buyers:   {}", buyers);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let now = Utc::now();

    for seller in SELLERS {
        db.accounts().open_account(seller, Money::zero()).await?;
    }
    for n in 0..buyers {
        let user_id = format!("buyer-{:03}", n + 1);
        let balance = Money::from_cents(2500 + ((n as i64 * 1_337) % 22_500));
        db.accounts().open_account(&user_id, balance).await?;
    }
    println!("✓ Opened {} accounts", SELLERS.len() + buyers);

    let mut listings = 0;
    for (idx, (name, price_cents)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .insert(&Product {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                description: None,
                price_cents: *price_cents,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        for (seller_idx, seller) in SELLERS.iter().enumerate() {
            let quantity = ((idx * 7 + seller_idx * 3) % 21) as i64;
            db.inventory().upsert(seller, &product.id, quantity).await?;
            listings += 1;
        }

        if idx < SELLERS.len() {
            let seller = SELLERS[idx];
            let code = format!("SAVE{}", 10 + idx * 5);
            db.coupons()
                .issue(&Coupon {
                    code: code.clone(),
                    product_id: product.id.clone(),
                    seller_id: seller.to_string(),
                    percent_off: 10 + (idx as u32) * 5,
                    expiration_date: now + Duration::days(30),
                    created_at: now,
                })
                .await?;
            info!(code = %code, seller_id = %seller, product = %name, "Issued coupon");
        }
    }

    println!(
        "✓ Created {} products and {} listings in {:?}",
        PRODUCTS.len(),
        listings,
        start.elapsed()
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
