//! # Seed Data Generator
//!
//! Populates the database with demo catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p warung-db --bin seed
//!
//! # Specify database path
//! cargo run -p warung-db --bin seed -- --db ./data/warung.db
//!
//! # Also commit a few demo sales
//! cargo run -p warung-db --bin seed -- --with-sales
//! ```
//!
//! Products are typical warung stock: drinks, instant noodles, snacks,
//! toiletries, and phone credit, priced in rupiah-style whole amounts.

use std::env;

use warung_core::reporting::Page;
use warung_core::types::RequestedItem;
use warung_db::{CheckoutRequest, Database, DbConfig, ProductInput, StatusFilter};

/// Demo catalog: (name, category, price_cents, stock)
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("Teh Botol Sosro 350ml", "Drinks", 4000_00, 48),
    ("Aqua 600ml", "Drinks", 3500_00, 60),
    ("Kopi Kapal Api Sachet", "Drinks", 1500_00, 120),
    ("Es Teh Manis", "Drinks", 3000_00, 30),
    ("Indomie Goreng", "Instant Noodles", 3200_00, 96),
    ("Indomie Soto", "Instant Noodles", 3000_00, 72),
    ("Mie Sedaap Ayam Bawang", "Instant Noodles", 2900_00, 40),
    ("Chitato Sapi Panggang", "Snacks", 10500_00, 24),
    ("Taro Net Seaweed", "Snacks", 2000_00, 36),
    ("Roti Sari Roti Cokelat", "Snacks", 5500_00, 12),
    ("Sabun Lifebuoy 85g", "Toiletries", 4500_00, 20),
    ("Pasta Gigi Pepsodent 75g", "Toiletries", 8000_00, 15),
    ("Shampo Sachet Clear", "Toiletries", 1000_00, 80),
    ("Pulsa Telkomsel 10K", "Phone Credit", 12000_00, 50),
    ("Pulsa XL 25K", "Phone Credit", 27000_00, 50),
    ("Gas 3kg Refill", "", 22000_00, 8),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./warung_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-sales" | "-s" => {
                with_sales = true;
            }
            "--help" | "-h" => {
                println!("Warung POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./warung_dev.db)");
                println!("  -s, --with-sales   Also commit a few demo sales");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Warung POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db
        .catalog()
        .list(None, None, StatusFilter::All, Page::clamp(1, 1))
        .await?;
    if existing.total > 0 {
        println!("⚠ Database already has {} products", existing.total);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let mut ids = Vec::with_capacity(PRODUCTS.len());
    for (name, category, price_cents, stock) in PRODUCTS {
        let category = if category.is_empty() {
            None
        } else {
            Some((*category).to_string())
        };

        let product = db
            .catalog()
            .create(ProductInput {
                name: (*name).to_string(),
                category,
                price_cents: *price_cents,
                stock: *stock,
            })
            .await?;
        ids.push(product.id);
    }

    println!("✓ Created {} products", ids.len());

    if with_sales {
        println!();
        println!("Committing demo sales...");

        let demo_sales: &[(&[(usize, i64)], &str, Option<i64>)] = &[
            (&[(0, 2), (4, 3)], "cash", Some(20000_00)),
            (&[(13, 1)], "qris", None),
            (&[(1, 1), (8, 2), (12, 4)], "cash", Some(15000_00)),
        ];

        for (lines, method, cash) in demo_sales {
            let request = CheckoutRequest {
                items: lines
                    .iter()
                    .map(|(idx, quantity)| RequestedItem {
                        product_id: ids[*idx].clone(),
                        quantity: *quantity,
                    })
                    .collect(),
                payment_method: Some((*method).to_string()),
                cash_received_cents: *cash,
                payment_ref: None,
                created_by_user: "seed".to_string(),
                created_by_role: "Admin".to_string(),
            };

            let committed = db.checkout().commit_sale(&request).await?;
            println!(
                "  Sale {}: total {} via {}",
                committed.sale.id,
                committed.sale.total(),
                committed.sale.payment_method.as_str()
            );
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
