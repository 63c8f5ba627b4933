//! # Seed Data Generator
//!
//! Populates the database with a demo clothing catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the demo catalog
//! cargo run -p punto-db --bin seed
//!
//! # Specify database path
//! cargo run -p punto-db --bin seed -- --db ./data/punto.db
//! ```
//!
//! ## Generated Catalog
//! - 20 garments, each in 4 sizes × 5 colors (400 variants)
//! - 5 accessories without size/color variations
//!
//! Prices are whole pesos rounded to $100. Stock counts are spread so
//! some variants start sold out, which makes the checkout stock guard
//! easy to exercise by hand.

use std::env;

use tracing_subscriber::EnvFilter;

use punto_core::types::Variant;
use punto_core::Money;
use punto_db::{Database, DbConfig, ProductRow, VariantRow};

/// Garments sold in size/color variants.
const GARMENTS: &[&str] = &[
    "Remera básica",
    "Remera estampada",
    "Camisa lisa",
    "Camisa a cuadros",
    "Chomba piqué",
    "Musculosa",
    "Buzo canguro",
    "Sweater de hilo",
    "Cardigan",
    "Blazer entallado",
    "Campera de jean",
    "Campera inflable",
    "Jean clásico",
    "Jean chupín",
    "Pantalón chino",
    "Bermuda cargo",
    "Short de baño",
    "Pollera plato",
    "Vestido corto",
    "Vestido largo",
];

/// Accessories sold without variants.
const ACCESSORIES: &[&str] = &[
    "Cinturón de cuero",
    "Gorra",
    "Bufanda",
    "Medias x3",
    "Riñonera",
];

const SIZES: &[&str] = &["S", "M", "L", "XL"];
const COLORS: &[&str] = &["Negro", "Blanco", "Gris", "Azul", "Rojo"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Database-layer logs show up under RUST_LOG=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./punto_dev.db");

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
                println!("Punto POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./punto_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Punto POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.catalog().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let start = std::time::Instant::now();
    let mut products = 0;
    let mut variants = 0;

    for (gi, name) in GARMENTS.iter().enumerate() {
        let product = ProductRow::new(*name);
        db.catalog().insert_product(&product).await?;
        products += 1;

        let price = garment_price(gi);
        for (si, size) in SIZES.iter().enumerate() {
            for (ci, color) in COLORS.iter().enumerate() {
                let variant = Variant::new(*size, *color);
                let stock = variant_stock(gi, si, ci);
                db.catalog()
                    .insert_variant(&VariantRow::new(&product.id, Some(&variant), price, stock))
                    .await?;
                variants += 1;
            }
        }
    }

    for (ai, name) in ACCESSORIES.iter().enumerate() {
        let product = ProductRow::new(*name);
        db.catalog().insert_product(&product).await?;
        products += 1;

        db.catalog()
            .insert_variant(&VariantRow::new(
                &product.id,
                None,
                accessory_price(ai),
                accessory_stock(ai),
            ))
            .await?;
        variants += 1;
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products, {} variants in {:?}",
        products, variants, elapsed
    );
    println!(
        "  Rate: {:.0} variants/second",
        variants as f64 / elapsed.as_secs_f64()
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Deterministic whole-peso price per garment, rounded to $100.
fn garment_price(seed: usize) -> Money {
    Money::from_pesos(3900 + ((seed * 17) % 80) as i64 * 100)
}

/// Accessory price, cheaper than garments.
fn accessory_price(seed: usize) -> Money {
    Money::from_pesos(1500 + ((seed * 13) % 50) as i64 * 100)
}

/// Stock spread so some variants start sold out.
fn variant_stock(gi: usize, si: usize, ci: usize) -> i64 {
    (((gi + si * 3 + ci * 5) * 7) % 31) as i64
}

fn accessory_stock(seed: usize) -> i64 {
    ((seed * 11) % 40) as i64 + 5
}
