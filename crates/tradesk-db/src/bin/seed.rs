//! # Seed Ledger Generator
//!
//! Populates a database with a small demo ledger for development and prints
//! the report projections as JSON.
//!
//! ## Usage
//! ```bash
//! # Use TRADESK_DB_PATH (default ./tradesk.db)
//! cargo run -p tradesk-db --bin seed
//!
//! # Specify database path
//! cargo run -p tradesk-db --bin seed -- --db ./data/tradesk.db
//!
//! # More logging
//! RUST_LOG=tradesk=debug,sqlx=info cargo run -p tradesk-db --bin seed
//! ```
//!
//! ## Generated Ledger
//! - Two raw-material purchases (one part-paid)
//! - A built product (recipe of cotton and thread plus stitching)
//! - A manually priced product
//! - An order with an under-priced line and a follow-up payment
//! - A returned order with a partial refund payback

use std::env;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tradesk_core::inventory::NewProduct;
use tradesk_core::ledger::{NewPurchase, PaymentRequest};
use tradesk_core::order::{NewOrder, NewOrderLine, RefundRequest, ReturnRequest};
use tradesk_core::validation::parse_date;
use tradesk_core::{
    Charge, Composition, DateRange, Ingredient, Money, ParentType, Quantity, TenantId,
    DEFAULT_TENANT_ID,
};
use tradesk_db::{Database, DbConfig};

type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

fn purchase(
    date: &str,
    supplier: &str,
    item: &str,
    qty: &str,
    unit: &str,
    unit_cost: &str,
    paid_now: &str,
) -> SeedResult<NewPurchase> {
    Ok(NewPurchase {
        date: parse_date(date)?,
        supplier_name: supplier.to_string(),
        item: item.to_string(),
        qty: qty.parse()?,
        unit: unit.to_string(),
        unit_cost: unit_cost.parse()?,
        paid_now: paid_now.parse()?,
        low_stock_threshold: Quantity::from_units(5),
        notes: None,
        image_ref: None,
    })
}

fn line(product_id: &str, qty: i64, unit_price: i64) -> NewOrderLine {
    NewOrderLine {
        product_id: Some(product_id.to_string()),
        product_name: String::new(),
        qty: Quantity::from_units(qty),
        unit: String::new(),
        unit_price: Money::from_rupees(unit_price),
    }
}

fn print_json<T: Serialize>(title: &str, value: &T) -> SeedResult<()> {
    println!();
    println!("── {} ──", title);
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> SeedResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tradesk=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config = DbConfig::new(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("TradDesk Seed Ledger Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $TRADESK_DB_PATH or ./tradesk.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(config).await?;
    let tenant = TenantId::new(DEFAULT_TENANT_ID);

    if !db.purchases().list(&tenant, DateRange::all()).await?.is_empty() {
        println!("⚠ Database already has a ledger for tenant {}", tenant);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Raw materials
    db.purchases()
        .record(
            &tenant,
            purchase("2026-01-08", "Sharma Textiles", "Cotton", "20", "m", "120", "1000")?,
        )
        .await?;
    db.purchases()
        .record(
            &tenant,
            purchase("2026-01-12", "Gupta & Sons", "Thread", "50", "spool", "15", "0")?,
        )
        .await?;

    // Products
    let kurta = db
        .products()
        .record(
            &tenant,
            NewProduct {
                name: "Cotton Kurta".to_string(),
                unit: "pcs".to_string(),
                composition: Composition::Built {
                    ingredients: vec![
                        Ingredient {
                            item: "Cotton".to_string(),
                            qty: "2.5".parse()?,
                            unit: "m".to_string(),
                            unit_cost: Money::from_rupees(120),
                        },
                        Ingredient {
                            item: "Thread".to_string(),
                            qty: Quantity::from_units(1),
                            unit: "spool".to_string(),
                            unit_cost: Money::from_rupees(15),
                        },
                    ],
                    charges: vec![Charge {
                        label: "Stitching".to_string(),
                        amount: Money::from_rupees(150),
                    }],
                },
                initial_qty: Quantity::from_units(4),
                image_ref: None,
            },
        )
        .await?;
    let dupatta = db
        .products()
        .record(
            &tenant,
            NewProduct {
                name: "Silk Dupatta".to_string(),
                unit: "pcs".to_string(),
                composition: Composition::Manual {
                    price: Money::from_rupees(350),
                },
                initial_qty: Quantity::from_units(10),
                image_ref: None,
            },
        )
        .await?;

    // An order, then a follow-up payment
    let receipt = db
        .sales()
        .create_order(
            &tenant,
            NewOrder {
                date: parse_date("2026-02-03")?,
                customer_name: "Meena Iyer".to_string(),
                customer_phone: Some("98450 12345".to_string()),
                customer_addr: None,
                lines: vec![line(&kurta.id, 2, 650), line(&dupatta.id, 1, 300)],
                paid_now: Money::from_rupees(500),
                notes: None,
            },
        )
        .await?;
    db.payments()
        .apply(
            &tenant,
            PaymentRequest {
                parent_type: ParentType::Sale,
                parent_id: receipt.sale.id.clone(),
                amount: Money::from_rupees(600),
                date: parse_date("2026-02-20")?,
                notes: Some("UPI".to_string()),
            },
        )
        .await?;

    // A returned order with part of the refund paid back
    let returned = db
        .sales()
        .create_order(
            &tenant,
            NewOrder {
                date: parse_date("2026-03-02")?,
                customer_name: "Arjun Rao".to_string(),
                customer_phone: None,
                customer_addr: None,
                lines: vec![line(&dupatta.id, 2, 350)],
                paid_now: Money::from_rupees(700),
                notes: None,
            },
        )
        .await?
        .sale;
    db.sales()
        .return_order(
            &tenant,
            &returned.id,
            ReturnRequest {
                date: parse_date("2026-03-05")?,
                notes: Some("colour mismatch".to_string()),
                collected_override: None,
                owe_override: None,
            },
        )
        .await?;
    db.sales()
        .record_refund_payback(
            &tenant,
            &returned.id,
            RefundRequest {
                amount: Money::from_rupees(400),
                date: parse_date("2026-03-06")?,
                notes: None,
            },
        )
        .await?;

    info!(tenant = %tenant, warnings = receipt.warnings.len(), "Seed ledger written");

    let reports = db.reports();
    print_json("Summary", &reports.summary(&tenant).await?)?;
    print_json("Monthly", &reports.monthly(&tenant).await?)?;
    print_json("Dues", &reports.dues(&tenant).await?)?;
    print_json("Raw materials", &reports.inventory(&tenant).await?)?;
    print_json("Products", &reports.product_stock(&tenant).await?)?;
    print_json("Refunds owed", &reports.refunds_owed(&tenant).await?)?;

    db.close().await;
    Ok(())
}
