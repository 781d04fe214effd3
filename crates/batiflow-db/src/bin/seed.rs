//! # Seed Data Generator
//!
//! Populates the database with sample quotes and invoices for development.
//!
//! ## Usage
//! ```bash
//! # Generate 10 quotes (default), database from billing.toml
//! cargo run -p batiflow-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p batiflow-db --bin seed -- --count 25
//!
//! # Specify database path
//! cargo run -p batiflow-db --bin seed -- --db ./data/batiflow.db
//! ```
//!
//! ## Generated Documents
//! Each quote gets one section per trade with labor and material lines.
//! Every third quote is signed, billed a deposit, then billed its balance;
//! the balance invoice of every sixth quote is marked paid.

use batiflow_core::{
    format_currency, revenue_summary, ConversionMode, DocumentStatus, DocumentType,
    InvoiceStatus, LineItem, Nature, Section, Signature,
};
use batiflow_db::{BillingConfig, Database};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Trades with (description, unit, unit price, nature) lines.
const TRADES: &[(&str, &[(&str, &str, f64, Nature)])] = &[
    (
        "Démolition",
        &[
            ("Dépose de cloisons", "m²", 18.0, Nature::Labor),
            ("Évacuation des gravats", "forfait", 350.0, Nature::Labor),
            ("Location benne 10 m³", "u", 290.0, Nature::Material),
        ],
    ),
    (
        "Plomberie",
        &[
            ("Pose receveur de douche", "u", 240.0, Nature::Labor),
            ("Receveur extra-plat 90x120", "u", 315.0, Nature::Material),
            ("Alimentation PER", "ml", 12.5, Nature::Material),
        ],
    ),
    (
        "Électricité",
        &[
            ("Mise en conformité tableau", "forfait", 680.0, Nature::Labor),
            ("Prise 16A encastrée", "u", 14.9, Nature::Material),
            ("Tirage de câbles", "ml", 6.0, Nature::Labor),
        ],
    ),
    (
        "Peinture",
        &[
            ("Préparation des supports", "m²", 9.0, Nature::Labor),
            ("Peinture acrylique mate", "m²", 21.0, Nature::Labor),
            ("Sous-couche", "l", 7.5, Nature::Material),
        ],
    ),
];

const CLIENTS: &[(&str, &str)] = &[
    ("M. et Mme Lefèvre", "12 rue des Tilleuls, 69003 Lyon"),
    ("SCI Les Marronniers", "4 allée des Marronniers, 33000 Bordeaux"),
    ("Mme Garnier", "27 avenue Jean Jaurès, 31000 Toulouse"),
    ("SARL Duval Rénovation", "3 impasse des Vignes, 11100 Narbonne"),
    ("M. Benali", "58 boulevard Voltaire, 75011 Paris"),
];

/// VAT rates a renovation quote typically mixes.
const VAT_RATES: &[f64] = &[20.0, 10.0, 5.5];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,batiflow=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 10;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("BatiFlow Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of quotes to generate (default: 10)");
                println!("  -d, --db <PATH>      Database file path (default: from billing.toml)");
                println!("      --config <PATH>  Configuration file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = BillingConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }

    println!("BatiFlow Seed Data Generator");
    println!("============================");
    println!("Database:  {}", config.database_path().display());
    println!("Numbering: {}", config.billing.numbering);
    println!("Quotes:    {}", count);
    println!();

    let db = Database::new(config.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.documents().list_by_type(DocumentType::Quote).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} quotes", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating documents...");
    let start = std::time::Instant::now();

    for seed in 0..count {
        let repo = db.documents();
        let mut quote = repo.create_draft(DocumentType::Quote).await?;
        let (client, address) = CLIENTS[seed % CLIENTS.len()];
        quote.client_name = client.to_string();
        quote.project_address = address.to_string();
        quote.sections = generate_sections(seed);
        repo.save(&mut quote).await?;

        println!(
            "  {}  {:<24} {}",
            quote.number,
            quote.client_name,
            format_currency(quote.total)
        );

        match seed % 3 {
            0 => {
                repo.sign(&quote.id, Signature::captured_now(format!("signatures/{}.png", quote.number)))
                    .await?;

                let deposit = db.conversions().convert(&quote.id, ConversionMode::Deposit).await?;
                let balance = db.conversions().convert(&quote.id, ConversionMode::Final).await?;
                println!(
                    "    → {} deposit {}, {} balance {}",
                    deposit.number,
                    format_currency(deposit.total),
                    balance.number,
                    format_currency(balance.total)
                );

                if seed % 6 == 0 {
                    repo.mark_sent(&deposit.id).await?;
                    repo.update_status(&deposit.id, DocumentStatus::Invoice(InvoiceStatus::Paid))
                        .await?;
                    repo.mark_sent(&balance.id).await?;
                    repo.update_status(&balance.id, DocumentStatus::Invoice(InvoiceStatus::Paid))
                        .await?;
                }
            }
            1 => {
                repo.mark_sent(&quote.id).await?;
            }
            _ => {}
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} quotes in {:?}", count, elapsed);

    let invoices = db.documents().list_by_type(DocumentType::Invoice).await?;
    let quotes = db.documents().list_by_type(DocumentType::Quote).await?;
    let summary = revenue_summary(&invoices, &quotes);

    println!();
    println!("Dashboard:");
    println!("  Revenue:        {}", format_currency(summary.revenue));
    println!("    Labor:        {}", format_currency(summary.revenue_labor));
    println!("    Material:     {}", format_currency(summary.revenue_material));
    println!("  Invoices:       {}", summary.invoice_count);
    println!("  Pending quotes: {}", summary.pending_quotes);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds two or three trade sections with quantities varying by seed.
fn generate_sections(seed: usize) -> Vec<Section> {
    let trade_count = 2 + seed % 2;

    (0..trade_count)
        .map(|offset| {
            let (title, lines) = TRADES[(seed + offset) % TRADES.len()];
            let items = lines
                .iter()
                .enumerate()
                .map(|(idx, (description, unit, price, nature))| {
                    let quantity = (1 + (seed * 7 + idx * 3) % 12) as f64;
                    let vat_rate = VAT_RATES[(seed + offset) % VAT_RATES.len()];
                    LineItem::new(*description, quantity, *price, *nature)
                        .with_unit(*unit)
                        .with_vat_rate(vat_rate)
                })
                .collect();

            Section::new(title).with_items(items)
        })
        .collect()
}
