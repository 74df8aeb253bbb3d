//! IICM invoice console.
//!
//! # Usage
//!
//! ```bash
//! # Price an order file (fetches the catalog only if a row references it)
//! iicm quote order.json
//!
//! # Refresh stock and list everything that blocks submission
//! iicm check order.json
//!
//! # Create the invoice
//! IICM_API_TOKEN=... iicm submit order.json
//! ```
//!
//! Configuration comes from `IICM_*` environment variables, see
//! [`iicm_console::config`].

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use iicm_console::order::OrderFile;
use iicm_console::{init_tracing, ApiError, BackendClient, ConsoleConfig, InvoiceSession};
use iicm_core::invoice::Totals;

#[derive(Parser)]
#[command(name = "iicm")]
#[command(author, version, about = "Invoice pricing and stock checks against the inventory API")]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the totals of an order file
    Quote {
        /// Path to the order JSON
        order: PathBuf,
    },
    /// Refresh stock and print the issues blocking submission
    Check {
        /// Path to the order JSON
        order: PathBuf,
    },
    /// Submit the order as a new invoice
    Submit {
        /// Path to the order JSON
        order: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ConsoleConfig::load().context("loading configuration")?;
    info!(api_url = %config.api_url, "Configuration loaded");

    let client = BackendClient::new(&config).map_err(ApiError::from)?;
    let mut session = InvoiceSession::new(client, config.pricing());

    let (Commands::Quote { order } | Commands::Check { order } | Commands::Submit { order }) =
        &cli.command;
    let order = OrderFile::load(order)?;

    if order.references_catalog() {
        session.load_catalog().await.map_err(ApiError::from)?;
    }
    order.apply(&mut session).map_err(ApiError::from)?;

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Quote { .. } => print_totals(&session.totals(), cli.json)?,
        Commands::Check { .. } => {
            let issues = session.check(today).await.map_err(ApiError::from)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&issues)?);
            } else if issues.is_empty() {
                println!("Ready to submit.");
            } else {
                for issue in &issues {
                    println!("  ✗ {}", issue);
                }
            }
            if !issues.is_empty() {
                bail!("{} issue(s) block submission", issues.len());
            }
        }
        Commands::Submit { .. } => {
            let totals = session.totals();
            match session.submit(today).await {
                Ok(created) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&created)?);
                    } else {
                        println!("Invoice {} created.", created.id);
                        print_totals(&totals, false)?;
                    }
                }
                Err(e) => {
                    let err = ApiError::from(e);
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&err)?);
                    } else {
                        for issue in &err.issues {
                            println!("  ✗ {}", issue);
                        }
                    }
                    return Err(err.into());
                }
            }
        }
    }

    Ok(())
}

fn print_totals(totals: &Totals, json: bool) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "exact": totals,
                "display": totals.display(),
            }))?
        );
        return Ok(());
    }

    let shown = totals.display();
    println!("Subtotal        {:>14}", shown.subtotal);
    println!("Discount        {:>14}", shown.discount_amount);
    println!("Taxable         {:>14}", shown.taxable_amount);
    println!("Shipping        {:>14}", shown.shipping);
    println!("Tax             {:>14}", shown.tax);
    println!("Total           {:>14}", shown.total);
    println!("Total (riel)    {:>14}", shown.total_in_secondary_currency);
    Ok(())
}
