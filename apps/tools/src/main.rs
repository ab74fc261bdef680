//! Dataset administration: create the schema, import records, seed demo data.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use shared::domain::CovidRecord;
use storage::{demo::demo_records, queries, Database};
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/covid_london.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database file and apply migrations.
    Init,
    /// Insert records from a JSON array of dataset rows.
    Import { path: PathBuf },
    /// Insert deterministic demo data for a handful of boroughs.
    SeedDemo {
        #[arg(long, default_value = "2022-01-01")]
        start: NaiveDate,
        #[arg(long, default_value_t = 90)]
        days: u32,
    },
    /// Print the number of distinct dates and boroughs.
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let database = Database::create(&cli.database_url)
        .await
        .with_context(|| format!("failed to open database '{}'", cli.database_url))?;

    match cli.command {
        Command::Init => {
            info!(database_url = %cli.database_url, "schema ready");
        }
        Command::Import { path } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            let records: Vec<CovidRecord> = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not a JSON array of records", path.display()))?;
            let inserted = database.insert_records(&records).await?;
            println!("imported {inserted} records");
        }
        Command::SeedDemo { start, days } => {
            let inserted = database.insert_records(&demo_records(start, days)).await?;
            println!("seeded {inserted} demo records from {start}");
        }
        Command::Summary => {
            let dates = queries::decode_dates(&queries::available_dates(&database).run().await?)?;
            let boroughs =
                queries::decode_names(&queries::borough_names(&database).run().await?)?;
            match (dates.first(), dates.last()) {
                (Some(first), Some(last)) => println!(
                    "{} dates ({first} to {last}), {} boroughs",
                    dates.len(),
                    boroughs.len()
                ),
                _ => println!("no records"),
            }
        }
    }

    Ok(())
}
