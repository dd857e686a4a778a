use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::etl::{csv_io, loader};
use crate::util::db::Db;
use crate::util::env as env_util;

pub const DEFAULT_ANALYZED_CSV: &str = "data/processed/reviews_analyzed.csv";
pub const DEFAULT_CLEANED_CSV: &str = "data/processed/reviews_cleaned.csv";

#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    /// Explicit input CSV; when unset the analyzed file is preferred over the
    /// cleaned one.
    pub input: Option<PathBuf>,
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
    /// Max pool connections (defaults to env DB_MAX_CONNS or 5).
    pub max_connections: Option<u32>,
}

fn resolve_input(cfg: &LoadConfig) -> Result<PathBuf> {
    if let Some(path) = &cfg.input {
        return Ok(path.clone());
    }
    for candidate in [DEFAULT_ANALYZED_CSV, DEFAULT_CLEANED_CSV] {
        if Path::new(candidate).exists() {
            return Ok(PathBuf::from(candidate));
        }
    }
    anyhow::bail!(
        "neither {DEFAULT_ANALYZED_CSV} nor {DEFAULT_CLEANED_CSV} found; run the preprocess (and analysis) stages first"
    )
}

/// Load a cleaned/annotated review CSV into the database and print the
/// attempted/inserted/rejected summary.
pub async fn run(cfg: LoadConfig) -> Result<()> {
    env_util::preflight_snapshot("load");

    let input = resolve_input(&cfg)?;
    let records = csv_io::read_review_records(&input)?;
    println!("Loaded {} reviews from {}", records.len(), input.display());

    let database_url = match cfg.database_url.clone() {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let max_conns = cfg
        .max_connections
        .unwrap_or_else(|| env_util::env_parse("DB_MAX_CONNS", 5));
    let db = Db::connect(&database_url, max_conns)
        .await
        .context("failed to connect to the target database; run 'bankrev setup' first")?;

    for table in ["banks", "reviews"] {
        if !db.table_exists(table).await? {
            anyhow::bail!("table '{table}' does not exist; run 'bankrev setup' first");
        }
    }

    let summary = loader::load_batch(&db.pool, &records).await?;
    info!(
        attempted = summary.attempted,
        inserted = summary.inserted,
        rejected = summary.rejected.len(),
        "load complete"
    );

    println!("\nLoad summary:");
    println!("  Attempted: {}", summary.attempted);
    println!("  Inserted:  {}", summary.inserted);
    println!("  Rejected:  {}", summary.rejected.len());
    if summary.annotations_dropped > 0 {
        println!(
            "  Sentiment annotations dropped: {}",
            summary.annotations_dropped
        );
    }
    for r in &summary.rejected {
        println!("    row {}: {}", r.row, r.reason);
    }
    if !summary.per_bank.is_empty() {
        println!("  Inserted by bank:");
        for (bank, count) in &summary.per_bank {
            println!("    {bank}: {count}");
        }
    }

    let valid = summary.attempted - summary.rejected.len();
    if summary.inserted != valid as u64 {
        anyhow::bail!(
            "inserted {} of {} valid rows; the batch did not commit completely",
            summary.inserted,
            valid
        );
    }
    Ok(())
}
