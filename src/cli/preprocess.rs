use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::PathBuf;

use crate::etl::csv_io;
use crate::etl::preprocess::{self, MIN_REVIEWS_KPI, MISSING_DATA_KPI_PCT};

pub const DEFAULT_RAW_CSV: &str = "data/raw/all_reviews_raw.csv";
pub const DEFAULT_CLEANED_CSV: &str = "data/processed/reviews_cleaned.csv";

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_RAW_CSV),
            output: PathBuf::from(DEFAULT_CLEANED_CSV),
        }
    }
}

/// Clean the raw scraped CSV and write the loader's input file, printing a
/// data-quality report. Quality shortfalls are warnings, not failures.
pub async fn run(cfg: PreprocessConfig) -> Result<()> {
    let rows = csv_io::read_raw_reviews(&cfg.input)
        .with_context(|| "run the scraping stage first to produce the raw CSV")?;
    println!("Loaded {} reviews from {}", rows.len(), cfg.input.display());

    let (cleaned, stats) = preprocess::clean(rows);
    if stats.duplicates_removed > 0 {
        println!("Removed {} duplicate reviews", stats.duplicates_removed);
    }
    if stats.invalid_removed > 0 {
        println!(
            "Removed {} rows with missing/invalid data",
            stats.invalid_removed
        );
    }
    println!(
        "Normalized dates: {}/{} reviews have valid dates",
        stats.dates_parsed, stats.kept
    );

    let metrics = preprocess::quality_metrics(&cleaned);
    println!("\nData Quality Report:");
    println!("  Total reviews: {}", metrics.total_reviews);
    println!("  Missing ratings: {}", metrics.missing_rating);
    println!("  Missing dates: {}", metrics.missing_date);
    println!("  Missing bank names: {}", metrics.missing_bank);
    println!("  Overall missing data: {:.2}%", metrics.missing_data_pct);

    if metrics.meets_missing_data_kpi() {
        println!("  [OK] Data quality meets KPI (<{MISSING_DATA_KPI_PCT}% missing data)");
    } else {
        println!("  [WARN] Data quality is below KPI (<{MISSING_DATA_KPI_PCT}% missing data)");
    }
    if metrics.meets_volume_kpi() {
        println!("  [OK] Review count meets requirement ({MIN_REVIEWS_KPI}+ reviews)");
    } else {
        println!(
            "  [WARN] Review count ({}) is below requirement ({MIN_REVIEWS_KPI}+)",
            metrics.total_reviews
        );
    }

    csv_io::write_cleaned_reviews(&cfg.output, &cleaned)?;
    println!("\nSaved cleaned data to {}", cfg.output.display());

    let mut per_bank: IndexMap<&str, usize> = IndexMap::new();
    for row in &cleaned {
        *per_bank.entry(row.bank.as_str()).or_insert(0) += 1;
    }
    println!("\nSummary by bank:");
    for (bank, count) in &per_bank {
        println!("  {bank}: {count} reviews");
    }
    Ok(())
}
