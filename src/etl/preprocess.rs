//! Cleaning stage for raw scraped review CSVs: dedup, missing-data handling
//! and date normalization, with a data-quality report checked against the
//! collection KPIs.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use tracing::info;

use super::model::{CleanedReview, RawReviewRow, DEFAULT_SOURCE};

/// KPI: overall missing-data share must stay below this percentage.
pub const MISSING_DATA_KPI_PCT: f64 = 5.0;
/// KPI: minimum number of reviews the collection should reach.
pub const MIN_REVIEWS_KPI: usize = 1200;

const BANK_FALLBACK: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanStats {
    pub initial: usize,
    pub duplicates_removed: usize,
    pub invalid_removed: usize,
    pub dates_parsed: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Default)]
pub struct QualityMetrics {
    pub total_reviews: usize,
    pub missing_rating: usize,
    pub missing_date: usize,
    pub missing_bank: usize,
    pub missing_data_pct: f64,
}

impl QualityMetrics {
    pub fn meets_missing_data_kpi(&self) -> bool {
        self.missing_data_pct < MISSING_DATA_KPI_PCT
    }

    pub fn meets_volume_kpi(&self) -> bool {
        self.total_reviews >= MIN_REVIEWS_KPI
    }
}

/// Run the full cleaning pass over raw rows.
pub fn clean(rows: Vec<RawReviewRow>) -> (Vec<CleanedReview>, CleanStats) {
    let mut stats = CleanStats {
        initial: rows.len(),
        ..CleanStats::default()
    };

    let rows = remove_duplicates(rows, &mut stats);

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let text = row.review.as_deref().map(str::trim).unwrap_or("");
        if text.is_empty() {
            stats.invalid_removed += 1;
            continue;
        }
        // Missing ratings count as 0 and fall out of the 1-5 window.
        let rating = row.rating.unwrap_or(0.0);
        if !(1.0..=5.0).contains(&rating) {
            stats.invalid_removed += 1;
            continue;
        }

        let date = row
            .date
            .as_deref()
            .and_then(parse_review_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        if !date.is_empty() {
            stats.dates_parsed += 1;
        }

        kept.push(CleanedReview {
            review: text.to_string(),
            rating: rating as i32,
            date,
            bank: row
                .bank
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(BANK_FALLBACK)
                .to_string(),
            source: row
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SOURCE)
                .to_string(),
        });
    }

    stats.kept = kept.len();
    info!(
        initial = stats.initial,
        duplicates_removed = stats.duplicates_removed,
        invalid_removed = stats.invalid_removed,
        kept = stats.kept,
        "cleaning pass complete"
    );
    (kept, stats)
}

/// Drop duplicate (review text, bank) pairs, keeping the first occurrence.
fn remove_duplicates(rows: Vec<RawReviewRow>, stats: &mut CleanStats) -> Vec<RawReviewRow> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key = (
            row.review.as_deref().map(str::trim).unwrap_or("").to_string(),
            row.bank.as_deref().map(str::trim).unwrap_or("").to_string(),
        );
        if seen.insert(key) {
            out.push(row);
        } else {
            stats.duplicates_removed += 1;
        }
    }
    out
}

/// Parse a scraped date into a `NaiveDate`, trying the formats the sources
/// are known to emit. Unparseable input is simply no date.
pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const DATE_FORMATS: [&str; 6] = [
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%m-%d-%Y",
    ];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Column-level completeness over the cleaned output.
pub fn quality_metrics(rows: &[CleanedReview]) -> QualityMetrics {
    let total = rows.len();
    let missing_rating = rows.iter().filter(|r| r.rating == 0).count();
    let missing_date = rows.iter().filter(|r| r.date.is_empty()).count();
    let missing_bank = rows.iter().filter(|r| r.bank == BANK_FALLBACK).count();

    // Four tracked columns; review text is always present after cleaning.
    let missing_data_pct = if total > 0 {
        (missing_rating + missing_date + missing_bank) as f64 / (total as f64 * 4.0) * 100.0
    } else {
        0.0
    };

    QualityMetrics {
        total_reviews: total,
        missing_rating,
        missing_date,
        missing_bank,
        missing_data_pct,
    }
}
