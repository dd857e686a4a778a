use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;

use super::model::{CleanedReview, RawReviewRow, ReviewRecord};

/// Read a raw scraped CSV (review, rating, date, bank, source).
pub fn read_raw_reviews(path: &Path) -> Result<Vec<RawReviewRow>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    raw_reviews_from_reader(file)
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn raw_reviews_from_reader<R: io::Read>(rdr: R) -> Result<Vec<RawReviewRow>> {
    let mut out = Vec::new();
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    for row in reader.deserialize::<RawReviewRow>() {
        out.push(row?);
    }
    Ok(out)
}

/// Read a cleaned (optionally sentiment-annotated) CSV into loader records.
pub fn read_review_records(path: &Path) -> Result<Vec<ReviewRecord>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    review_records_from_reader(file)
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn review_records_from_reader<R: io::Read>(rdr: R) -> Result<Vec<ReviewRecord>> {
    let mut out = Vec::new();
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    for row in reader.deserialize::<ReviewRecord>() {
        out.push(row?);
    }
    Ok(out)
}

/// Write the preprocess stage's output CSV, creating parent directories.
pub fn write_cleaned_reviews(path: &Path, rows: &[CleanedReview]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cleaned_layout_without_sentiment_columns() {
        let csv = "review,rating,date,bank,source\n\
                   Great app,5,2024-01-01,Dashen Bank,Google Play Store\n";
        let rows = review_records_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].review, "Great app");
        assert_eq!(rows[0].rating, Some(5.0));
        assert_eq!(rows[0].bank, "Dashen Bank");
        assert!(rows[0].sentiment_label.is_none());
        assert!(rows[0].sentiment_score.is_none());
    }

    #[test]
    fn parses_analyzed_layout_with_sentiment_and_themes() {
        let csv = "review,rating,date,bank,source,sentiment_label,sentiment_score,themes\n\
                   Crashes often,1,2024-01-02,Dashen Bank,Google Play Store,negative,0.9941,Reliability;Performance\n";
        let rows = review_records_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].sentiment_label.as_deref(), Some("negative"));
        assert_eq!(rows[0].sentiment_score, Some(0.9941));
        assert_eq!(rows[0].themes.as_deref(), Some("Reliability;Performance"));
    }

    #[test]
    fn accepts_aliased_headers() {
        let csv = "review_text,rating,review_date,bank_name,source\n\
                   ok,3,2024-02-01,BOA,Google Play Store\n";
        let rows = review_records_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].review, "ok");
        assert_eq!(rows[0].date.as_deref(), Some("2024-02-01"));
        assert_eq!(rows[0].bank, "BOA");
    }

    #[test]
    fn empty_fields_become_none() {
        let csv = "review,rating,date,bank,source\nmeh,,,CBE,\n";
        let rows = review_records_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].rating, None);
        assert_eq!(rows[0].date, None);
        assert_eq!(rows[0].source, None);
    }

    #[test]
    fn raw_rows_tolerate_missing_values() {
        let csv = "review,rating,date,bank,source\n,4,,Dashen Bank,\n";
        let rows = raw_reviews_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, Some(4.0));
        assert!(rows[0].review.as_deref().unwrap_or("").is_empty());
    }
}
