//! Review loader: pure validation partition over the batch, then a single
//! all-or-nothing bulk insert of the valid rows.

use anyhow::{Context, Result};
use bigdecimal::{BigDecimal, FromPrimitive};
use indexmap::IndexMap;
use sqlx::{PgPool, QueryBuilder};
use tracing::{info, warn};

use super::model::{
    RejectReason, RejectedRow, ReviewRecord, SentimentLabel, ValidReview, DEFAULT_SOURCE,
    MAX_REVIEW_TEXT_CHARS,
};
use super::preprocess::parse_review_date;

/// Rows per INSERT statement within the load transaction.
const INSERT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub attempted: usize,
    pub inserted: u64,
    pub rejected: Vec<RejectedRow>,
    /// Valid rows per bank, in first-seen order.
    pub per_bank: IndexMap<String, usize>,
    /// Sentiment annotations dropped because the label was unrecognized or
    /// the score fell outside [0,1].
    pub annotations_dropped: usize,
}

/// Split a batch into insertable rows and rejected rows before any database
/// call is made. `row` numbers in rejections are 1-based data rows.
pub fn partition_records(records: &[ReviewRecord]) -> (Vec<ValidReview>, Vec<RejectedRow>, usize) {
    let mut valid = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    let mut annotations_dropped = 0usize;

    for (idx, rec) in records.iter().enumerate() {
        let row = idx + 1;

        let text = rec.review.trim();
        if text.is_empty() {
            rejected.push(RejectedRow {
                row,
                reason: RejectReason::EmptyText,
            });
            continue;
        }
        let bank = rec.bank.trim();
        if bank.is_empty() {
            rejected.push(RejectedRow {
                row,
                reason: RejectReason::MissingBank,
            });
            continue;
        }
        let rating = match rec.rating {
            None => {
                rejected.push(RejectedRow {
                    row,
                    reason: RejectReason::MissingRating,
                });
                continue;
            }
            Some(r) if r.fract() != 0.0 => {
                rejected.push(RejectedRow {
                    row,
                    reason: RejectReason::NonIntegerRating,
                });
                continue;
            }
            Some(r) => r as i64,
        };
        if !(1..=5).contains(&rating) {
            rejected.push(RejectedRow {
                row,
                reason: RejectReason::RatingOutOfRange(rating),
            });
            continue;
        }

        let sentiment_label = match rec.sentiment_label.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<SentimentLabel>() {
                Ok(label) => Some(label),
                Err(()) => {
                    annotations_dropped += 1;
                    None
                }
            },
        };
        let sentiment_score = match rec.sentiment_score {
            Some(s) if !(0.0..=1.0).contains(&s) => {
                annotations_dropped += 1;
                None
            }
            other => other,
        };

        valid.push(ValidReview {
            bank: bank.to_string(),
            text: truncate_chars(text, MAX_REVIEW_TEXT_CHARS),
            rating: rating as i32,
            date: rec.date.as_deref().and_then(parse_review_date),
            sentiment_label,
            sentiment_score,
            source: rec
                .source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SOURCE)
                .to_string(),
        });
    }

    (valid, rejected, annotations_dropped)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Insert every valid row with its resolved bank_id, all pages inside one
/// transaction: either the whole batch commits or nothing does.
pub async fn bulk_insert_reviews(
    pool: &PgPool,
    rows: &[ValidReview],
    bank_ids: &IndexMap<String, i32>,
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    // Substitute bank ids up front so a resolver gap fails before any write.
    let mut resolved: Vec<(i32, &ValidReview)> = Vec::with_capacity(rows.len());
    for r in rows {
        let id = bank_ids
            .get(r.bank.as_str())
            .copied()
            .with_context(|| format!("bank '{}' missing from resolver mapping", r.bank))?;
        resolved.push((id, r));
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    for page in resolved.chunks(INSERT_PAGE_SIZE) {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO reviews (bank_id, review_text, rating, review_date, sentiment_label, sentiment_score, source) ",
        );
        qb.push_values(page, |mut b, (bank_id, r)| {
            b.push_bind(*bank_id)
                .push_bind(&r.text)
                .push_bind(r.rating)
                .push_bind(r.date)
                .push_bind(r.sentiment_label.map(|l| l.as_str()))
                .push_bind(r.sentiment_score.and_then(BigDecimal::from_f64))
                .push_bind(&r.source);
        });
        inserted += qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    info!(inserted, "review batch committed");
    Ok(inserted)
}

/// Validate, resolve banks, insert, and summarize one batch.
pub async fn load_batch(pool: &PgPool, records: &[ReviewRecord]) -> Result<LoadSummary> {
    let (valid, rejected, annotations_dropped) = partition_records(records);
    for r in &rejected {
        warn!(row = r.row, reason = %r.reason, "rejected review row");
    }

    let mut per_bank: IndexMap<String, usize> = IndexMap::new();
    for v in &valid {
        *per_bank.entry(v.bank.clone()).or_insert(0) += 1;
    }

    let bank_ids =
        super::registry::resolve_banks(pool, valid.iter().map(|v| v.bank.as_str())).await?;
    let inserted = bulk_insert_reviews(pool, &valid, &bank_ids).await?;

    Ok(LoadSummary {
        attempted: records.len(),
        inserted,
        rejected,
        per_bank,
        annotations_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(review: &str, rating: Option<f64>, date: &str, bank: &str) -> ReviewRecord {
        ReviewRecord {
            review: review.to_string(),
            rating,
            date: if date.is_empty() {
                None
            } else {
                Some(date.to_string())
            },
            bank: bank.to_string(),
            ..ReviewRecord::default()
        }
    }

    #[test]
    fn keeps_ratings_in_range_and_rejects_the_rest() {
        let records = vec![
            record("Great app", Some(5.0), "2024-01-01", "Dashen Bank"),
            record("Crashes often", Some(1.0), "2024-01-02", "Dashen Bank"),
            record("ok", Some(6.0), "2024-01-03", "Dashen Bank"),
        ];
        let (valid, rejected, _) = partition_records(&records);
        assert_eq!(valid.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].row, 3);
        assert_eq!(rejected[0].reason, RejectReason::RatingOutOfRange(6));
        // valid rows pass through unchanged
        assert_eq!(valid[0].rating, 5);
        assert_eq!(valid[0].date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(valid[1].rating, 1);
    }

    #[test]
    fn rejects_empty_text_missing_bank_and_missing_rating() {
        let records = vec![
            record("  ", Some(4.0), "", "CBE"),
            record("fine", Some(4.0), "", "  "),
            record("fine", None, "", "CBE"),
            record("fine", Some(4.5), "", "CBE"),
        ];
        let (valid, rejected, _) = partition_records(&records);
        assert!(valid.is_empty());
        let reasons: Vec<_> = rejected.iter().map(|r| r.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::EmptyText,
                RejectReason::MissingBank,
                RejectReason::MissingRating,
                RejectReason::NonIntegerRating,
            ]
        );
    }

    #[test]
    fn empty_batch_partitions_to_nothing() {
        let (valid, rejected, dropped) = partition_records(&[]);
        assert!(valid.is_empty());
        assert!(rejected.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn unknown_sentiment_labels_and_wild_scores_are_dropped() {
        let mut rec = record("fine", Some(4.0), "", "CBE");
        rec.sentiment_label = Some("mixed".to_string());
        rec.sentiment_score = Some(3.5);
        let (valid, _, dropped) = partition_records(&[rec]);
        assert_eq!(dropped, 2);
        assert!(valid[0].sentiment_label.is_none());
        assert!(valid[0].sentiment_score.is_none());
    }

    #[test]
    fn recognized_annotations_pass_through() {
        let mut rec = record("fine", Some(4.0), "2024-05-05", "CBE");
        rec.sentiment_label = Some("Positive".to_string());
        rec.sentiment_score = Some(0.9987);
        let (valid, _, dropped) = partition_records(&[rec]);
        assert_eq!(dropped, 0);
        assert_eq!(valid[0].sentiment_label, Some(SentimentLabel::Positive));
        assert_eq!(valid[0].sentiment_score, Some(0.9987));
    }

    #[test]
    fn long_text_is_truncated_not_rejected() {
        let long = "x".repeat(MAX_REVIEW_TEXT_CHARS + 50);
        let records = vec![record(&long, Some(3.0), "", "CBE")];
        let (valid, rejected, _) = partition_records(&records);
        assert!(rejected.is_empty());
        assert_eq!(valid[0].text.chars().count(), MAX_REVIEW_TEXT_CHARS);
    }

    #[test]
    fn unparseable_dates_load_as_null() {
        let records = vec![record("fine", Some(3.0), "sometime in march", "CBE")];
        let (valid, _, _) = partition_records(&records);
        assert!(valid[0].date.is_none());
    }
}
