//! Read-only verification reporter: aggregate queries over banks/reviews
//! gathered into a report struct and rendered as an aligned text summary.
//! An empty database is a normal outcome and renders as zeros.

use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::fmt::Write as _;

#[derive(Debug, Clone, Default)]
pub struct BankCount {
    pub bank: String,
    pub reviews: i64,
}

#[derive(Debug, Clone)]
pub struct BankAvgRating {
    pub bank: String,
    pub avg_rating: f64,
    pub reviews: i64,
}

#[derive(Debug, Clone)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct SentimentBucket {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct BankSentimentScore {
    pub bank: String,
    pub avg_score: BigDecimal,
    pub reviews: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub with_dates: i64,
}

#[derive(Debug, Clone, Default)]
pub struct QualityCounts {
    pub total: i64,
    pub has_text: i64,
    pub has_rating: i64,
    pub has_date: i64,
    pub has_sentiment: i64,
}

#[derive(Debug, Default)]
pub struct VerificationReport {
    pub total_reviews: i64,
    pub reviews_per_bank: Vec<BankCount>,
    pub avg_rating_per_bank: Vec<BankAvgRating>,
    pub rating_distribution: Vec<RatingBucket>,
    pub sentiment_distribution: Vec<SentimentBucket>,
    pub avg_sentiment_per_bank: Vec<BankSentimentScore>,
    pub date_range: DateRange,
    pub quality: QualityCounts,
}

/// part/whole as a percentage; zero whole reports zero, not NaN.
pub fn pct(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl VerificationReport {
    pub async fn gather(pool: &PgPool) -> Result<Self> {
        let total_reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .persistent(false)
            .fetch_one(pool)
            .await?;

        // LEFT JOIN so banks without reviews report zero rather than vanish.
        let reviews_per_bank = sqlx::query(
            "SELECT b.bank_name, COUNT(r.review_id) AS review_count
             FROM banks b
             LEFT JOIN reviews r ON b.bank_id = r.bank_id
             GROUP BY b.bank_id, b.bank_name
             ORDER BY review_count DESC",
        )
        .persistent(false)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(BankCount {
                bank: row.try_get("bank_name")?,
                reviews: row.try_get("review_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let avg_rating_per_bank = sqlx::query(
            "SELECT b.bank_name, AVG(r.rating)::float8 AS avg_rating,
                    COUNT(r.review_id) AS review_count
             FROM banks b
             JOIN reviews r ON b.bank_id = r.bank_id
             WHERE r.rating IS NOT NULL
             GROUP BY b.bank_id, b.bank_name
             ORDER BY avg_rating DESC",
        )
        .persistent(false)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(BankAvgRating {
                bank: row.try_get("bank_name")?,
                avg_rating: row.try_get("avg_rating")?,
                reviews: row.try_get("review_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let rating_distribution = sqlx::query(
            "SELECT rating, COUNT(*) AS count
             FROM reviews
             WHERE rating IS NOT NULL
             GROUP BY rating
             ORDER BY rating",
        )
        .persistent(false)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(RatingBucket {
                rating: row.try_get("rating")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let sentiment_distribution = sqlx::query(
            "SELECT sentiment_label, COUNT(*) AS count
             FROM reviews
             WHERE sentiment_label IS NOT NULL
             GROUP BY sentiment_label
             ORDER BY count DESC",
        )
        .persistent(false)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(SentimentBucket {
                label: row.try_get("sentiment_label")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let avg_sentiment_per_bank = sqlx::query(
            "SELECT b.bank_name, ROUND(AVG(r.sentiment_score), 4) AS avg_score,
                    COUNT(r.review_id) AS review_count
             FROM banks b
             JOIN reviews r ON b.bank_id = r.bank_id
             WHERE r.sentiment_score IS NOT NULL
             GROUP BY b.bank_id, b.bank_name
             ORDER BY avg_score DESC",
        )
        .persistent(false)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(BankSentimentScore {
                bank: row.try_get("bank_name")?,
                avg_score: row.try_get("avg_score")?,
                reviews: row.try_get("review_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let date_range = {
            let row = sqlx::query(
                "SELECT MIN(review_date) AS earliest, MAX(review_date) AS latest,
                        COUNT(*) AS with_dates
                 FROM reviews
                 WHERE review_date IS NOT NULL",
            )
            .persistent(false)
            .fetch_one(pool)
            .await?;
            DateRange {
                earliest: row.try_get("earliest")?,
                latest: row.try_get("latest")?,
                with_dates: row.try_get("with_dates")?,
            }
        };

        let quality = {
            let row = sqlx::query(
                "SELECT COUNT(*) AS total,
                        COUNT(review_text) AS has_text,
                        COUNT(rating) AS has_rating,
                        COUNT(review_date) AS has_date,
                        COUNT(sentiment_label) AS has_sentiment
                 FROM reviews",
            )
            .persistent(false)
            .fetch_one(pool)
            .await?;
            QualityCounts {
                total: row.try_get("total")?,
                has_text: row.try_get("has_text")?,
                has_rating: row.try_get("has_rating")?,
                has_date: row.try_get("has_date")?,
                has_sentiment: row.try_get("has_sentiment")?,
            }
        };

        Ok(Self {
            total_reviews,
            reviews_per_bank,
            avg_rating_per_bank,
            rating_distribution,
            sentiment_distribution,
            avg_sentiment_per_bank,
            date_range,
            quality,
        })
    }

    /// Render the aligned text summary the verify subcommand prints.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(60);

        let _ = writeln!(out, "[1] Total Reviews");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total reviews in database: {}", self.total_reviews);

        let _ = writeln!(out, "\n[2] Reviews Count by Bank");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<40} {:>15}", "Bank Name", "Review Count");
        for b in &self.reviews_per_bank {
            let _ = writeln!(out, "{:<40} {:>15}", b.bank, b.reviews);
        }

        let _ = writeln!(out, "\n[3] Average Rating by Bank");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<40} {:>12} {:>10}", "Bank Name", "Avg Rating", "Count");
        for b in &self.avg_rating_per_bank {
            let _ = writeln!(
                out,
                "{:<40} {:>12.2} {:>10}",
                b.bank, b.avg_rating, b.reviews
            );
        }

        let _ = writeln!(out, "\n[4] Rating Distribution");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<10} {:>12} {:>12}", "Rating", "Count", "Percentage");
        let rated: i64 = self.rating_distribution.iter().map(|b| b.count).sum();
        for b in &self.rating_distribution {
            let _ = writeln!(
                out,
                "{:<10} {:>12} {:>11.2}%",
                b.rating,
                b.count,
                pct(b.count, rated)
            );
        }

        let _ = writeln!(out, "\n[5] Sentiment Distribution");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<15} {:>12} {:>12}", "Sentiment", "Count", "Percentage");
        let labeled: i64 = self.sentiment_distribution.iter().map(|b| b.count).sum();
        for b in &self.sentiment_distribution {
            let _ = writeln!(
                out,
                "{:<15} {:>12} {:>11.2}%",
                b.label,
                b.count,
                pct(b.count, labeled)
            );
        }

        let _ = writeln!(out, "\n[6] Sentiment Analysis Coverage");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total reviews: {}", self.quality.total);
        let _ = writeln!(out, "Reviews with sentiment: {}", self.quality.has_sentiment);
        let _ = writeln!(
            out,
            "Coverage: {:.2}%",
            pct(self.quality.has_sentiment, self.quality.total)
        );

        let _ = writeln!(out, "\n[7] Review Date Range");
        let _ = writeln!(out, "{rule}");
        match (self.date_range.earliest, self.date_range.latest) {
            (Some(earliest), Some(latest)) => {
                let _ = writeln!(out, "Earliest review: {earliest}");
                let _ = writeln!(out, "Latest review: {latest}");
                let _ = writeln!(out, "Reviews with dates: {}", self.date_range.with_dates);
            }
            _ => {
                let _ = writeln!(out, "No reviews with dates found");
            }
        }

        let _ = writeln!(out, "\n[8] Average Sentiment Score by Bank");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<40} {:>12} {:>10}", "Bank Name", "Avg Score", "Count");
        for b in &self.avg_sentiment_per_bank {
            let _ = writeln!(out, "{:<40} {:>12} {:>10}", b.bank, b.avg_score, b.reviews);
        }

        let _ = writeln!(out, "\n[9] Data Quality Check");
        let _ = writeln!(out, "{rule}");
        let q = &self.quality;
        let _ = writeln!(out, "Total reviews: {}", q.total);
        let _ = writeln!(
            out,
            "With review text: {} ({:.1}%)",
            q.has_text,
            pct(q.has_text, q.total)
        );
        let _ = writeln!(
            out,
            "With rating: {} ({:.1}%)",
            q.has_rating,
            pct(q.has_rating, q.total)
        );
        let _ = writeln!(
            out,
            "With date: {} ({:.1}%)",
            q.has_date,
            pct(q.has_date, q.total)
        );
        let _ = writeln!(
            out,
            "With sentiment: {} ({:.1}%)",
            q.has_sentiment,
            pct(q.has_sentiment, q.total)
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_handles_zero_denominator() {
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn empty_report_renders_zeros_without_error() {
        let report = VerificationReport::default();
        let out = report.render();
        assert!(out.contains("Total reviews in database: 0"));
        assert!(out.contains("No reviews with dates found"));
        assert!(out.contains("Coverage: 0.00%"));
    }

    #[test]
    fn average_rating_renders_two_decimals() {
        // avg of ratings {4, 2}
        let report = VerificationReport {
            total_reviews: 2,
            avg_rating_per_bank: vec![BankAvgRating {
                bank: "BankA".into(),
                avg_rating: 3.0,
                reviews: 2,
            }],
            ..VerificationReport::default()
        };
        let out = report.render();
        assert!(out.contains("3.00"), "{out}");
    }

    #[test]
    fn distribution_percentages_sum_over_labeled_rows() {
        let report = VerificationReport {
            total_reviews: 4,
            sentiment_distribution: vec![
                SentimentBucket {
                    label: "positive".into(),
                    count: 3,
                },
                SentimentBucket {
                    label: "negative".into(),
                    count: 1,
                },
            ],
            ..VerificationReport::default()
        };
        let out = report.render();
        assert!(out.contains("75.00%"));
        assert!(out.contains("25.00%"));
    }
}
