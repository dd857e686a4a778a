use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source attributed to rows that arrive without one.
pub const DEFAULT_SOURCE: &str = "Google Play Store";

/// Review text is truncated to this many characters before insertion.
pub const MAX_REVIEW_TEXT_CHARS: usize = 10_000;

/// One row of a raw scraped CSV, everything optional because scrapers leave
/// holes. The preprocess stage turns these into [`CleanedReview`]s.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReviewRow {
    #[serde(default, alias = "review_text")]
    pub review: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "review_date")]
    pub date: Option<String>,
    #[serde(default, alias = "bank_name")]
    pub bank: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Output row of the preprocess stage; also the minimum the loader accepts.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedReview {
    pub review: String,
    pub rating: i32,
    /// ISO `YYYY-MM-DD`, or empty when the scraped date was unparseable.
    pub date: String,
    pub bank: String,
    pub source: String,
}

/// One row of the loader's input CSV (cleaned, optionally annotated).
///
/// Column aliases cover both the cleaned and the analyzed file layout; the
/// sentiment/theme columns are simply absent from the former.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRecord {
    #[serde(default, alias = "review_text")]
    pub review: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "review_date")]
    pub date: Option<String>,
    #[serde(default, alias = "bank_name")]
    pub bank: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub themes: Option<String>,
}

/// Categories produced by the upstream sentiment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that passed validation and is ready for the bulk insert.
#[derive(Debug, Clone)]
pub struct ValidReview {
    pub bank: String,
    pub text: String,
    pub rating: i32,
    pub date: Option<NaiveDate>,
    pub sentiment_label: Option<SentimentLabel>,
    pub sentiment_score: Option<f64>,
    pub source: String,
}

/// Why a record was excluded from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyText,
    MissingRating,
    NonIntegerRating,
    RatingOutOfRange(i64),
    MissingBank,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyText => write!(f, "empty review text"),
            RejectReason::MissingRating => write!(f, "missing rating"),
            RejectReason::NonIntegerRating => write!(f, "non-integer rating"),
            RejectReason::RatingOutOfRange(v) => write!(f, "rating {v} outside 1-5"),
            RejectReason::MissingBank => write!(f, "missing bank name"),
        }
    }
}

/// A record excluded from the batch, with its 1-based CSV data row number.
#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: RejectReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_label_parses_case_insensitively() {
        assert_eq!("Positive".parse(), Ok(SentimentLabel::Positive));
        assert_eq!(" negative ".parse(), Ok(SentimentLabel::Negative));
        assert_eq!("NEUTRAL".parse(), Ok(SentimentLabel::Neutral));
        assert!("mixed".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn reject_reasons_render_for_summaries() {
        assert_eq!(
            RejectReason::RatingOutOfRange(6).to_string(),
            "rating 6 outside 1-5"
        );
        assert_eq!(RejectReason::EmptyText.to_string(), "empty review text");
    }
}
