//! Round-trip tests against a live Postgres with the schema applied
//! (`bankrev setup`). Ignored by default so the suite passes without a
//! database; run with `cargo test -- --ignored`.

use bank_reviews::etl::{loader, model::ReviewRecord, registry, verify::VerificationReport};
use bank_reviews::util::{
    db::{is_unique_violation, Db},
    env as env_util,
};
use sqlx::PgPool;

async fn connect() -> Db {
    let url = env_util::db_url().expect("database configuration");
    Db::connect(&url, 2).await.expect("connect")
}

fn unique_bank(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

async fn delete_bank(pool: &PgPool, name: &str) {
    // reviews cascade with the bank row
    sqlx::query("DELETE FROM banks WHERE bank_name = $1")
        .persistent(false)
        .bind(name)
        .execute(pool)
        .await
        .expect("cleanup");
}

fn record(review: &str, rating: f64, date: &str, bank: &str) -> ReviewRecord {
    ReviewRecord {
        review: review.to_string(),
        rating: Some(rating),
        date: Some(date.to_string()),
        bank: bank.to_string(),
        ..ReviewRecord::default()
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres with the schema applied"]
async fn bank_upsert_is_idempotent_across_resolutions() {
    let db = connect().await;
    let name = unique_bank("Test Bank");

    let first = registry::get_or_create_bank(&db.pool, &name, None)
        .await
        .expect("first resolve");
    let second = registry::get_or_create_bank(&db.pool, &name, None)
        .await
        .expect("second resolve");
    assert_eq!(first, second);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM banks WHERE bank_name = $1")
        .persistent(false)
        .bind(&name)
        .fetch_one(&db.pool)
        .await
        .expect("count");
    assert_eq!(rows, 1);

    delete_bank(&db.pool, &name).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with the schema applied"]
async fn duplicate_bank_insert_is_a_unique_violation_and_recoverable() {
    let db = connect().await;
    let name = unique_bank("Race Bank");

    let existing = registry::get_or_create_bank(&db.pool, &name, None)
        .await
        .expect("create");

    // A bare insert of the same name fails on the bank_name constraint, which
    // is exactly what the resolver recovers from by re-reading.
    let err = sqlx::query("INSERT INTO banks (bank_name, app_name) VALUES ($1, $1)")
        .persistent(false)
        .bind(&name)
        .execute(&db.pool)
        .await
        .expect_err("duplicate bank insert must fail");
    assert!(is_unique_violation(&err));

    let resolved = registry::get_or_create_bank(&db.pool, &name, None)
        .await
        .expect("resolve after duplicate attempt");
    assert_eq!(resolved, existing);

    delete_bank(&db.pool, &name).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with the schema applied"]
async fn load_round_trip_counts_only_valid_rows() {
    let db = connect().await;
    let bank = unique_bank("Dashen Bank");

    let records = vec![
        record("Great app", 5.0, "2024-01-01", &bank),
        record("Crashes often", 1.0, "2024-01-02", &bank),
        record("ok", 6.0, "2024-01-03", &bank),
    ];
    let summary = loader::load_batch(&db.pool, &records).await.expect("load");
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.rejected.len(), 1);

    let bank_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM banks WHERE bank_name = $1")
        .persistent(false)
        .bind(&bank)
        .fetch_one(&db.pool)
        .await
        .expect("bank count");
    assert_eq!(bank_rows, 1);

    let review_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews r JOIN banks b ON b.bank_id = r.bank_id WHERE b.bank_name = $1",
    )
    .persistent(false)
    .bind(&bank)
    .fetch_one(&db.pool)
    .await
    .expect("review count");
    assert_eq!(review_rows, 2);

    let report = VerificationReport::gather(&db.pool).await.expect("report");
    assert!(report.total_reviews >= 2);
    assert!(report
        .reviews_per_bank
        .iter()
        .any(|b| b.bank == bank && b.reviews == 2));

    delete_bank(&db.pool, &bank).await;
}

#[tokio::test]
#[ignore = "requires a running Postgres with the schema applied"]
async fn empty_batch_loads_and_verifies_without_error() {
    let db = connect().await;
    let summary = loader::load_batch(&db.pool, &[]).await.expect("load");
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.inserted, 0);
    assert!(summary.rejected.is_empty());

    VerificationReport::gather(&db.pool).await.expect("report");
}
