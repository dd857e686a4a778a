use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection, Row};

use crate::util::env as env_util;

/// Connectivity smoke test run before any other stage: reach the server,
/// report its version, and show whether the target database and its tables
/// exist yet.
pub async fn run() -> Result<()> {
    env_util::preflight_snapshot("test-connection");
    let db_name = env_util::target_database();

    println!("[1] Connecting to PostgreSQL server...");
    let admin_url = env_util::admin_db_url()?;
    let mut conn = PgConnection::connect(&admin_url).await.context(
        "connection failed; check that PostgreSQL is running and DB_HOST/DB_PORT/DB_USER/DB_PASSWORD are correct",
    )?;
    println!("  [OK] Connected");

    let version: String = sqlx::query_scalar("SELECT version()")
        .persistent(false)
        .fetch_one(&mut conn)
        .await?;
    println!("[2] Server version: {}", version.split(',').next().unwrap_or(&version));

    let exists = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
        .persistent(false)
        .bind(&db_name)
        .fetch_optional(&mut conn)
        .await?
        .is_some();
    conn.close().await?;

    if !exists {
        println!("[3] Database '{db_name}' does not exist yet");
        println!("    Run 'bankrev setup' to create it");
        return Ok(());
    }
    println!("[3] Database '{db_name}' exists");

    println!("[4] Connecting to '{db_name}'...");
    let target_url = env_util::db_url()?;
    let mut conn = PgConnection::connect(&target_url)
        .await
        .with_context(|| format!("failed to connect to database '{db_name}'"))?;
    println!("  [OK] Connected");

    let tables: Vec<String> = sqlx::query(
        "SELECT table_name FROM information_schema.tables
         WHERE table_schema = 'public'
         ORDER BY table_name",
    )
    .persistent(false)
    .fetch_all(&mut conn)
    .await?
    .into_iter()
    .map(|row| row.get::<String, _>("table_name"))
    .collect();
    conn.close().await?;

    if tables.is_empty() {
        println!("[5] No tables found (database is empty)");
    } else {
        println!("[5] Found {} table(s):", tables.len());
        for t in &tables {
            println!("  - {t}");
        }
    }

    println!("\nConnection test complete.");
    Ok(())
}
