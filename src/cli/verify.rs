use anyhow::{Context, Result};

use crate::etl::verify::VerificationReport;
use crate::util::db::Db;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct VerifyConfig {
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
}

/// Run the read-only verification queries and print the report.
pub async fn run(cfg: VerifyConfig) -> Result<()> {
    env_util::preflight_snapshot("verify");

    let database_url = match cfg.database_url {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let db = Db::connect(&database_url, 2)
        .await
        .context("failed to connect to the target database; run 'bankrev setup' first")?;

    for table in ["banks", "reviews"] {
        if !db.table_exists(table).await? {
            anyhow::bail!("table '{table}' does not exist; run 'bankrev setup' first");
        }
    }

    let report = VerificationReport::gather(&db.pool).await?;
    println!("{}", report.render());
    Ok(())
}
