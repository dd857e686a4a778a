use anyhow::{Context, Result};

use crate::util::db::{self, Db};
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct SetupConfig {
    /// Optional override for the Postgres connection string (target database).
    pub database_url: Option<String>,
    /// Skip the CREATE DATABASE step (useful on managed servers where the
    /// database is provisioned out of band).
    pub skip_create_database: bool,
}

/// Create the target database if needed, then apply the schema migrations.
/// Both steps are idempotent; re-running setup against an existing database
/// is a no-op.
pub async fn run(cfg: SetupConfig) -> Result<()> {
    env_util::preflight_snapshot("setup");

    let db_name = env_util::target_database();

    println!("[Step 1/2] Creating database...");
    if cfg.skip_create_database {
        println!("  skipped (--skip-create-database)");
    } else {
        let admin_url = env_util::admin_db_url()?;
        let created = db::ensure_database(&admin_url, &db_name)
            .await
            .context("failed to create the target database; check DB_HOST/DB_PORT/DB_USER/DB_PASSWORD")?;
        if created {
            println!("  [OK] Database '{db_name}' created");
        } else {
            println!("  [OK] Database '{db_name}' already exists");
        }
    }

    println!("[Step 2/2] Applying schema...");
    let database_url = match cfg.database_url {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let db = Db::connect(&database_url, 2)
        .await
        .context("failed to connect to the target database")?;
    let applied = db.apply_migrations().await?;
    if applied > 0 {
        println!("  [OK] Applied {applied} migration(s)");
    } else {
        println!("  [OK] Schema already up to date");
    }

    println!("\nDatabase setup complete. Next steps:");
    println!("  1. bankrev load    -- populate the reviews table");
    println!("  2. bankrev verify  -- check data integrity");
    Ok(())
}
