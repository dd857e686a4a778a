use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    Connection, PgConnection, PgPool, Row,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        // PgBouncer txn mode safe
        connect_options = connect_options.statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }
}

/// Create the target database on the server if it does not exist yet.
/// Returns true when the database was created by this call.
pub async fn ensure_database(admin_url: &str, name: &str) -> Result<bool> {
    // CREATE DATABASE takes an identifier, not a bind parameter; restrict the
    // name so the statement can be assembled without quoting hazards.
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        anyhow::bail!("invalid database name '{name}': expected [A-Za-z0-9_]+");
    }

    let mut conn = PgConnection::connect(admin_url)
        .await
        .context("failed to connect to the admin 'postgres' database")?;

    let exists = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
        .persistent(false)
        .bind(name)
        .fetch_optional(&mut conn)
        .await?
        .is_some();

    if exists {
        info!(database = name, "database already exists");
        conn.close().await?;
        return Ok(false);
    }

    // CREATE DATABASE cannot run inside a transaction; raw_sql autocommits.
    sqlx::raw_sql(&format!("CREATE DATABASE \"{name}\""))
        .execute(&mut conn)
        .await
        .with_context(|| format!("CREATE DATABASE {name} failed"))?;
    info!(database = name, "database created");
    conn.close().await?;
    Ok(true)
}

impl Db {
    /// Lightweight migration runner over ./migrations: numeric-prefixed .sql
    /// files applied in order, tracked in _sqlx_migrations. Files already in
    /// the tracking table are skipped, so re-running setup is a no-op.
    pub async fn apply_migrations(&self) -> Result<usize> {
        use std::{fs, path::Path};
        let dir = Path::new("./migrations");
        if !dir.exists() {
            return Ok(0);
        }
        // Tracking table (raw_sql avoids prepared statements under PgBouncer)
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _sqlx_migrations (
                version BIGINT PRIMARY KEY,
                description TEXT,
                installed_at TIMESTAMPTZ DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;

        let applied_rows = sqlx::raw_sql("SELECT version FROM _sqlx_migrations")
            .fetch_all(&self.pool)
            .await?;
        use std::collections::HashSet;
        let mut applied: HashSet<i64> = HashSet::new();
        for r in applied_rows {
            applied.insert(r.try_get::<i64, _>(0)?);
        }

        // Collect candidate migration files: <digits>_<description>.sql
        let mut candidates: Vec<(i64, String, std::path::PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(fname) = path.file_name().and_then(|s| s.to_str()) {
                if !fname.ends_with(".sql") {
                    continue;
                }
                let num_str: String = fname.chars().take_while(|c| c.is_ascii_digit()).collect();
                if num_str.is_empty() {
                    continue;
                }
                if let Some(rest) = fname
                    .strip_prefix(num_str.as_str())
                    .and_then(|s| s.strip_prefix('_'))
                {
                    if let Ok(version) = num_str.parse::<i64>() {
                        candidates.push((version, rest.trim_end_matches(".sql").to_string(), path));
                    }
                }
            }
        }
        candidates.sort_by_key(|(v, _, _)| *v);

        let mut newly_applied = 0usize;
        for (version, desc, path) in candidates {
            if applied.contains(&version) {
                continue;
            }
            let sql = fs::read_to_string(&path)?;
            info!(version, file = ?path, "applying migration");
            let trimmed = sql.trim();
            if !trimmed.is_empty() {
                sqlx::raw_sql(trimmed).execute(&self.pool).await?;
            }
            let desc_escaped = desc.replace('\'', "''");
            let insert_stmt = format!(
                "INSERT INTO _sqlx_migrations(version, description) VALUES ({version}, '{desc_escaped}')"
            );
            sqlx::raw_sql(&insert_stmt).execute(&self.pool).await?;
            applied.insert(version);
            newly_applied += 1;
        }

        if let Ok(r) = sqlx::raw_sql(
            "SELECT version, description FROM _sqlx_migrations ORDER BY version DESC LIMIT 1",
        )
        .fetch_one(&self.pool)
        .await
        {
            let version: i64 = r.try_get(0).unwrap_or_default();
            let desc: String = r
                .try_get::<Option<String>, _>(1)
                .ok()
                .flatten()
                .unwrap_or_default();
            info!(version, desc, "migrations up-to-date");
        }
        Ok(newly_applied)
    }

    /// True when `table` resolves in the current search_path.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let visible: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .persistent(false)
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(visible)
    }
}

/// True for Postgres unique_violation (23505). Used to classify a lost
/// insert race against a unique constraint as recoverable.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
