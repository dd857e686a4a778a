//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Default target database when DB_DATABASE is unset.
pub const DEFAULT_DATABASE: &str = "bank_reviews";

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Name of the target database (DB_DATABASE, default `bank_reviews`).
pub fn target_database() -> String {
    env_opt("DB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string())
}

/// Resolve the DSN for the target database.
///
/// `DATABASE_URL` wins when set; otherwise the DSN is composed from the
/// individual DB_* variables the rest of the pipeline uses.
pub fn db_url() -> anyhow::Result<String> {
    init_env();
    if let Some(v) = env_opt("DATABASE_URL") {
        return Ok(v);
    }
    build_dsn(&target_database()).ok_or_else(|| {
        anyhow::anyhow!(
            "no database configuration found; set DATABASE_URL or DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_DATABASE"
        )
    })
}

/// DSN for the admin `postgres` database on the same server, used to create
/// the target database before it exists.
pub fn admin_db_url() -> anyhow::Result<String> {
    init_env();
    if let Some(v) = env_opt("DATABASE_URL") {
        return swap_database(&v, "postgres");
    }
    build_dsn("postgres").ok_or_else(|| {
        anyhow::anyhow!(
            "no database configuration found; set DATABASE_URL or DB_HOST/DB_PORT/DB_USER/DB_PASSWORD"
        )
    })
}

fn build_dsn(database: &str) -> Option<String> {
    let host = env_opt("DB_HOST").unwrap_or_else(|| "localhost".into());
    let user = env_opt("DB_USER").unwrap_or_else(|| "postgres".into());
    let password = env_opt("DB_PASSWORD").unwrap_or_else(|| "postgres".into());
    let port = env_opt("DB_PORT").unwrap_or_else(|| "5432".into());
    let ssl_mode = env_opt("DB_SSLMODE").unwrap_or_else(|| "prefer".into());

    let port_u16: u16 = port.parse::<u16>().unwrap_or(5432);

    // The password may contain reserved URL characters; build via `url::Url`
    // so username/password are percent-encoded safely.
    let mut out = url::Url::parse("postgresql://localhost").ok()?;
    out.set_username(&user).ok()?;
    out.set_password(Some(&password)).ok()?;
    out.set_host(Some(host.trim())).ok()?;
    out.set_port(Some(port_u16)).ok()?;
    out.set_path(&format!("/{database}"));
    if ssl_mode != "prefer" {
        out.query_pairs_mut().append_pair("sslmode", &ssl_mode);
    }

    Some(out.to_string())
}

/// Rewrite the database path component of an existing DSN.
fn swap_database(dsn: &str, database: &str) -> anyhow::Result<String> {
    let mut u = url::Url::parse(dsn)?;
    u.set_path(&format!("/{database}"));
    Ok(u.to_string())
}

fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }

    let val_trim = val.trim();

    // Always redact postgres DSNs even if the key isn't obviously sensitive.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme == "postgres" || scheme == "postgresql" {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }

    val_trim.to_string()
}

/// Log a consolidated, redacted snapshot of the connection configuration.
/// Called by every database-touching subcommand before connecting so failed
/// connections come with actionable context.
pub fn preflight_snapshot(title: &str) {
    init_env();
    let mut snapshot: Vec<(String, String)> = Vec::new();
    for k in [
        "DATABASE_URL",
        "DB_HOST",
        "DB_PORT",
        "DB_USER",
        "DB_PASSWORD",
        "DB_DATABASE",
    ] {
        let v = env_opt(k).unwrap_or_default();
        snapshot.push((k.to_string(), redact_value(k, &v)));
    }
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password_keys() {
        assert_eq!(redact_value("DB_PASSWORD", "hunter2"), "***");
        assert_eq!(redact_value("DB_HOST", "localhost"), "localhost");
    }

    #[test]
    fn redacts_postgres_dsn_credentials() {
        let out = redact_value(
            "DATABASE_URL",
            "postgresql://user:pw@db.example:5432/bank_reviews",
        );
        assert!(!out.contains("pw"));
        assert!(out.contains("db.example"));
    }

    #[test]
    fn swap_database_rewrites_path_only() {
        let out = swap_database("postgresql://u:p@h:5432/bank_reviews?sslmode=require", "postgres")
            .unwrap();
        assert!(out.contains("/postgres"));
        assert!(out.contains("sslmode=require"));
    }
}
