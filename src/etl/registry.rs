//! Bank reference-data resolver: maps display names to bank_ids, creating
//! rows on first encounter. Keyed on the bank_name unique constraint so the
//! mapping is stable across runs.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use sqlx::PgPool;
use tracing::info;

use crate::util::db::is_unique_violation;

/// Resolve every distinct bank name in encounter order to its bank_id,
/// creating missing banks. Re-running with the same names never creates a
/// second row per name.
pub async fn resolve_banks<'a, I>(pool: &PgPool, names: I) -> Result<IndexMap<String, i32>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map: IndexMap<String, i32> = IndexMap::new();
    for name in distinct_bank_names(names) {
        let id = get_or_create_bank(pool, &name, None).await?;
        map.insert(name, id);
    }
    Ok(map)
}

/// Get the bank_id for a name, inserting the bank if it does not exist.
///
/// Attempts the insert and classifies a unique_violation on bank_name as a
/// lost race: the existing id is re-read instead of surfacing the constraint
/// failure to the caller.
pub async fn get_or_create_bank(
    pool: &PgPool,
    bank_name: &str,
    app_name: Option<&str>,
) -> Result<i32> {
    if let Some(id) = select_bank_id(pool, bank_name).await? {
        return Ok(id);
    }

    let inserted = sqlx::query_scalar::<_, i32>(
        "INSERT INTO banks (bank_name, app_name) VALUES ($1, $2) RETURNING bank_id",
    )
    .persistent(false)
    .bind(bank_name)
    .bind(app_name.unwrap_or(bank_name))
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(id) => {
            info!(bank = bank_name, bank_id = id, "created bank");
            Ok(id)
        }
        // Another resolver created the row between our select and insert.
        Err(e) if is_unique_violation(&e) => select_bank_id(pool, bank_name)
            .await?
            .with_context(|| format!("bank '{bank_name}' vanished between insert and re-read")),
        Err(e) => Err(e.into()),
    }
}

async fn select_bank_id(pool: &PgPool, bank_name: &str) -> Result<Option<i32>> {
    let id: Option<i32> = sqlx::query_scalar("SELECT bank_id FROM banks WHERE bank_name = $1")
        .persistent(false)
        .bind(bank_name)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Distinct, trimmed bank names in first-seen order.
pub fn distinct_bank_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: IndexMap<String, ()> = IndexMap::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() {
            seen.entry(name.to_string()).or_insert(());
        }
    }
    seen.into_keys().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_names_preserve_first_seen_order() {
        let names = ["Dashen Bank", "CBE", "Dashen Bank", " CBE ", "BOA"];
        assert_eq!(
            distinct_bank_names(names),
            vec!["Dashen Bank", "CBE", "BOA"]
        );
    }

    #[test]
    fn blank_names_are_skipped() {
        let names = ["", "  ", "CBE"];
        assert_eq!(distinct_bank_names(names), vec!["CBE"]);
    }
}
