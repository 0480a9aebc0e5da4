//! Versioned schema for the document store.
//!
//! Each migration runs in its own transaction together with the row that
//! records it, so a failed migration leaves nothing half-applied.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

type Migration = (&'static str, &'static str, &'static str);

/// `(version, name, sql)`, applied in order.
const MIGRATIONS: &[Migration] = &[
    (
        "001",
        "documents",
        include_str!("migrations/001_documents.sql"),
    ),
    (
        "002",
        "owner_index",
        include_str!("migrations/002_owner_index.sql"),
    ),
];

/// Bring the schema up to date. Returns how many migrations ran.
pub fn run_migrations(conn: &mut Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = applied_versions(conn)?;
    let mut ran = 0;
    for &(version, name, sql) in MIGRATIONS {
        if applied.contains(version) {
            continue;
        }
        tracing::info!(version, name, "Applying migration");

        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Migration {version} ({name}) failed"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            (version, name, chrono::Utc::now().to_rfc3339()),
        )?;
        tx.commit()?;
        ran += 1;
    }

    Ok(ran)
}

fn applied_versions(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<HashSet<String>, _>>()?;
    Ok(versions)
}
