//! Database schema migrations.
//!
//! Applied migrations are recorded in `_migrations`; each pending one runs
//! inside its own transaction together with its bookkeeping row.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// A single schema step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Migrations in application order. Versions must be strictly increasing.
const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "generations", sql: include_str!("../../migrations/001_generations.sql") },
    Migration { version: 2, name: "preferences", sql: include_str!("../../migrations/002_preferences.sql") },
];

/// Latest schema version known to this build.
#[cfg(test)]
fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute; the failing
/// migration is rolled back and later ones are not attempted.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name)))?;
            tx.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = migration.version, name = migration.name, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
