//! Generation (named cache bucket) operations.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A stored generation and when it was first opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
}

impl CacheDb {
    /// Create the generation if it does not exist yet.
    ///
    /// Returns `true` if this call created it.
    pub async fn open_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All generations, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare("SELECT name, created_at FROM generations ORDER BY created_at ASC, name ASC")?;
                let rows = stmt.query_map([], |row| Ok(GenerationInfo { name: row.get(0)?, created_at: row.get(1)? }))?;

                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation; its entries go with it.
    ///
    /// Returns `false` if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
