//! Preference persistence on the cache database.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::PreferenceStore;
use crate::{CacheDb, Error};

impl CacheDb {
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value FROM preferences WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl PreferenceStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.get_preference(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.set_preference(key, value).await
    }
}
