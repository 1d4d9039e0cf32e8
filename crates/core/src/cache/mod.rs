//! SQLite-backed store of versioned response caches.
//!
//! Each cache generation is a named bucket (e.g. `portfolio-elite-v1.0.0`)
//! holding request/response pairs keyed by normalized method + URL. This
//! module provides:
//!
//! - Generation open/list/delete, with deletes cascading to entries
//! - Write-through entry storage and request matching
//! - Automatic schema migrations
//! - WAL mode for concurrent access from overlapping fetches
//!
//! The offline controller talks to the store through [`CacheStorage`] so that
//! tests can substitute a store that fails on purpose.

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{Request, Response};

pub use connection::CacheDb;
pub use generations::GenerationInfo;

/// Named, versioned response caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open (creating if absent) the named generation. Returns `true` when it
    /// was created by this call.
    async fn open(&self, generation: &str) -> Result<bool, Error>;

    /// Names of all stored generations, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all of its entries. Returns `false` if it did
    /// not exist.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error>;

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair or none of them.
    async fn put_all(&self, generation: &str, pairs: &[(Request, Response)]) -> Result<(), Error>;

    async fn entry_count(&self, generation: &str) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, generation: &str) -> Result<bool, Error> {
        self.open_generation(generation).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .list_generations()
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.match_entry(generation, request).await
    }

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(generation, request, response).await
    }

    async fn put_all(&self, generation: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        self.put_entries(generation, pairs).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.count_entries(generation).await
    }
}
