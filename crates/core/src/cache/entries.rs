//! Entry operations: storing and matching request/response pairs within a
//! generation.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{Request, Response, ResponseKind};
use bytes::Bytes;
use tokio_rusqlite::rusqlite::{self, Transaction};
use tokio_rusqlite::params;
use url::Url;

/// Row payload prepared outside the connection thread.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    kind: &'static str,
    final_url: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        Ok(Self {
            key: request_key(request),
            method: request.normalized_method(),
            url: request.cache_url().to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.as_str(),
            final_url: response.url.to_string(),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

fn insert_row(tx: &Transaction<'_>, generation: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    tx.execute(
        "INSERT INTO entries (
            generation, key, method, url, status, status_text, kind,
            final_url, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(generation, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            kind = excluded.kind,
            final_url = excluded.final_url,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.key,
            &row.method,
            &row.url,
            row.status,
            &row.status_text,
            row.kind,
            &row.final_url,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store one response under an existing `generation`. An existing entry
    /// for the same request is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheMiss` if the generation does not exist, so a late
    /// write never brings back an evicted generation.
    pub async fn put_entry(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::new(request, response)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![&generation],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::CacheMiss(format!("generation {generation} does not exist")));
                }
                insert_row(&tx, &generation, &row, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store all pairs in a single transaction, creating the generation if
    /// needed.
    pub async fn put_entries(&self, generation: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = pairs
            .iter()
            .map(|(req, res)| EntryRow::new(req, res))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![&generation, &now],
                )?;
                for row in &rows {
                    insert_row(&tx, &generation, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn match_entry(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key = request_key(request);

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(u16, String, String, String, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, kind, final_url, headers_json, body
                     FROM entries WHERE generation = ?1 AND key = ?2",
                    params![generation, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, status_text, kind, final_url, headers_json, body)) = row else {
            return Ok(None);
        };

        let headers: Vec<(String, String)> =
            serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        let url = Url::parse(&final_url).map_err(|e| Error::CorruptEntry(format!("url {final_url}: {e}")))?;

        Ok(Some(Response {
            status,
            status_text,
            headers,
            body: Bytes::from(body),
            kind: ResponseKind::parse(&kind),
            url,
        }))
    }

    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Stored request URLs in a generation, sorted.
    pub async fn entry_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let rows = stmt.query_map(params![generation], |row| row.get::<_, String>(0))?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(url: &str, body: &'static str) -> Response {
        Response {
            status: 200,
            status_text: "OK".into(),
            headers: vec![("content-type".into(), "text/html".into())],
            body: Bytes::from_static(body.as_bytes()),
            kind: ResponseKind::Basic,
            url: Url::parse(url).unwrap(),
        }
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/app/index.html";
        db.open_generation("app-v1").await.unwrap();

        db.put_entry("app-v1", &get(url), &make_response(url, "<h1>hi</h1>"))
            .await
            .unwrap();

        let hit = db.match_entry("app-v1", &get(url)).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, Bytes::from_static(b"<h1>hi</h1>"));
        assert_eq!(hit.content_type(), Some("text/html"));
        assert_eq!(hit.kind, ResponseKind::Basic);
        assert!(db.has_generation("app-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/a.js";
        db.open_generation("app-v1").await.unwrap();
        db.put_entry("app-v1", &get(url), &make_response(url, "a")).await.unwrap();

        assert!(db.match_entry("app-v2", &get(url)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_distinguishes_method() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/a.js";
        db.open_generation("app-v1").await.unwrap();
        db.put_entry("app-v1", &get(url), &make_response(url, "a")).await.unwrap();

        let head = get(url).with_method("HEAD");
        assert!(db.match_entry("app-v1", &head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_requires_existing_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/late.js";

        let result = db.put_entry("app-v1", &get(url), &make_response(url, "late")).await;

        assert!(matches!(result, Err(Error::CacheMiss(_))));
        assert!(!db.has_generation("app-v1").await.unwrap());
        assert_eq!(db.count_entries("app-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/a.js";
        db.open_generation("app-v1").await.unwrap();
        db.put_entry("app-v1", &get(url), &make_response(url, "old")).await.unwrap();
        db.put_entry("app-v1", &get(url), &make_response(url, "new")).await.unwrap();

        assert_eq!(db.count_entries("app-v1").await.unwrap(), 1);
        let hit = db.match_entry("app-v1", &get(url)).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let pairs = vec![
            (get("https://example.com/"), make_response("https://example.com/", "root")),
            (get("https://example.com/b"), make_response("https://example.com/b", "b")),
        ];
        db.put_entries("app-v1", &pairs).await.unwrap();
        assert_eq!(db.count_entries("app-v1").await.unwrap(), 2);
        assert_eq!(
            db.entry_urls("app-v1").await.unwrap(),
            vec!["https://example.com/".to_string(), "https://example.com/b".to_string()]
        );

        db.delete_generation("app-v1").await.unwrap();
        assert_eq!(db.count_entries("app-v1").await.unwrap(), 0);
    }
}
