//! Entry operations within a single named store.

use super::stores::Store;
use crate::Error;
use crate::message::{Request, Response};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Listing row for an entry; the body is summarized by its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub stored_at: String,
}

impl Store {
    /// Insert or overwrite the entry for `request`.
    ///
    /// Fails if the store does not exist; only [`CacheDb::open_store`]
    /// creates stores.
    ///
    /// [`CacheDb::open_store`]: super::CacheDb::open_store
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(vec![(request.clone(), response.clone())]).await
    }

    /// Insert every pair in one transaction: either all entries land or none.
    ///
    /// A store deleted since this handle was taken rejects the write through
    /// the `entries.store` foreign key.
    pub async fn put_all(&self, pairs: Vec<(Request, Response)>) -> Result<(), Error> {
        let name = self.name.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (request, response) in &pairs {
                    let headers_json = serde_json::to_string(&response.headers)?;
                    tx.execute(
                        "INSERT INTO entries (
                            store, key, method, url, status, status_text, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(store, key) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            status_text = excluded.status_text,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            name,
                            request.cache_key(),
                            request.method.to_ascii_uppercase(),
                            request.url,
                            response.status,
                            response.status_text,
                            headers_json,
                            response.body,
                            stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The cached response for `request`, if any.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key = request.cache_key();
        let url = request.url.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, headers_json, body FROM entries WHERE store = ?1 AND key = ?2",
                    params![name, key],
                    |row| {
                        Ok((
                            row.get::<_, u16>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { url, status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `request`. Returns false if there was none.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let name = self.name.clone();
        let key = request.cache_key();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE store = ?1 AND key = ?2", params![name, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Summaries of every entry, ordered by URL.
    pub async fn keys(&self) -> Result<Vec<EntrySummary>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, length(body), stored_at
                     FROM entries WHERE store = ?1 ORDER BY url ASC, method ASC",
                )?;
                let rows = stmt
                    .query_map(params![name], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut summaries = Vec::with_capacity(rows.len());
                for (method, url, status, headers_json, body_len, stored_at) in rows {
                    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                    let content_type = headers
                        .into_iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                        .map(|(_, v)| v);
                    summaries.push(EntrySummary {
                        method,
                        url,
                        status,
                        content_type,
                        body_len: usize::try_from(body_len).unwrap_or_default(),
                        stored_at,
                    });
                }
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the store.
    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![name], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
