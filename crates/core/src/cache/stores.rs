//! Named store management: open, enumerate and delete whole generations.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// Handle to one named store.
///
/// Obtained from [`CacheDb::open_store`]. The handle carries only the name;
/// every operation goes back through the shared connection, so a handle can
/// be re-opened by name at any time.
#[derive(Clone, Debug)]
pub struct Store {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Open the store called `name`, creating it if absent.
    pub async fn open_store(&self, name: &str) -> Result<Store, Error> {
        let owned = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Store { db: self.clone(), name: name.to_string() })
    }

    /// Handle to `name` without creating it.
    ///
    /// Reads through the handle see an empty store until something creates it.
    pub fn store_handle(&self, name: &str) -> Store {
        Store { db: self.clone(), name: name.to_string() }
    }

    /// Whether a store called `name` exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Every store name currently present, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the store called `name` and all its entries.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
