//! SQLite-backed bucket store.
//!
//! Each bucket is a table `bucket_<name> (key TEXT PRIMARY KEY, value BLOB)`.

use super::{validate_bucket_name, KvError, KvStore, ReadTxn, Txn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) the database file, creating parent directories as needed.
    pub fn open(db_path: &Path) -> Result<Self, KvError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        tracing::debug!(path = %db_path.display(), "Opened SQLite key-value store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database; contents vanish on drop.
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self, KvError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn table_name(bucket: &str) -> Result<String, KvError> {
    validate_bucket_name(bucket)?;
    Ok(format!("bucket_{bucket}"))
}

impl KvStore for SqliteKv {
    fn create_bucket(&self, name: &str) -> Result<(), KvError> {
        let table = table_name(name)?;
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );"
        ))?;
        Ok(())
    }

    fn view<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, KvError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let txn = SqliteTxn { conn: &tx };
        // Read-only: dropping `tx` rolls back, which is all a view needs.
        f(&txn)
    }

    fn update<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&mut dyn Txn) -> Result<T, KvError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let out = {
            let mut txn = SqliteTxn { conn: &tx };
            f(&mut txn)?
        };
        tx.commit()?;
        Ok(out)
    }
}

struct SqliteTxn<'a> {
    conn: &'a Connection,
}

impl SqliteTxn<'_> {
    /// Resolve a bucket to its table, failing if it was never created.
    fn table(&self, bucket: &str) -> Result<String, KvError> {
        let table = table_name(bucket)?;
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            Ok(table)
        } else {
            Err(KvError::BucketNotFound(bucket.to_string()))
        }
    }
}

impl ReadTxn for SqliteTxn<'_> {
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let table = self.table(bucket)?;
        let value = self
            .conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn entries(&self, bucket: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        let table = self.table(bucket)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT key, value FROM {table} ORDER BY key"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Txn for SqliteTxn<'_> {
    fn put(&mut self, bucket: &str, key: &str, value: &[u8]) -> Result<(), KvError> {
        let table = self.table(bucket)?;
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, bucket: &str, key: &str) -> Result<bool, KvError> {
        let table = self.table(bucket)?;
        let deleted = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE key = ?1"), params![key])?;
        Ok(deleted > 0)
    }
}
