//! Transactional bucketed key-value storage.
//!
//! The token and credential stores only need a small slice of what a real
//! database offers: named buckets, and `get` / `put` / `delete` inside a
//! transaction. That slice is captured by [`KvStore`], [`ReadTxn`] and
//! [`Txn`].
//!
//! Backends:
//! - [`SqliteKv`]: one table per bucket, WAL journal, survives restarts
//! - [`MemoryKv`]: process-local, copy-on-write commits, for tests and embedding
//!
//! [`Backend`] picks one of them at runtime from configuration.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Invalid bucket name '{0}' (use ASCII letters, digits and '_')")]
    InvalidBucketName(String),
}

/// Read operations available inside any transaction.
pub trait ReadTxn {
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// All `(key, value)` pairs of a bucket, ordered by key.
    fn entries(&self, bucket: &str) -> Result<Vec<(String, Vec<u8>)>, KvError>;
}

/// Read-write transaction handed to [`KvStore::update`].
pub trait Txn: ReadTxn {
    /// Insert or overwrite.
    fn put(&mut self, bucket: &str, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Returns whether a value was removed. Deleting an absent key is not an error.
    fn delete(&mut self, bucket: &str, key: &str) -> Result<bool, KvError>;
}

/// A store of named buckets with transactional access.
///
/// `update` commits when the closure returns `Ok` and discards every write
/// when it returns `Err`. Separate calls are not atomic with respect to
/// each other.
pub trait KvStore: Send + Sync {
    /// Create the bucket if it does not exist yet.
    fn create_bucket(&self, name: &str) -> Result<(), KvError>;

    fn view<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, KvError>;

    fn update<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&mut dyn Txn) -> Result<T, KvError>;
}

/// Bucket names end up in SQL identifiers, so both backends hold them to the
/// same narrow alphabet.
pub(crate) fn validate_bucket_name(name: &str) -> Result<(), KvError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidBucketName(name.to_string()))
    }
}

/// Runtime-selected backend.
pub enum Backend {
    Sqlite(SqliteKv),
    Memory(MemoryKv),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }
}

impl KvStore for Backend {
    fn create_bucket(&self, name: &str) -> Result<(), KvError> {
        match self {
            Self::Sqlite(kv) => kv.create_bucket(name),
            Self::Memory(kv) => kv.create_bucket(name),
        }
    }

    fn view<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, KvError>,
    {
        match self {
            Self::Sqlite(kv) => kv.view(f),
            Self::Memory(kv) => kv.view(f),
        }
    }

    fn update<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&mut dyn Txn) -> Result<T, KvError>,
    {
        match self {
            Self::Sqlite(kv) => kv.update(f),
            Self::Memory(kv) => kv.update(f),
        }
    }
}
