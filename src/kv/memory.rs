//! In-process bucket store, used by tests and the `memory` backend.
//!
//! Nothing is persisted; contents vanish with the store.

use super::{validate_bucket_name, KvError, KvStore, ReadTxn, Txn};
use parking_lot::Mutex;
use std::collections::BTreeMap;

type Buckets = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// In-process bucket store.
///
/// `update` writes in place and keeps an undo log of the values it
/// replaced; a failed closure replays the log in reverse, so it leaves no
/// partial writes behind.
#[derive(Default)]
pub struct MemoryKv {
    buckets: Mutex<Buckets>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn create_bucket(&self, name: &str) -> Result<(), KvError> {
        validate_bucket_name(name)?;
        self.buckets.lock().entry(name.to_string()).or_default();
        Ok(())
    }

    fn view<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, KvError>,
    {
        let buckets = self.buckets.lock();
        f(&MemoryView(&*buckets))
    }

    fn update<T, F>(&self, f: F) -> Result<T, KvError>
    where
        F: FnOnce(&mut dyn Txn) -> Result<T, KvError>,
    {
        let mut buckets = self.buckets.lock();
        let mut txn = MemoryTxn {
            buckets: &mut *buckets,
            undo: Vec::new(),
        };
        match f(&mut txn) {
            Ok(out) => Ok(out),
            Err(e) => {
                txn.rollback();
                Err(e)
            }
        }
    }
}

fn bucket<'a>(
    buckets: &'a Buckets,
    name: &str,
) -> Result<&'a BTreeMap<String, Vec<u8>>, KvError> {
    validate_bucket_name(name)?;
    buckets
        .get(name)
        .ok_or_else(|| KvError::BucketNotFound(name.to_string()))
}

fn read_entries(buckets: &Buckets, name: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
    Ok(bucket(buckets, name)?
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect())
}

struct MemoryView<'a>(&'a Buckets);

impl ReadTxn for MemoryView<'_> {
    fn get(&self, bucket_name: &str, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(bucket(self.0, bucket_name)?.get(key).cloned())
    }

    fn entries(&self, bucket_name: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        read_entries(self.0, bucket_name)
    }
}

/// One overwritten or removed entry: bucket, key, previous value.
type UndoEntry = (String, String, Option<Vec<u8>>);

struct MemoryTxn<'a> {
    buckets: &'a mut Buckets,
    undo: Vec<UndoEntry>,
}

impl MemoryTxn<'_> {
    fn bucket_mut(&mut self, name: &str) -> Result<&mut BTreeMap<String, Vec<u8>>, KvError> {
        validate_bucket_name(name)?;
        self.buckets
            .get_mut(name)
            .ok_or_else(|| KvError::BucketNotFound(name.to_string()))
    }

    fn rollback(self) {
        for (bucket_name, key, previous) in self.undo.into_iter().rev() {
            // Buckets are never dropped, so the bucket is still there.
            let Some(entries) = self.buckets.get_mut(&bucket_name) else {
                continue;
            };
            match previous {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
    }
}

impl ReadTxn for MemoryTxn<'_> {
    fn get(&self, bucket_name: &str, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(bucket(&*self.buckets, bucket_name)?.get(key).cloned())
    }

    fn entries(&self, bucket_name: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        read_entries(&*self.buckets, bucket_name)
    }
}

impl Txn for MemoryTxn<'_> {
    fn put(&mut self, bucket_name: &str, key: &str, value: &[u8]) -> Result<(), KvError> {
        let previous = self
            .bucket_mut(bucket_name)?
            .insert(key.to_string(), value.to_vec());
        self.undo
            .push((bucket_name.to_string(), key.to_string(), previous));
        Ok(())
    }

    fn delete(&mut self, bucket_name: &str, key: &str) -> Result<bool, KvError> {
        match self.bucket_mut(bucket_name)?.remove(key) {
            Some(previous) => {
                self.undo
                    .push((bucket_name.to_string(), key.to_string(), Some(previous)));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
