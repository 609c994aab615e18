//! Named record collections inside a partition
//!
//! A [`Bucket`] is a cheap, cloneable handle to one collection in a
//! [`Store`]. Each call runs in its own transaction: reads in a read-only one,
//! writes in a writable one. Values go through the bucket's [`Encoding`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::iter::RangeIter;
use crate::store::Store;
use crate::txn::Batch;

/// Handle to one collection of records
#[derive(Debug, Clone)]
pub struct Bucket {
    store: Store,
    name: String,
    encoding: Encoding,
}

impl Bucket {
    pub(crate) fn new(store: Store, name: &str, encoding: Encoding) -> Self {
        Self {
            store,
            name: name.to_string(),
            encoding,
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoding used for values
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Store the bucket lives in
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Decode the value stored under `key`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .store
            .view(|tx| tx.get(&self.name, key.as_bytes()))?
            .ok_or(Error::NotFound)?;
        self.encoding.decode(&bytes)
    }

    /// Store under a new key; `KeyExists` if it is taken
    pub fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.write(|batch| batch.insert(key, value))
    }

    /// Overwrite an existing key; `NotFound` if it is absent
    pub fn update<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.write(|batch| batch.update(key, value))
    }

    /// Store whether or not the key exists
    pub fn upsert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.write(|batch| batch.upsert(key, value))
    }

    /// Remove a key; absent keys are not an error
    pub fn delete(&self, key: &str) -> Result<()> {
        self.write(|batch| batch.delete(key))
    }

    /// Remove every key in `[start, end]`. An empty bound is open on that
    /// side. Returns the number of keys removed.
    pub fn delete_range(&self, start: &str, end: &str) -> Result<usize> {
        let removed = self
            .store
            .update(|tx| tx.delete_range(&self.name, start.as_bytes(), end.as_bytes()))?;
        Ok(removed)
    }

    /// Run several mutations as one atomic unit.
    ///
    /// If `f` or any step inside it fails, nothing is written.
    pub fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Batch<'_>) -> Result<()>,
    {
        self.store
            .update(|tx| f(&Batch::new(tx, &self.name, self.encoding)))
    }

    /// Iterate the keys in `[start, end]` inside one read transaction
    pub fn get_range<F, R>(&self, start: &str, end: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut RangeIter<'_>) -> Result<R>,
    {
        self.store.view(|tx| {
            tx.range(&self.name, start.as_bytes(), end.as_bytes(), self.encoding, f)
        })
    }

    /// Iterate every key in the bucket
    pub fn for_each<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut RangeIter<'_>) -> Result<R>,
    {
        self.get_range("", "", f)
    }

    /// Number of keys
    pub fn len(&self) -> Result<u64> {
        self.store.view(|tx| tx.len(&self.name))
    }

    /// Whether the bucket holds no keys
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
