//! Transactions over a partition file
//!
//! A [`Tx`] is either read-only or writable. Every bucket operation runs
//! inside exactly one of them; mutations through a read-only transaction fail
//! with [`Error::TxnNotWritable`].

use redb::{
    ReadOnlyTable, ReadTransaction, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
    TableError, TableHandle, WriteTransaction,
};
use serde::Serialize;

use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::iter::{Raw, RangeIter, TableCursor};

fn definition(name: &str) -> TableDefinition<'_, Raw, Raw> {
    TableDefinition::new(name)
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::BucketNameRequired);
    }
    Ok(())
}

fn scan_table<T, F, R>(table: &T, start: &[u8], end: &[u8], encoding: Encoding, f: F) -> Result<R>
where
    T: ReadableTable<Raw, Raw>,
    F: FnOnce(&mut RangeIter<'_>) -> Result<R>,
{
    let mut iter = RangeIter::new(Box::new(TableCursor::new(table)), start, end, encoding);
    f(&mut iter)
}

/// A read-only or writable transaction on one store
pub enum Tx {
    /// Snapshot reads only
    Read(ReadTransaction),
    /// Reads and writes, applied atomically on commit
    Write(WriteTransaction),
}

impl Tx {
    /// Whether mutations are allowed
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    fn writer(&self) -> Result<&WriteTransaction> {
        match self {
            Self::Write(txn) => Ok(txn),
            Self::Read(_) => Err(Error::TxnNotWritable),
        }
    }

    /// Whether the named bucket exists
    pub fn has_bucket(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        let found = match self {
            Self::Read(txn) => txn.list_tables()?.any(|table| table.name() == name),
            Self::Write(txn) => txn.list_tables()?.any(|table| table.name() == name),
        };
        Ok(found)
    }

    /// Names of every bucket in the store
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        let names = match self {
            Self::Read(txn) => txn.list_tables()?.map(|t| t.name().to_string()).collect(),
            Self::Write(txn) => txn.list_tables()?.map(|t| t.name().to_string()).collect(),
        };
        Ok(names)
    }

    /// Create a bucket, failing if it already exists
    pub fn create_bucket(&self, name: &str) -> Result<()> {
        let txn = self.writer()?;
        if self.has_bucket(name)? {
            return Err(Error::BucketExists(name.to_string()));
        }
        txn.open_table(definition(name))?;
        Ok(())
    }

    /// Create a bucket unless it already exists
    pub fn create_bucket_if_not_exists(&self, name: &str) -> Result<()> {
        let txn = self.writer()?;
        check_name(name)?;
        txn.open_table(definition(name))?;
        Ok(())
    }

    /// Delete a bucket and all of its keys
    pub fn delete_bucket(&self, name: &str) -> Result<()> {
        let txn = self.writer()?;
        check_name(name)?;
        if !txn.delete_table(definition(name))? {
            return Err(Error::bucket_not_found(name));
        }
        Ok(())
    }

    fn read_table(txn: &ReadTransaction, name: &str) -> Result<ReadOnlyTable<Raw, Raw>> {
        txn.open_table(definition(name)).map_err(|e| match e {
            TableError::TableDoesNotExist(_) => Error::bucket_not_found(name),
            other => other.into(),
        })
    }

    // Opening a table in a write transaction creates it, so check first.
    fn write_table<'t>(&self, txn: &'t WriteTransaction, name: &str) -> Result<Table<'t, Raw, Raw>> {
        if !self.has_bucket(name)? {
            return Err(Error::bucket_not_found(name));
        }
        Ok(txn.open_table(definition(name))?)
    }

    /// Raw value stored under `key`
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_name(bucket)?;
        let value = match self {
            Self::Read(txn) => {
                let table = Self::read_table(txn, bucket)?;
                let value = table.get(key)?.map(|v| v.value().to_vec());
                value
            }
            Self::Write(txn) => {
                let table = self.write_table(txn, bucket)?;
                let value = table.get(key)?.map(|v| v.value().to_vec());
                value
            }
        };
        Ok(value)
    }

    /// Store raw bytes under `key`, replacing any previous value
    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self.writer()?;
        let mut table = self.write_table(txn, bucket)?;
        table.insert(key, value)?;
        Ok(())
    }

    /// Remove `key`; absent keys are ignored
    pub fn delete(&self, bucket: &str, key: &[u8]) -> Result<()> {
        let txn = self.writer()?;
        let mut table = self.write_table(txn, bucket)?;
        table.remove(key)?;
        Ok(())
    }

    /// Number of keys in a bucket
    pub fn len(&self, bucket: &str) -> Result<u64> {
        check_name(bucket)?;
        let len = match self {
            Self::Read(txn) => Self::read_table(txn, bucket)?.len()?,
            Self::Write(txn) => self.write_table(txn, bucket)?.len()?,
        };
        Ok(len)
    }

    /// Run `f` over a cursor clipped to `[start, end]`
    pub fn range<F, R>(&self, bucket: &str, start: &[u8], end: &[u8], encoding: Encoding, f: F) -> Result<R>
    where
        F: FnOnce(&mut RangeIter<'_>) -> Result<R>,
    {
        check_name(bucket)?;
        match self {
            Self::Read(txn) => {
                let table = Self::read_table(txn, bucket)?;
                scan_table(&table, start, end, encoding, f)
            }
            Self::Write(txn) => {
                let table = self.write_table(txn, bucket)?;
                scan_table(&table, start, end, encoding, f)
            }
        }
    }

    /// Remove every key in `[start, end]` and return how many were removed
    pub fn delete_range(&self, bucket: &str, start: &[u8], end: &[u8]) -> Result<usize> {
        let txn = self.writer()?;
        let mut table = self.write_table(txn, bucket)?;
        let keys = scan_table(&table, start, end, Encoding::default(), |iter| iter.remaining_keys())?;
        for key in &keys {
            table.remove(key.as_slice())?;
        }
        Ok(keys.len())
    }

    /// Apply a writable transaction; a no-op for read-only ones
    pub fn commit(self) -> Result<()> {
        match self {
            Self::Write(txn) => Ok(txn.commit()?),
            Self::Read(_) => Ok(()),
        }
    }

    /// Discard every change made in this transaction
    pub fn rollback(self) -> Result<()> {
        match self {
            Self::Write(txn) => Ok(txn.abort()?),
            Self::Read(_) => Ok(()),
        }
    }
}

/// Mutations available inside [`Bucket::write`](crate::Bucket::write)
///
/// A batch can only change the bucket it was created for; every step shares
/// the surrounding transaction, so the batch lands entirely or not at all.
pub struct Batch<'a> {
    tx: &'a Tx,
    bucket: &'a str,
    encoding: Encoding,
}

impl<'a> Batch<'a> {
    /// Bind a batch to one bucket of a transaction
    pub fn new(tx: &'a Tx, bucket: &'a str, encoding: Encoding) -> Self {
        Self { tx, bucket, encoding }
    }

    /// Store `value` under a new key; `KeyExists` if the key is taken
    pub fn insert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.tx.writer()?;
        if self.tx.get(self.bucket, key.as_bytes())?.is_some() {
            return Err(Error::KeyExists);
        }
        self.upsert(key, value)
    }

    /// Overwrite an existing key; `NotFound` if it is absent
    pub fn update<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.tx.writer()?;
        if self.tx.get(self.bucket, key.as_bytes())?.is_none() {
            return Err(Error::NotFound);
        }
        self.upsert(key, value)
    }

    /// Store `value` whether or not the key exists
    pub fn upsert<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = self.encoding.encode(value)?;
        self.tx.put(self.bucket, key.as_bytes(), &bytes)
    }

    /// Remove a key if present
    pub fn delete(&self, key: &str) -> Result<()> {
        self.tx.delete(self.bucket, key.as_bytes())
    }
}
