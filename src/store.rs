//! One partition file opened under its exclusive lock
//!
//! A [`Store`] wraps a single redb database file. Opening it first takes the
//! `<file>.lock` sidecar lock, so only one store per file can be live at a
//! time, across threads and processes alike. Dropping the last clone closes
//! the database and then releases the lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use redb::Database;
use tracing::{debug, warn};

use crate::bucket::Bucket;
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::txn::Tx;

/// Default bound on lock acquisition
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for [`Store::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long to wait for the file lock before giving up
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

struct StoreInner {
    path: PathBuf,
    // Declared before the lock so the database closes first.
    db: Database,
    _lock: FileLock,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "closing store");
    }
}

/// Handle to an open partition file
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.inner.path).finish()
    }
}

impl Store {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = FileLock::acquire(&path, options.lock_timeout)?;
        let db = Database::create(&path)?;
        debug!(path = %path.display(), "opened store");

        Ok(Self {
            inner: Arc::new(StoreInner { path, db, _lock: lock }),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Run `f` in a writable transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and is rolled back when
    /// it returns `Err`.
    pub fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Tx) -> Result<R>,
    {
        let tx = Tx::Write(self.inner.db.begin_write()?);
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = tx.rollback() {
                    warn!(path = %self.inner.path.display(), error = %abort, "failed to roll back transaction");
                }
                Err(e)
            }
        }
    }

    /// Run `f` in a read-only transaction
    pub fn view<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Tx) -> Result<R>,
    {
        let tx = Tx::Read(self.inner.db.begin_read()?);
        f(&tx)
    }

    /// Handle to an existing bucket
    pub fn bucket(&self, name: &str, encoding: Encoding) -> Result<Bucket> {
        if !self.view(|tx| tx.has_bucket(name))? {
            return Err(Error::bucket_not_found(name));
        }
        Ok(Bucket::new(self.clone(), name, encoding))
    }

    /// Create a bucket; `BucketExists` if it is already there
    pub fn create_bucket(&self, name: &str, encoding: Encoding) -> Result<Bucket> {
        self.update(|tx| tx.create_bucket(name))?;
        Ok(Bucket::new(self.clone(), name, encoding))
    }

    /// Create a bucket unless it exists, and return a handle to it
    pub fn create_bucket_if_not_exists(&self, name: &str, encoding: Encoding) -> Result<Bucket> {
        self.update(|tx| tx.create_bucket_if_not_exists(name))?;
        Ok(Bucket::new(self.clone(), name, encoding))
    }

    /// Delete a bucket; `BucketNotFound` if it is missing
    pub fn delete_bucket(&self, name: &str) -> Result<()> {
        self.update(|tx| tx.delete_bucket(name))
    }

    /// Names of every bucket in the store
    pub fn bucket_names(&self) -> Result<Vec<String>> {
        self.view(|tx| tx.bucket_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_and_lock() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("2023_45.ts");

        let store = Store::open(&path, &StoreOptions::default())?;
        assert_eq!(store.path(), path);
        assert!(path.exists());
        assert!(crate::lock::lock_path(&path).exists());
        Ok(())
    }

    #[test]
    fn test_second_open_times_out() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("2023_45.ts");
        let options = StoreOptions {
            lock_timeout: Duration::from_millis(100),
        };

        let first = Store::open(&path, &options)?;
        let err = Store::open(&path, &options).unwrap_err();
        assert!(err.is_lock_timeout());

        drop(first);
        Store::open(&path, &options)?;
        Ok(())
    }

    #[test]
    fn test_bucket_management() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(dir.path().join("2023_45.ts"), &StoreOptions::default())?;

        assert!(matches!(
            store.bucket("records", Encoding::Bincode),
            Err(Error::BucketNotFound(_))
        ));

        store.create_bucket("records", Encoding::Bincode)?;
        assert!(matches!(
            store.create_bucket("records", Encoding::Bincode),
            Err(Error::BucketExists(_))
        ));
        store.create_bucket_if_not_exists("records", Encoding::Bincode)?;
        store.create_bucket_if_not_exists("audit", Encoding::Json)?;

        let mut names = store.bucket_names()?;
        names.sort();
        assert_eq!(names, ["audit", "records"]);

        store.delete_bucket("audit")?;
        assert!(matches!(store.delete_bucket("audit"), Err(Error::BucketNotFound(_))));
        assert!(matches!(
            store.create_bucket("", Encoding::Bincode),
            Err(Error::BucketNameRequired)
        ));
        Ok(())
    }

    #[test]
    fn test_view_is_read_only() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(dir.path().join("2023_45.ts"), &StoreOptions::default())?;
        store.create_bucket("records", Encoding::Bincode)?;

        let err = store.view(|tx| tx.put("records", b"k", b"v")).unwrap_err();
        assert!(matches!(err, Error::TxnNotWritable));
        let err = store.view(|tx| tx.create_bucket("other")).unwrap_err();
        assert!(matches!(err, Error::TxnNotWritable));
        assert!(store.view(|tx| Ok(!tx.is_writable()))?);
        Ok(())
    }

    #[test]
    fn test_failed_update_rolls_back() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::open(dir.path().join("2023_45.ts"), &StoreOptions::default())?;
        store.create_bucket("records", Encoding::Bincode)?;

        let result: Result<()> = store.update(|tx| {
            tx.put("records", b"k", b"v")?;
            Err(Error::NotFound)
        });
        assert!(result.is_err());
        assert_eq!(store.view(|tx| tx.get("records", b"k"))?, None);
        Ok(())
    }
}
