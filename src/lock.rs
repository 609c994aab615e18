//! Exclusive partition locks
//!
//! Every partition file `<name>` is guarded by an advisory lock on the
//! sidecar `<name>.lock`. Acquisition polls until a deadline instead of
//! blocking forever, so a second writer fails with
//! [`Error::LockTimeout`](crate::Error::LockTimeout) rather than hanging.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Suffix of lock sidecar files
pub const LOCK_SUFFIX: &str = ".lock";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Path of the lock sidecar for a partition file
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub(crate) struct FileLock {
    path: PathBuf,
    file: File,
}

impl FileLock {
    /// Acquire the lock for `path`, waiting at most `timeout`
    pub(crate) fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = lock_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %lock_path.display(), "acquired partition lock");
                    return Ok(Self { path: lock_path, file });
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(e.into()),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::LockTimeout { path: lock_path, timeout });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Path of the lock sidecar
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release partition lock");
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
