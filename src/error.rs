//! Error handling for cocoon_ts
//!
//! This module provides the error type and result alias shared by every
//! layer of the crate, from identifier parsing up to the sharded engine.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in cocoon_ts operations
#[derive(Error, Debug)]
pub enum Error {
    /// The key is absent on a read or update
    #[error("No data found for this key")]
    NotFound,

    /// Insert collided with an existing key
    #[error("This key already exists in the bucket")]
    KeyExists,

    /// The named collection does not exist in the open store
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// The named collection already exists
    #[error("Bucket already exists: {0}")]
    BucketExists(String),

    /// A collection name must not be empty
    #[error("Bucket name required")]
    BucketNameRequired,

    /// A mutation was attempted through a read-only transaction
    #[error("Transaction not writable")]
    TxnNotWritable,

    /// A file in the shard directory does not follow `<year>_<dayOfYear>[.ext]`
    #[error("Invalid shard name: {0}")]
    InvalidShardName(String),

    /// A query range whose start lies after its end
    #[error("Time range is invalid: {start} is after {end}")]
    InvalidTimeRange {
        start: String,
        end: String,
    },

    /// The partition file lock was not acquired within the configured bound
    #[error("Timed out after {timeout:?} waiting for lock on {path:?}")]
    LockTimeout {
        path: PathBuf,
        timeout: Duration,
    },

    /// The identifier is not 16 hex characters
    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    /// The range iterator is not positioned on a record
    #[error("Iterator is not positioned on a record")]
    NotPositioned,

    /// Errors raised by the embedded key-value engine
    #[error("Store error: {0}")]
    Store(#[from] redb::Error),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to encoding or decoding record payloads
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for cocoon_ts operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new bucket not found error
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound(name.into())
    }

    /// Create a new invalid shard name error
    pub fn invalid_shard_name(name: impl Into<String>) -> Self {
        Self::InvalidShardName(name.into())
    }

    /// Create a new invalid identifier error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if this is a key exists error
    pub fn is_key_exists(&self) -> bool {
        matches!(self, Self::KeyExists)
    }

    /// Check if this is a lock timeout error
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::LockTimeout { .. } => {
                Some("Another engine holds this shard; close it or raise the lock timeout".to_string())
            }
            Self::BucketNotFound(_) => {
                Some("Create the bucket before using it, or open the shard through the engine".to_string())
            }
            Self::InvalidShardName(_) => {
                Some("Remove or rename files in the shard directory that are not shards".to_string())
            }
            Self::Io(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                Some("You don't have permission to access this file or directory".to_string())
            }
            _ => None,
        }
    }
}

impl From<redb::DatabaseError> for Error {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(err: redb::TransactionError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(err: redb::TableError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(err: redb::StorageError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(err: redb::CommitError) -> Self {
        Self::Store(err.into())
    }
}

// Conversion from bincode error to cocoon_ts error
impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(format!("Bincode error: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}
