//! Shard descriptor
//!
//! Describes one partition file found on disk and the day it covers.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use crate::shard::period::day_length;

/// One partition file and the day it covers
#[derive(Debug, Clone)]
pub struct Shard<Tz: TimeZone = Utc> {
    /// Path of the partition file
    pub path: PathBuf,
    /// Local midnight of the covered day (inclusive)
    pub start_time: DateTime<Tz>,
    /// `start_time` plus 24 hours (exclusive)
    pub end_time: DateTime<Tz>,
}

impl<Tz: TimeZone> Shard<Tz> {
    /// Create a shard starting at `start_time`
    pub fn new(path: impl Into<PathBuf>, start_time: DateTime<Tz>) -> Self {
        let end_time = start_time.clone() + day_length();
        Self {
            path: path.into(),
            start_time,
            end_time,
        }
    }

    /// Check if a timestamp is in this shard's time range
    pub fn contains<Z: TimeZone>(&self, timestamp: &DateTime<Z>) -> bool {
        *timestamp >= self.start_time && *timestamp < self.end_time
    }

    /// File name of the partition
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Path of the partition file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Latest-covering shard first.
impl<Tz: TimeZone> Ord for Shard<Tz> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .end_time
            .cmp(&self.end_time)
            .then_with(|| other.start_time.cmp(&self.start_time))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl<Tz: TimeZone> PartialOrd for Shard<Tz> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Tz: TimeZone> PartialEq for Shard<Tz> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<Tz: TimeZone> Eq for Shard<Tz> {}
