//! Time-sharded engine
//!
//! [`TsEngine`] routes every timestamp to the partition file for its
//! calendar day and keeps at most one partition open for writing. Reads of
//! other days use short-lived handles and never replace the live one, and
//! never create files for days that have no data.
//!
//! ```text
//!   write(t) ──► name_with(t) ──► Closed ──open──► Open(file)
//!                                   ▲                 │
//!                                   └──── close ◄─────┘ (other day / close())
//! ```
//!
//! Range queries walk every calendar day between the two bounds and run one
//! bounded scan per day, oldest day first.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::bucket::Bucket;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::id::{create_id, shared_generator, time_of, IdGenerator};
use crate::iter::RangeIter;
use crate::record::Record;
use crate::shard::{self, day_file_name, local_midnight, Shard};
use crate::store::Store;

type NameFn<Tz> = Box<dyn Fn(&DateTime<Tz>) -> PathBuf + Send>;

/// Where a day sits inside a queried range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPosition {
    /// Strictly between the first and last day; scanned whole
    Interior,
    /// The first day of a multi-day range
    Start,
    /// The last day of a multi-day range
    End,
    /// The only day of a single-day range
    Single,
}

impl DayPosition {
    fn classify(is_first: bool, is_last: bool) -> Self {
        match (is_first, is_last) {
            (true, true) => Self::Single,
            (true, false) => Self::Start,
            (false, true) => Self::End,
            (false, false) => Self::Interior,
        }
    }

    /// Scan bounds for this day given the range's lower and upper keys.
    /// An empty bound is open.
    pub fn bounds<'a>(&self, lower: &'a str, upper: &'a str) -> (&'a str, &'a str) {
        match self {
            Self::Interior => ("", ""),
            Self::Start => (lower, ""),
            Self::End => ("", upper),
            Self::Single => (lower, upper),
        }
    }
}

// The one partition kept open for writing
struct Live {
    file: PathBuf,
    bucket: Bucket,
}

/// Day-partitioned record store
pub struct TsEngine<Tz: TimeZone = Utc> {
    config: EngineConfig,
    tz: Tz,
    name_with: NameFn<Tz>,
    ids: Arc<IdGenerator>,
    live: Option<Live>,
}

impl<Tz: TimeZone> fmt::Debug for TsEngine<Tz> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsEngine")
            .field("directory", &self.config.directory)
            .field("current_file", &self.current_file())
            .finish()
    }
}

impl<Tz: TimeZone + 'static> TsEngine<Tz> {
    /// Create an engine naming partitions `<directory>/<year>_<dayOfYear>.<ext>`
    /// by the calendar day in `tz`.
    ///
    /// Nothing is opened or created until the first write.
    pub fn open(config: EngineConfig, tz: Tz) -> Result<Self> {
        let dir = config.directory.clone();
        let ext = config.extension.clone();
        Self::with_naming(config, tz, move |t: &DateTime<Tz>| day_file_name(&dir, t, &ext))
    }

    /// Create an engine with a caller-supplied naming function.
    ///
    /// `name_with` must map every instant of one calendar day in `tz` to the
    /// same path.
    pub fn with_naming<F>(config: EngineConfig, tz: Tz, name_with: F) -> Result<Self>
    where
        F: Fn(&DateTime<Tz>) -> PathBuf + Send + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            tz,
            name_with: Box::new(name_with),
            ids: shared_generator(),
            live: None,
        })
    }
}

impl<Tz: TimeZone> TsEngine<Tz> {
    /// Draw identifier counters from `ids` instead of the process-wide
    /// generator
    pub fn with_id_generator(mut self, ids: Arc<IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Time zone partitions are cut in
    pub fn time_zone(&self) -> &Tz {
        &self.tz
    }

    /// Path of the partition file owning `time`
    pub fn file_for<Z: TimeZone>(&self, time: &DateTime<Z>) -> PathBuf {
        (self.name_with)(&time.with_timezone(&self.tz))
    }

    /// Path of the open partition, if any
    pub fn current_file(&self) -> Option<&Path> {
        self.live.as_ref().map(|live| live.file.as_path())
    }

    /// Whether a partition is open
    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }

    /// Make the partition owning `time` the open one and return its bucket.
    ///
    /// Switching days closes the previous partition before the new one is
    /// opened. Opening waits at most the configured lock timeout. The bucket
    /// is borrowed from the engine, so the partition is only reachable until
    /// the next call that can switch days.
    pub fn ensure_open<Z: TimeZone>(&mut self, time: &DateTime<Z>) -> Result<&Bucket> {
        let file = self.file_for(time);
        let live = match self.live.take() {
            Some(live) if live.file == file => live,
            previous => {
                if let Some(previous) = previous {
                    Self::release(previous);
                }
                let bucket = self.open_partition(&file)?;
                Live { file, bucket }
            }
        };
        Ok(&self.live.insert(live).bucket)
    }

    fn release(live: Live) {
        let Live { file, bucket } = live;
        drop(bucket);
        debug!(path = %file.display(), "closed partition");
    }

    fn open_partition(&self, file: &Path) -> Result<Bucket> {
        let store = Store::open(file, &self.config.store_options())?;
        let bucket = store.create_bucket_if_not_exists(&self.config.bucket_name, self.config.encoding)?;
        debug!(path = %file.display(), "opened partition");
        Ok(bucket)
    }

    // Runs `f` on the live bucket when `file` is the open partition,
    // otherwise on a temporary handle closed before returning. Missing files
    // are not created and give `None`.
    fn with_partition<R, F>(&self, file: &Path, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&Bucket) -> Result<R>,
    {
        if let Some(live) = self.live.as_ref().filter(|live| live.file.as_path() == file) {
            return f(&live.bucket).map(Some);
        }

        if !file.exists() {
            debug!(path = %file.display(), "no partition for day");
            return Ok(None);
        }

        let store = Store::open(file, &self.config.store_options())?;
        debug!(path = %file.display(), "opened temporary partition");
        let bucket = store.bucket(&self.config.bucket_name, self.config.encoding)?;
        f(&bucket).map(Some)
    }

    /// Run `f` against the partition owning `time`, opening it if needed
    pub fn write<Z, F, R>(&mut self, time: &DateTime<Z>, f: F) -> Result<R>
    where
        Z: TimeZone,
        F: FnOnce(&Bucket) -> Result<R>,
    {
        f(self.ensure_open(time)?)
    }

    /// Store a record under a fresh identifier derived from its time
    pub fn insert<R: Record + Serialize + ?Sized>(&mut self, record: &R) -> Result<String> {
        let time = record.time();
        let id = self.ids.generate_at(&time);
        self.write(&time, |bucket| bucket.insert(&id, record))?;
        Ok(id)
    }

    /// Fetch the record stored under `id`.
    ///
    /// The partition is located from the time embedded in the identifier.
    /// A partition other than the open one is read through a temporary
    /// handle; the open partition stays as it is.
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let file = self.file_for(&time_of(id)?);
        self.with_partition(&file, |bucket| bucket.get(id))?
            .ok_or(Error::NotFound)
    }

    fn days<Z: TimeZone>(&self, start: &DateTime<Z>, end: &DateTime<Z>) -> Result<Vec<(DateTime<Tz>, DayPosition)>> {
        if start > end {
            return Err(Error::InvalidTimeRange {
                start: start.with_timezone(&Utc).to_rfc3339(),
                end: end.with_timezone(&Utc).to_rfc3339(),
            });
        }

        let start = start.with_timezone(&self.tz);
        let first = start.date_naive();
        let last = end.with_timezone(&self.tz).date_naive();

        // Step by calendar date so a short or long local day never skips or
        // repeats a partition.
        let mut days = Vec::new();
        let mut date = first;
        while date <= last {
            let at = if date == first {
                start.clone()
            } else {
                self.midnight(date)?
            };
            days.push((at, DayPosition::classify(date == first, date == last)));

            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(days)
    }

    fn midnight(&self, date: NaiveDate) -> Result<DateTime<Tz>> {
        local_midnight(&self.tz, date).ok_or_else(|| Error::InvalidTimeRange {
            start: date.to_string(),
            end: date.to_string(),
        })
    }

    /// Call `f` once per existing partition between `start` and `end`,
    /// oldest day first, with the day's position in the range.
    ///
    /// Days without a partition file are skipped.
    pub fn read<Z, F>(&self, start: &DateTime<Z>, end: &DateTime<Z>, mut f: F) -> Result<()>
    where
        Z: TimeZone,
        F: FnMut(&Bucket, DayPosition) -> Result<()>,
    {
        for (day, position) in self.days(start, end)? {
            let file = (self.name_with)(&day);
            self.with_partition(&file, |bucket| f(bucket, position))?;
        }
        Ok(())
    }

    /// Call `cb` once per record between `start` and `end`.
    ///
    /// Records arrive in day order, then key order within a day. The first
    /// error from `cb` stops the query and is returned. Fails with
    /// `InvalidTimeRange` before touching any file if `start` is after `end`.
    pub fn query<Z, F>(&self, start: &DateTime<Z>, end: &DateTime<Z>, mut cb: F) -> Result<()>
    where
        Z: TimeZone,
        F: FnMut(&RangeIter<'_>) -> Result<()>,
    {
        let lower = create_id(start, 0);
        let upper = create_id(end, 0);

        self.read(start, end, |bucket, position| {
            let (from, to) = position.bounds(&lower, &upper);
            bucket.get_range(from, to, |iter| {
                while iter.advance()? {
                    cb(&*iter)?;
                }
                Ok(())
            })
        })
    }

    /// Partitions in the engine directory, latest first
    pub fn shards(&self) -> Result<Vec<Shard<Tz>>> {
        shard::list_shards(&self.config.directory, &self.tz)
    }

    /// Remove every partition that starts before `cutoff`.
    ///
    /// The open partition is closed first if it is one of them.
    pub fn enforce_retention<Z: TimeZone>(&mut self, cutoff: &DateTime<Z>) -> Result<usize> {
        let cutoff = cutoff.with_timezone(&self.tz);
        if let Some(file) = self.current_file() {
            let doomed = self
                .shards()?
                .iter()
                .any(|s| s.path == file && s.start_time < cutoff);
            if doomed {
                self.close();
            }
        }
        shard::enforce_retention(&self.config.directory, &cutoff)
    }

    /// Apply the configured retention window relative to `now`.
    ///
    /// Keeps the day `retention_days` before `now` and everything after it.
    /// Does nothing when no window is configured.
    pub fn apply_retention<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<usize> {
        let Some(period) = self.config.retention_period() else {
            return Ok(0);
        };
        let oldest_kept = (now.with_timezone(&self.tz) - period).date_naive();
        let cutoff = self.midnight(oldest_kept)?;
        self.enforce_retention(&cutoff)
    }

    /// Release the open partition; does nothing when already closed
    pub fn close(&mut self) {
        if let Some(live) = self.live.take() {
            Self::release(live);
        }
    }
}
