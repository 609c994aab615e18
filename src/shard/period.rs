//! Day period arithmetic and partition naming
//!
//! A partition covers one calendar day in some time zone and is named
//! `<year>_<dayOfYear>` (day of year is 1-based and not zero padded).
//! The day of year is only meaningful together with its year.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone};

/// Length of one partition
pub fn day_length() -> ChronoDuration {
    ChronoDuration::hours(24)
}

/// `<year>_<dayOfYear>` for the day containing `time`, in `time`'s own zone
pub fn shard_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    format!("{}_{}", time.year(), time.ordinal())
}

/// Default partition path: `<dir>/<year>_<dayOfYear>.<ext>`
pub fn day_file_name<Tz: TimeZone>(dir: &Path, time: &DateTime<Tz>, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", shard_name(time), ext))
}

/// Midnight at the start of `date` in `tz`.
///
/// Where midnight falls into a gap (a zone skipping 00:00), the first
/// representable instant of the day is used instead.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    (0..24).find_map(|hour| {
        let local = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&local).earliest()
    })
}

/// Start of day `day_of_year` of `year` in `tz`.
///
/// Counted from January 0, so day 1 is January 1. Out-of-range days
/// normalize into the neighbouring year.
pub fn day_start<Tz: TimeZone>(tz: &Tz, year: i32, day_of_year: u32) -> Option<DateTime<Tz>> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let date = jan1.checked_add_signed(ChronoDuration::days(i64::from(day_of_year) - 1))?;
    local_midnight(tz, date)
}
