//! Utility functions for shard management
//!
//! Discovers partition files in a directory and prunes the ones that fall
//! outside a retention window.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::lock::LOCK_SUFFIX;
use crate::shard::period::day_start;
use crate::shard::Shard;

/// Parse `<year>_<dayOfYear>[.ext]` into its two numbers
pub fn parse_shard_name(name: &str) -> Result<(i32, u32)> {
    let stem = name.split('.').next().unwrap_or_default();
    let mut parts = stem.split('_');

    let (Some(year), Some(day), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::invalid_shard_name(name));
    };

    let year = year.parse::<i32>().map_err(|_| Error::invalid_shard_name(name))?;
    let day = day.parse::<u32>().map_err(|_| Error::invalid_shard_name(name))?;
    Ok((year, day))
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(LOCK_SUFFIX)
}

/// List the shards in `dir`, latest first.
///
/// The directory is created if missing. Subdirectories, dot-files and lock
/// sidecars are skipped; any other file whose name does not parse fails the
/// whole listing.
pub fn list_shards<Tz: TimeZone>(dir: &Path, tz: &Tz) -> Result<Vec<Shard<Tz>>> {
    fs::create_dir_all(dir)?;

    let mut shards = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if is_ignored(&name) {
            continue;
        }

        let (year, day) = parse_shard_name(&name)?;
        let start = day_start(tz, year, day).ok_or_else(|| Error::invalid_shard_name(name.to_string()))?;
        debug!(shard = %name, year, day, "discovered shard");
        shards.push(Shard::new(entry.path(), start));
    }

    shards.sort();
    Ok(shards)
}

/// Remove every shard in `dir` that starts before `cutoff`.
///
/// Shards are evaluated in `cutoff`'s time zone. The sweep stops at the
/// first failed removal; shards already removed stay removed. Returns the
/// number of shards removed.
///
/// Only data files are removed. A shard's `.lock` sidecar stays, since a
/// process may still hold a lock on it.
pub fn enforce_retention<Tz: TimeZone>(dir: &Path, cutoff: &DateTime<Tz>) -> Result<usize> {
    let mut removed = 0;
    for shard in list_shards(dir, &cutoff.timezone())? {
        if shard.start_time >= *cutoff {
            continue;
        }

        fs::remove_file(&shard.path)?;

        info!(path = %shard.path.display(), "removed expired shard");
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{lock_path, FileLock};
    use chrono::{Duration, FixedOffset, Utc};
    use std::fs::File;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> Result<()> {
        File::create(dir.join(name))?;
        Ok(())
    }

    #[test]
    fn test_parse_shard_name() {
        assert_eq!(parse_shard_name("2023_45").unwrap(), (2023, 45));
        assert_eq!(parse_shard_name("2023_45.ts").unwrap(), (2023, 45));
        assert_eq!(parse_shard_name("2024_366.db.bak").unwrap(), (2024, 366));

        for bad in ["notes.txt", "2023", "2023_45_1.ts", "2023_x", "_45", ""] {
            assert!(matches!(parse_shard_name(bad), Err(Error::InvalidShardName(_))), "{}", bad);
        }
    }

    #[test]
    fn test_list_shards_orders_latest_first() -> Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), "2023_45")?;
        touch(dir.path(), "2023_46")?;

        let shards = list_shards(dir.path(), &Utc)?;
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].file_name(), Some("2023_46"));
        assert_eq!(shards[1].file_name(), Some("2023_45"));
        assert_eq!(shards[1].start_time + Duration::days(1), shards[0].start_time);
        assert_eq!(shards[1].start_time, Utc.with_ymd_and_hms(2023, 2, 14, 0, 0, 0).unwrap());
        assert_eq!(shards[1].end_time, shards[0].start_time);
        Ok(())
    }

    #[test]
    fn test_list_shards_skips_non_shards() -> Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), "2023_45.ts")?;
        touch(dir.path(), "2023_45.ts.lock")?;
        touch(dir.path(), ".DS_Store")?;
        fs::create_dir(dir.path().join("archive"))?;

        let shards = list_shards(dir.path(), &Utc)?;
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].file_name(), Some("2023_45.ts"));
        Ok(())
    }

    #[test]
    fn test_list_shards_rejects_stray_file() -> Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), "2023_45.ts")?;
        touch(dir.path(), "notes.txt")?;

        let err = list_shards(dir.path(), &Utc).unwrap_err();
        assert!(matches!(err, Error::InvalidShardName(ref name) if name == "notes.txt"));
        Ok(())
    }

    #[test]
    fn test_list_shards_creates_directory() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("shards");

        assert!(list_shards(&missing, &Utc)?.is_empty());
        assert!(missing.is_dir());
        Ok(())
    }

    #[test]
    fn test_list_shards_leap_year_and_zone() -> Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), "2024_60.ts")?;
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();

        let shards = list_shards(dir.path(), &tz)?;
        let leap_day = tz.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(shards[0].start_time, leap_day);
        assert!(shards[0].contains(&(leap_day + Duration::hours(12))));
        Ok(())
    }

    #[test]
    fn test_enforce_retention_keeps_held_lock() -> Result<()> {
        let dir = tempdir()?;
        let shard = dir.path().join("2023_45.ts");
        touch(dir.path(), "2023_45.ts")?;
        let held = FileLock::acquire(&shard, StdDuration::from_millis(100))?;

        let cutoff = Utc.with_ymd_and_hms(2023, 2, 15, 0, 0, 0).unwrap();
        assert_eq!(enforce_retention(dir.path(), &cutoff)?, 1);
        assert!(lock_path(&shard).exists());

        // A newcomer contends for the same lock instead of a fresh file.
        let err = FileLock::acquire(&shard, StdDuration::from_millis(100)).unwrap_err();
        assert!(err.is_lock_timeout());
        drop(held);
        FileLock::acquire(&shard, StdDuration::from_millis(100))?;
        Ok(())
    }

    #[test]
    fn test_enforce_retention() -> Result<()> {
        let dir = tempdir()?;
        for name in ["2023_45.ts", "2023_45.ts.lock", "2023_46.ts", "2023_47.ts"] {
            touch(dir.path(), name)?;
        }

        let day1 = Utc.with_ymd_and_hms(2023, 2, 15, 0, 0, 0).unwrap();
        assert_eq!(enforce_retention(dir.path(), &day1)?, 1);

        assert!(!dir.path().join("2023_45.ts").exists());
        assert!(dir.path().join("2023_45.ts.lock").exists());
        let left: Vec<_> = list_shards(dir.path(), &Utc)?
            .iter()
            .filter_map(|s| s.file_name().map(str::to_string))
            .collect();
        assert_eq!(left, ["2023_47.ts", "2023_46.ts"]);

        // Nothing older is left.
        assert_eq!(enforce_retention(dir.path(), &day1)?, 0);
        Ok(())
    }
}
