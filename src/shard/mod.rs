//! Day partitions on disk
//!
//! This module names partition files, discovers them in a directory and
//! prunes expired ones. Each shard is one file covering one calendar day,
//! named `<year>_<dayOfYear>[.ext]`. Nothing here opens a partition; it only
//! works with names, times and files.

mod info;
mod period;
mod util;

pub use info::Shard;
pub use period::{day_file_name, day_length, day_start, local_midnight, shard_name};
pub use util::{enforce_retention, list_shards, parse_shard_name};
