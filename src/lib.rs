//! cocoon_ts: day-sharded, time-ordered record storage
//!
//! Records are kept in one embedded database file per calendar day. Every
//! record key is a time-ordered identifier, so a range of keys inside a day
//! is a range of time, and a query over several days is a sequence of
//! per-day range scans.
//!
//! ```no_run
//! use chrono::{DateTime, Duration, Utc};
//! use cocoon_ts::{EngineConfig, Record, TsEngine};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Reading {
//!     at: DateTime<Utc>,
//!     celsius: f32,
//! }
//!
//! impl Record for Reading {
//!     fn time(&self) -> DateTime<Utc> {
//!         self.at
//!     }
//! }
//!
//! # fn main() -> cocoon_ts::Result<()> {
//! let config = EngineConfig::new().with_directory("/var/lib/readings");
//! let mut engine = TsEngine::open(config, Utc)?;
//!
//! let now = Utc::now();
//! engine.insert(&Reading { at: now, celsius: 21.5 })?;
//!
//! engine.query(&(now - Duration::days(2)), &now, |iter| {
//!     let reading: Reading = iter.read()?;
//!     println!("{} {}", reading.at, reading.celsius);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod id;
pub mod iter;
pub mod lock;
pub mod record;
pub mod shard;
pub mod store;
pub mod txn;

pub use bucket::Bucket;
pub use config::EngineConfig;
pub use encoding::Encoding;
pub use engine::{DayPosition, TsEngine};
pub use error::{Error, Result};
pub use id::{counter_of, create_id, generate_id, shared_generator, time_of, IdGenerator};
pub use iter::{IterState, RangeIter};
pub use record::Record;
pub use shard::{enforce_retention, list_shards, Shard};
pub use store::{Store, StoreOptions};
pub use txn::{Batch, Tx};
