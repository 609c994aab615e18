//! Time-ordered record identifiers
//!
//! An identifier is 8 bytes rendered as 16 lowercase hex characters:
//!
//! ```text
//! [0..4]  Unix seconds, big endian
//! [4..8]  counter, big endian
//! ```
//!
//! Big-endian fixed width makes byte order, numeric order and chronological
//! order coincide, so a range scan between two identifiers is a time scan.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Length of an identifier in hex characters
pub const ID_LEN: usize = 16;

static DEFAULT_GENERATOR: OnceLock<Arc<IdGenerator>> = OnceLock::new();

/// Source of identifiers with its own monotonic counter
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU32,
}

impl IdGenerator {
    /// Create a generator whose first identifier uses counter 1
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }

    /// Create a generator whose next counter value is `next`
    pub fn starting_at(next: u32) -> Self {
        Self {
            counter: AtomicU32::new(next.wrapping_sub(1)),
        }
    }

    /// Advance the counter and return its new value (wraps at 2^32)
    pub fn next_count(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Identifier for the current wall-clock time
    pub fn generate(&self) -> String {
        self.generate_at(&Utc::now())
    }

    /// Identifier for an explicit time, using this generator's next counter
    pub fn generate_at<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> String {
        create_id(time, self.next_count())
    }
}

/// The process-wide generator.
///
/// Every caller gets the same counter, so identifiers from different
/// engines in one process never share a counter value.
pub fn shared_generator() -> Arc<IdGenerator> {
    DEFAULT_GENERATOR.get_or_init(|| Arc::new(IdGenerator::new())).clone()
}

/// Identifier for now from the process-wide generator
pub fn generate_id() -> String {
    shared_generator().generate()
}

/// Build an identifier from a time and counter.
///
/// Counter 0 gives the smallest identifier for that second, which is what
/// range scans use as their lower bound.
///
/// Seconds are stored as a `u32`: times before 1970 or from 2106 on wrap and
/// no longer sort or decode to the time they were built from.
pub fn create_id<Tz: TimeZone>(time: &DateTime<Tz>, count: u32) -> String {
    let mut bytes = [0u8; 8];
    BigEndian::write_u32(&mut bytes[..4], time.timestamp() as u32);
    BigEndian::write_u32(&mut bytes[4..], count);
    hex::encode(bytes)
}

/// Extract the embedded timestamp (second resolution)
pub fn time_of(id: &str) -> Result<DateTime<Utc>> {
    if id.len() != ID_LEN {
        return Err(Error::invalid_id(id));
    }
    let bytes = hex::decode(id).map_err(|_| Error::invalid_id(id))?;
    let secs = BigEndian::read_u32(&bytes[..4]);
    DateTime::from_timestamp(i64::from(secs), 0).ok_or_else(|| Error::invalid_id(id))
}

/// Extract the embedded counter
pub fn counter_of(id: &str) -> Result<u32> {
    if id.len() != ID_LEN {
        return Err(Error::invalid_id(id));
    }
    let bytes = hex::decode(id).map_err(|_| Error::invalid_id(id))?;
    Ok(BigEndian::read_u32(&bytes[4..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use proptest::prelude::*;

    #[test]
    fn test_layout() {
        let t = Utc.with_ymd_and_hms(2023, 2, 14, 10, 0, 0).unwrap();
        let id = create_id(&t, 7);
        assert_eq!(id.len(), ID_LEN);
        assert_eq!(&id[..8], format!("{:08x}", t.timestamp()));
        assert_eq!(&id[8..], "00000007");
        assert_eq!(counter_of(&id).unwrap(), 7);
    }

    #[test]
    fn test_time_zone_does_not_change_id() {
        let utc = Utc.with_ymd_and_hms(2023, 2, 14, 10, 0, 0).unwrap();
        let local = utc.with_timezone(&FixedOffset::east_opt(8 * 3600).unwrap());
        assert_eq!(create_id(&utc, 1), create_id(&local, 1));
    }

    #[test]
    fn test_time_of_rejects_malformed() {
        assert!(matches!(time_of(""), Err(Error::InvalidId(_))));
        assert!(matches!(time_of("0123"), Err(Error::InvalidId(_))));
        assert!(matches!(time_of("zzzzzzzzzzzzzzzz"), Err(Error::InvalidId(_))));
        assert!(matches!(time_of("63eb5c000000000100"), Err(Error::InvalidId(_))));
    }

    #[test]
    fn test_generator_counter_is_monotonic() {
        let ids = IdGenerator::new();
        let t = Utc::now();
        let a = ids.generate_at(&t);
        let b = ids.generate_at(&t);
        assert_eq!(counter_of(&a).unwrap(), 1);
        assert_eq!(counter_of(&b).unwrap(), 2);
        assert!(a < b);
    }

    #[test]
    fn test_generators_are_independent() {
        let first = IdGenerator::new();
        let second = IdGenerator::new();
        first.next_count();
        first.next_count();
        assert_eq!(second.next_count(), 1);
    }

    #[test]
    fn test_shared_generator_is_one_counter() {
        let first = shared_generator();
        let second = shared_generator();
        assert!(Arc::ptr_eq(&first, &second));

        let a = first.next_count();
        let b = second.next_count();
        assert_ne!(a, b);
    }

    #[test]
    fn test_time_outside_u32_range_wraps() {
        let past_2106 = DateTime::from_timestamp(i64::from(u32::MAX) + 1, 0).unwrap();
        assert_eq!(&create_id(&past_2106, 0)[..8], "00000000");
        assert_eq!(time_of(&create_id(&past_2106, 0)).unwrap().timestamp(), 0);
    }

    #[test]
    fn test_counter_wraps() {
        let ids = IdGenerator::starting_at(u32::MAX);
        assert_eq!(ids.next_count(), u32::MAX);
        assert_eq!(ids.next_count(), 0);
    }

    #[test]
    fn test_generate_id_round_trip() {
        let before = Utc::now().timestamp();
        let id = generate_id();
        let after = Utc::now().timestamp();
        let secs = time_of(&id).unwrap().timestamp();
        assert!(before <= secs && secs <= after);
    }

    proptest! {
        #[test]
        fn prop_earlier_time_sorts_first(t1 in 0i64..2_000_000_000, gap in 1i64..1_000_000, c1: u32, c2: u32) {
            let a = DateTime::from_timestamp(t1, 0).unwrap();
            let b = a + Duration::seconds(gap);
            prop_assert!(create_id(&a, c1) < create_id(&b, c2));
        }

        #[test]
        fn prop_time_round_trip(secs in 0i64..i64::from(u32::MAX), nanos in 0u32..1_000_000_000, count: u32) {
            let t = DateTime::from_timestamp(secs, nanos).unwrap();
            prop_assert_eq!(time_of(&create_id(&t, count)).unwrap().timestamp(), secs);
        }
    }
}
