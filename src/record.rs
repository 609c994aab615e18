use chrono::{DateTime, Utc};

/// A value stored by the engine.
///
/// The engine never looks inside a record; it only needs the record's
/// logical time to pick the day partition and to build its identifier.
pub trait Record {
    /// Logical creation time
    fn time(&self) -> DateTime<Utc>;
}

impl<R: Record + ?Sized> Record for &R {
    fn time(&self) -> DateTime<Utc> {
        (**self).time()
    }
}
