//! Bounded range iteration over a bucket
//!
//! [`RangeIter`] walks a bucket's keys in ascending byte order, clipped to an
//! inclusive `[start, end]` window where an empty bound is open. The same
//! iterator drives range reads and range deletes, so both agree on which keys
//! a window covers.

use redb::ReadableTable;
use serde::de::DeserializeOwned;

use crate::encoding::Encoding;
use crate::error::{Error, Result};

/// Key/value type of every table in a partition
pub(crate) type Raw = &'static [u8];

type Entry = (Vec<u8>, Vec<u8>);

/// Ordered cursor primitive provided by the underlying store
pub(crate) trait RawCursor {
    /// Position on the first key `>= key`
    fn seek(&mut self, key: &[u8]) -> Result<Option<Entry>>;

    /// Position on the first key
    fn first(&mut self) -> Result<Option<Entry>>;

    /// Step to the following key
    fn next(&mut self) -> Result<Option<Entry>>;
}

/// Cursor over a redb table, read-only or inside a write transaction
pub(crate) struct TableCursor<'t, T: ReadableTable<Raw, Raw>> {
    table: &'t T,
    range: Option<redb::Range<'t, Raw, Raw>>,
}

impl<'t, T: ReadableTable<Raw, Raw>> TableCursor<'t, T> {
    pub(crate) fn new(table: &'t T) -> Self {
        Self { table, range: None }
    }
}

impl<'t, T: ReadableTable<Raw, Raw>> RawCursor for TableCursor<'t, T> {
    fn seek(&mut self, key: &[u8]) -> Result<Option<Entry>> {
        self.range = Some(self.table.range::<&[u8]>(key..)?);
        self.next()
    }

    fn first(&mut self) -> Result<Option<Entry>> {
        self.range = Some(self.table.range::<&[u8]>(..)?);
        self.next()
    }

    fn next(&mut self) -> Result<Option<Entry>> {
        let Some(range) = self.range.as_mut() else {
            return Ok(None);
        };
        match range.next() {
            Some(Ok((key, value))) => Ok(Some((key.value().to_vec(), value.value().to_vec()))),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// Position of a [`RangeIter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// `advance` has not been called yet
    NotStarted,
    /// Sitting on a key inside the window
    Positioned,
    /// Ran past the window or out of keys; terminal
    Exhausted,
}

/// Inclusive, optionally open-ended range cursor over one bucket
pub struct RangeIter<'a> {
    cursor: Box<dyn RawCursor + 'a>,
    start: Vec<u8>,
    end: Vec<u8>,
    encoding: Encoding,
    state: IterState,
    current: Option<Entry>,
}

impl<'a> RangeIter<'a> {
    pub(crate) fn new(
        cursor: Box<dyn RawCursor + 'a>,
        start: &[u8],
        end: &[u8],
        encoding: Encoding,
    ) -> Self {
        Self {
            cursor,
            start: start.to_vec(),
            end: end.to_vec(),
            encoding,
            state: IterState::NotStarted,
            current: None,
        }
    }

    /// Move to the next key in the window.
    ///
    /// The first call seeks to the start bound (or the first key when the
    /// start is open). Returns `false` once the keys run out or the key passes
    /// a non-empty end bound; the iterator then stays exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        let entry = match self.state {
            IterState::Exhausted => return Ok(false),
            IterState::NotStarted if self.start.is_empty() => self.cursor.first()?,
            IterState::NotStarted => self.cursor.seek(&self.start)?,
            IterState::Positioned => self.cursor.next()?,
        };

        match entry {
            Some(entry) if self.end.is_empty() || entry.0 <= self.end => {
                self.current = Some(entry);
                self.state = IterState::Positioned;
                Ok(true)
            }
            _ => {
                self.current = None;
                self.state = IterState::Exhausted;
                Ok(false)
            }
        }
    }

    /// Current state
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Raw key of the current record
    pub fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(key, _)| key.as_slice())
    }

    /// Current key as an identifier string, if it is valid UTF-8
    pub fn id(&self) -> Option<&str> {
        self.key().and_then(|key| std::str::from_utf8(key).ok())
    }

    /// Raw encoded value of the current record
    pub fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, value)| value.as_slice())
    }

    /// Decode the current value with the bucket's encoding
    pub fn read<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_with(self.encoding)
    }

    /// Decode the current value with an explicit encoding
    pub fn read_with<T: DeserializeOwned>(&self, encoding: Encoding) -> Result<T> {
        let value = self.value().ok_or(Error::NotPositioned)?;
        encoding.decode(value)
    }

    /// Collect the keys left in the window, consuming the iterator's position
    pub(crate) fn remaining_keys(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        while self.advance()? {
            if let Some(key) = self.key() {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }
}
