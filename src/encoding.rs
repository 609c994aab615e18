//! Record payload encoding
//!
//! Records are opaque to the storage layer; they only cross it as bytes
//! produced and consumed by an [`Encoding`]. Each bucket carries a default
//! encoding, and range reads can override it per call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Payload encodings supported by cocoon_ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Encoding {
    /// Compact binary encoding (bincode)
    Bincode,
    /// Human-readable JSON
    Json,
}

impl Default for Encoding {
    fn default() -> Self {
        Self::Bincode
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bincode" => Ok(Self::Bincode),
            "json" => Ok(Self::Json),
            _ => Err(Error::config(format!("Unknown encoding: {}", s))),
        }
    }
}

impl Encoding {
    /// Get the name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bincode => "bincode",
            Self::Json => "json",
        }
    }

    /// Encode a value into bytes
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Bincode => Ok(bincode::serialize(value)?),
            Self::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    /// Decode a value from bytes
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Self::Bincode => Ok(bincode::deserialize(data)?),
            Self::Json => Ok(serde_json::from_slice(data)?),
        }
    }
}
