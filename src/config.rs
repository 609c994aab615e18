//! Configuration for cocoon_ts
//!
//! This module provides configuration options for the time-sharded engine.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::encoding::Encoding;
use crate::error::{Result, Error};
use crate::store::StoreOptions;

/// Default partition file extension
pub const DEFAULT_EXTENSION: &str = "ts";

/// Default collection name inside each partition
pub const DEFAULT_BUCKET: &str = "records";

/// Configuration options for a [`TsEngine`](crate::TsEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct EngineConfig {
    // Layout
    /// Directory holding one file per day
    pub directory: PathBuf,
    /// Extension of partition files, without the dot
    pub extension: String,
    /// Collection every partition stores its records in
    pub bucket_name: String,

    // Storage
    /// Bound on waiting for a partition's file lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Payload encoding of stored records
    pub encoding: Encoding,

    // Retention policy
    /// Number of days to keep; `None` keeps everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("shards"),
            extension: DEFAULT_EXTENSION.to_string(),
            bucket_name: DEFAULT_BUCKET.to_string(),
            lock_timeout_ms: 10_000,
            encoding: Encoding::default(),
            retention_days: None,
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the partition directory
    pub fn with_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.directory = path.as_ref().to_path_buf();
        self
    }

    /// Set the partition file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the collection name
    pub fn with_bucket_name(mut self, name: impl Into<String>) -> Self {
        self.bucket_name = name.into();
        self
    }

    /// Set the lock timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the payload encoding
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the number of days to retain
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::config("Directory must not be empty"));
        }

        if self.extension.is_empty() || self.extension.contains(&['.', '/', '\\'][..]) {
            return Err(Error::config(format!(
                "Extension must be a non-empty name without separators: {:?}",
                self.extension
            )));
        }

        // Directory scans skip lock sidecars, which would hide every partition.
        if self.extension == "lock" {
            return Err(Error::config("Extension must not be \"lock\""));
        }

        if self.bucket_name.is_empty() {
            return Err(Error::config("Bucket name must not be empty"));
        }

        if self.lock_timeout_ms < 1 {
            return Err(Error::config("Lock timeout must be at least 1ms"));
        }

        if self.retention_days == Some(0) {
            return Err(Error::config("Retention days must be at least 1"));
        }

        Ok(())
    }

    /// Get the lock timeout as a Duration
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Get the retention period, if one is configured
    pub fn retention_period(&self) -> Option<chrono::Duration> {
        self.retention_days.map(|days| chrono::Duration::days(i64::from(days)))
    }

    /// Options for opening individual partition stores
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: self.lock_timeout(),
        }
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== cocoon_ts Configuration ===\n\n");

        result.push_str("Layout:\n");
        result.push_str(&format!("  Directory: {:?}\n", self.directory));
        result.push_str(&format!("  Extension: {}\n", self.extension));
        result.push_str(&format!("  Bucket: {}\n", self.bucket_name));

        result.push_str("\nStorage:\n");
        result.push_str(&format!("  Lock Timeout: {} ms\n", self.lock_timeout_ms));
        result.push_str(&format!("  Encoding: {}\n", self.encoding));

        result.push_str("\nRetention Policy:\n");
        match self.retention_days {
            Some(days) => result.push_str(&format!("  Retention Days: {}\n", days)),
            None => result.push_str("  Retention Days: unlimited\n"),
        }

        result
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "toml")]
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        use std::fs::read_to_string;
        use toml::from_str;

        let content = read_to_string(path)?;
        let config: Self = from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(feature = "toml")]
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::fs::write;
        use toml::to_string_pretty;

        let content = to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize to TOML: {}", e)))?;

        write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.directory, PathBuf::from("shards"));
        assert_eq!(config.extension, "ts");
        assert_eq!(config.bucket_name, "records");
        assert_eq!(config.lock_timeout(), Duration::from_secs(10));
        assert_eq!(config.encoding, Encoding::Bincode);
        assert_eq!(config.retention_period(), None);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_directory("/var/lib/probe")
            .with_extension("db")
            .with_bucket_name("attack")
            .with_lock_timeout(Duration::from_millis(250))
            .with_encoding(Encoding::Json)
            .with_retention_days(7);

        assert_eq!(config.directory, PathBuf::from("/var/lib/probe"));
        assert_eq!(config.extension, "db");
        assert_eq!(config.bucket_name, "attack");
        assert_eq!(config.store_options().lock_timeout, Duration::from_millis(250));
        assert_eq!(config.encoding, Encoding::Json);
        assert_eq!(config.retention_period(), Some(chrono::Duration::days(7)));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let invalid_configs = vec![
            EngineConfig::new().with_directory(""),
            EngineConfig::new().with_extension(""),
            EngineConfig::new().with_extension("d.b"),
            EngineConfig::new().with_extension("lock"),
            EngineConfig::new().with_bucket_name(""),
            EngineConfig::new().with_lock_timeout(Duration::ZERO),
            EngineConfig::new().with_retention_days(0),
        ];

        for config in invalid_configs {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn test_serde_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"directory":"/data","encoding":"json"}"#).unwrap();
        assert_eq!(config.directory, PathBuf::from("/data"));
        assert_eq!(config.encoding, Encoding::Json);
        assert_eq!(config.extension, "ts");
        assert_eq!(config.retention_days, None);
    }

    #[test]
    fn test_to_string_pretty() {
        let text = EngineConfig::new().with_retention_days(30).to_string_pretty();
        assert!(text.contains("Extension: ts"));
        assert!(text.contains("Retention Days: 30"));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("engine.toml");
        let config = EngineConfig::new().with_directory("/data").with_retention_days(3);

        config.to_toml_file(&path)?;
        assert_eq!(EngineConfig::from_toml_file(&path)?, config);
        Ok(())
    }
}
