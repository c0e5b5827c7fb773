//! Spill configuration
//!
//! Loaded from a JSON file. Only `spill_dir` is required:
//!
//! ```json
//! {
//!   "spill_dir": "/var/tmp/warehouse/spill",
//!   "file_prefix": "query-42",
//!   "verify_sample": 100,
//!   "write_buffer_bytes": 65536,
//!   "sync_on_close": true
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Spill configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpillConfig {
    /// Directory spill files are allocated in (required)
    pub spill_dir: String,

    /// File name prefix for allocated spill files
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Number of leading elements re-read to verify a persist
    #[serde(default = "default_verify_sample")]
    pub verify_sample: usize,

    /// Write buffer capacity in bytes
    #[serde(default = "default_write_buffer_bytes")]
    pub write_buffer_bytes: usize,

    /// fsync spill files when their output stream closes
    #[serde(default = "default_sync_on_close")]
    pub sync_on_close: bool,
}

fn default_file_prefix() -> String {
    "spill".to_string()
}
fn default_verify_sample() -> usize {
    100
}
fn default_write_buffer_bytes() -> usize {
    64 * 1024
}
fn default_sync_on_close() -> bool {
    true
}

impl SpillConfig {
    /// Configuration with defaults for everything but the directory
    pub fn new(spill_dir: impl AsRef<Path>) -> Self {
        Self {
            spill_dir: spill_dir.as_ref().display().to_string(),
            file_prefix: default_file_prefix(),
            verify_sample: default_verify_sample(),
            write_buffer_bytes: default_write_buffer_bytes(),
            sync_on_close: default_sync_on_close(),
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: SpillConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spill_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("spill_dir must not be empty".into()));
        }

        if self.file_prefix.is_empty()
            || self
                .file_prefix
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(ConfigError::Invalid(format!(
                "Invalid file_prefix: '{}'",
                self.file_prefix
            )));
        }

        if self.verify_sample == 0 {
            return Err(ConfigError::Invalid("verify_sample must be > 0".into()));
        }

        if self.write_buffer_bytes == 0 {
            return Err(ConfigError::Invalid("write_buffer_bytes must be > 0".into()));
        }

        Ok(())
    }

    /// Spill directory as a path
    pub fn spill_path(&self) -> PathBuf {
        PathBuf::from(&self.spill_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_applied() {
        let config: SpillConfig = serde_json::from_str(r#"{"spill_dir": "/tmp/spill"}"#).unwrap();
        assert_eq!(config.file_prefix, "spill");
        assert_eq!(config.verify_sample, 100);
        assert_eq!(config.write_buffer_bytes, 65536);
        assert!(config.sync_on_close);
        assert_eq!(config, SpillConfig::new("/tmp/spill"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spill.json");
        fs::write(
            &path,
            r#"{"spill_dir": "/tmp/q", "file_prefix": "q42", "verify_sample": 10, "sync_on_close": false}"#,
        )
        .unwrap();

        let config = SpillConfig::load(&path).unwrap();
        assert_eq!(config.file_prefix, "q42");
        assert_eq!(config.verify_sample, 10);
        assert!(!config.sync_on_close);
    }

    #[test]
    fn test_missing_spill_dir_rejected() {
        let result: Result<SpillConfig, _> = serde_json::from_str(r#"{"file_prefix": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = SpillConfig::new("/tmp/spill");
        config.verify_sample = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SpillConfig::new("/tmp/spill");
        config.file_prefix = "a/b".into();
        assert!(config.validate().is_err());

        let mut config = SpillConfig::new("/tmp/spill");
        config.write_buffer_bytes = 0;
        assert!(config.validate().is_err());

        assert!(SpillConfig::new("/tmp/spill").validate().is_ok());
    }

    #[test]
    fn test_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let err = SpillConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
