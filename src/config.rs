//! Configuration types for Reqscope

use serde::{Deserialize, Serialize};

use crate::{ReqscopeError, Result};

/// Capture session configuration
///
/// The defaults reproduce the unbounded behavior of the original engine:
/// no buffer capacity and no payload size cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Maximum records retained in the buffer; once full, the oldest
    /// record is evicted on append. `None` means unbounded.
    #[serde(default)]
    pub max_records: Option<usize>,
    /// Response bodies larger than this are not decoded; the record is
    /// kept with an omitted payload. `None` decodes everything.
    #[serde(default)]
    pub max_payload_bytes: Option<usize>,
}

impl CaptureConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReqscopeError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ReqscopeError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if a limit is set to zero
    pub fn validate(&self) -> Result<()> {
        if self.max_records == Some(0) {
            return Err(ReqscopeError::Config(
                "max_records must be > 0 when set".to_string(),
            ));
        }

        if self.max_payload_bytes == Some(0) {
            return Err(ReqscopeError::Config(
                "max_payload_bytes must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults_unbounded() {
        let config = CaptureConfig::default();
        assert_eq!(config.max_records, None);
        assert_eq!(config.max_payload_bytes, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse() {
        let config: CaptureConfig = toml::from_str("max_records = 512\n").unwrap();
        assert_eq!(config.max_records, Some(512));
        assert_eq!(config.max_payload_bytes, None);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"max_records = 100\nmax_payload_bytes = 65536\n")
            .unwrap();

        let config = CaptureConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_records, Some(100));
        assert_eq!(config.max_payload_bytes, Some(65536));
    }

    #[test]
    fn test_invalid_zero_limits() {
        let config = CaptureConfig {
            max_records: Some(0),
            max_payload_bytes: None,
        };
        assert!(config.validate().is_err());

        let config = CaptureConfig {
            max_records: None,
            max_payload_bytes: Some(0),
        };
        assert!(config.validate().is_err());
    }
}
