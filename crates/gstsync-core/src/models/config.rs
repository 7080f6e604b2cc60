//! Configuration structures for a sync run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::SourceFormat;
use crate::sheets::RetryPolicy;

/// Main configuration for gstsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GstSyncConfig {
    /// Target spreadsheet.
    pub sheet: SheetConfig,

    /// Service account credentials.
    pub credentials: CredentialsConfig,

    /// Backoff settings for row writes.
    pub retry: RetryConfig,
}

/// Where rows are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Spreadsheet ID (the long token in the sheet URL).
    pub spreadsheet_id: String,

    /// Tab name rows are written to.
    pub sheet_name: String,

    /// First row to write.
    pub start_row: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            start_row: 8,
        }
    }
}

/// Credentials for the Sheets API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path to the service account JSON key.
    pub key_file: PathBuf,

    /// Base URL of the Sheets API.
    pub api_base: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from("service-account.json"),
            api_base: crate::sheets::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Exponential backoff settings, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Longest single wait between attempts.
    pub max_backoff_secs: u64,

    /// Total wait budget per row for GSTR-2A input.
    pub gstr2a_deadline_secs: u64,

    /// Total wait budget per row for GSTR-2B input.
    pub gstr2b_deadline_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_backoff_secs: 32,
            gstr2a_deadline_secs: 300,
            gstr2b_deadline_secs: 600,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy used for a given input format.
    pub fn policy_for(&self, format: SourceFormat) -> RetryPolicy {
        let deadline = match format {
            SourceFormat::Gstr2a => self.gstr2a_deadline_secs,
            SourceFormat::Gstr2b => self.gstr2b_deadline_secs,
        };

        RetryPolicy {
            max_backoff: self.max_backoff_secs,
            deadline,
            unit: Duration::from_secs(1),
        }
    }
}

impl GstSyncConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deadline_depends_on_format() {
        let retry = RetryConfig::default();
        assert_eq!(retry.policy_for(SourceFormat::Gstr2a).deadline, 300);
        assert_eq!(retry.policy_for(SourceFormat::Gstr2b).deadline, 600);
        assert_eq!(retry.policy_for(SourceFormat::Gstr2b).max_backoff, 32);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"sheet": {"spreadsheet_id": "abc"}}"#).unwrap();

        let config = GstSyncConfig::from_file(&path).unwrap();
        assert_eq!(config.sheet.spreadsheet_id, "abc");
        assert_eq!(config.sheet.sheet_name, "Sheet1");
        assert_eq!(config.sheet.start_row, 8);
        assert_eq!(config.retry.gstr2b_deadline_secs, 600);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = GstSyncConfig::default();
        config.sheet.sheet_name = "January 2022".to_string();
        config.save(&path).unwrap();

        let loaded = GstSyncConfig::from_file(&path).unwrap();
        assert_eq!(loaded.sheet.sheet_name, "January 2022");
    }
}
