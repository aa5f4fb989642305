//! Sync settings loaded from `<root>/config.yaml`.
//!
//! Every field is optional; a missing file means all defaults. A file that
//! exists but does not parse is a [`ConfigError`], never silently ignored.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_FRESHNESS_HOURS: u64 = 24;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MAX_CONCURRENCY: usize = 8;
/// One century; keeps the window inside chrono's representable range.
const MAX_FRESHNESS_HOURS: u64 = 24 * 366 * 100;

/// Tunables for a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Skip probing entirely when the last run finished within this window.
    pub freshness_hours: u64,
    pub probe_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Number of resources processed at once.
    pub concurrency: usize,
    /// CSV columns removed from every row before a dataset is stored.
    pub disallowed_fields: Vec<String>,
    pub delimiter: char,
    pub user_agent: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            freshness_hours: DEFAULT_FRESHNESS_HOURS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            disallowed_fields: Vec::new(),
            delimiter: ',',
            user_agent: format!("feedmirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SyncSettings {
    /// Load settings from `path`, falling back to defaults when absent.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        // An empty or comment-only file deserializes as unit, not a mapping.
        if contents.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with('#')
        }) {
            return Ok(Self::default());
        }
        let settings: SyncSettings =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(ConfigError::InvalidSetting {
                field: "delimiter",
                reason: format!("{:?} cannot delimit CSV fields", self.delimiter),
            });
        }
        if self.probe_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "timeout",
                reason: "timeouts must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        let hours = self.freshness_hours.min(MAX_FRESHNESS_HOURS);
        chrono::Duration::hours(i64::try_from(hours).unwrap_or(0))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Worker count clamped to `1..=MAX_CONCURRENCY`.
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    /// Delimiter as the single byte the CSV codec expects.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = SyncSettings::load_at(&tmp.path().join("config.yaml")).unwrap();
        assert_eq!(settings, SyncSettings::default());
        assert_eq!(settings.freshness_window(), chrono::Duration::hours(24));
        assert_eq!(settings.probe_timeout(), Duration::from_secs(10));
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(
            &path,
            "freshness_hours: 6\ndisallowed_fields:\n  - internal_note\n",
        )
        .unwrap();

        let settings = SyncSettings::load_at(&path).unwrap();
        assert_eq!(settings.freshness_hours, 6);
        assert_eq!(settings.disallowed_fields, vec!["internal_note".to_string()]);
        assert_eq!(settings.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn comment_only_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "# nothing here yet\n\n").unwrap();
        assert_eq!(SyncSettings::load_at(&path).unwrap(), SyncSettings::default());
    }

    #[test]
    fn malformed_file_is_parse_error_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "freshness_hours: [not, a, number]\n").unwrap();

        let err = SyncSettings::load_at(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn quote_delimiter_is_rejected() {
        let settings = SyncSettings {
            delimiter: '"',
            ..SyncSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting {
                field: "delimiter",
                ..
            })
        ));
    }

    #[test]
    fn workers_are_clamped() {
        let mut settings = SyncSettings {
            concurrency: 0,
            ..SyncSettings::default()
        };
        assert_eq!(settings.workers(), 1);
        settings.concurrency = 64;
        assert_eq!(settings.workers(), MAX_CONCURRENCY);
    }
}
