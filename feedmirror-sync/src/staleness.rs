//! Run clock and the staleness gate.
//!
//! The clock records when the last run finished; a run that starts inside
//! the freshness window exits before probing anything.

use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use feedmirror_core::RunClock;

use crate::error::{io_err, SyncError};

/// Outcome of the staleness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No usable run clock.
    NeverRun,
    /// Last run is within the window; skip this one.
    Fresh { age: Duration },
    Stale { age: Duration },
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh { .. })
    }
}

/// Freshness window a run is gated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub window: Duration,
}

impl StalenessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Classify `clock` as of `now`.
    ///
    /// A clock in the future counts as zero age. A zero window is never
    /// fresh.
    pub fn evaluate(&self, clock: Option<&RunClock>, now: DateTime<Utc>) -> Freshness {
        let Some(clock) = clock else {
            return Freshness::NeverRun;
        };
        let age = now
            .signed_duration_since(clock.timestamp)
            .max(Duration::zero());
        if age < self.window {
            Freshness::Fresh { age }
        } else {
            Freshness::Stale { age }
        }
    }
}

/// Load the run clock. A missing or unparsable clock is `None`.
pub fn load_clock_at(path: &Path) -> Option<RunClock> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!("run clock unreadable at {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(clock) => Some(clock),
        Err(err) => {
            tracing::warn!("run clock unparsable at {}: {err}", path.display());
            None
        }
    }
}

/// Save the run clock atomically.
pub fn save_clock_at(path: &Path, clock: &RunClock) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid run clock path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(clock)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Remove the run clock so the next run is not gated.
pub fn clear_clock_at(path: &Path) -> Result<bool, SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Format age from a chrono timestamp.
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp);
    format_age(age)
}

/// Compact rendering of a duration: `42s`, `5m`, `3h`, `2d`.
pub fn format_age(age: Duration) -> String {
    format_seconds(age.num_seconds().max(0) as u64)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
