//! Domain types for the feed mirror.
//!
//! All path fields use `PathBuf`; resource identity is always the URL string.
//! Persisted records serialize as camelCase JSON via serde.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed resource identity: the absolute URL of a remote dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceUrl(pub String);

impl ResourceUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceUrl {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Resources and remote state
// ---------------------------------------------------------------------------

/// One remote dataset and the local file it is mirrored into.
///
/// Built once from the resource list; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: ResourceUrl,
    /// File name of the local copy, derived from the URL's last path segment.
    pub name: String,
    pub local_path: PathBuf,
}

/// Signals observed on the remote for a resource, fresh on every probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSignals {
    pub entity_tag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub byte_length: Option<u64>,
}

impl RemoteSignals {
    /// Fill every field missing in `self` from `fallback`.
    pub fn or(self, fallback: &RemoteSignals) -> RemoteSignals {
        RemoteSignals {
            entity_tag: self.entity_tag.or_else(|| fallback.entity_tag.clone()),
            last_modified: self.last_modified.or(fallback.last_modified),
            byte_length: self.byte_length.or(fallback.byte_length),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_tag.is_none() && self.last_modified.is_none() && self.byte_length.is_none()
    }
}

/// Last known state of a resource, keyed by URL in the diff cache.
///
/// When `content_hash` is present it is the SHA-256 of the bytes at the
/// resource's local path as of `last_downloaded_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Remote body length the local copy was produced from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<u64>,
    /// Size of the sanitized file written to the local path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub last_downloaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Change verdicts
// ---------------------------------------------------------------------------

/// Why a resource was classified as changed or unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeReason {
    NoLocalCopy,
    ProbeFailed,
    EntityTagMismatch,
    LastModifiedNewer,
    ByteLengthMismatch,
    LocalHashMismatch,
    NoCacheEntry,
    NoChangeDetected,
}

impl ChangeReason {
    /// Stable key, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::NoLocalCopy => "NoLocalCopy",
            ChangeReason::ProbeFailed => "ProbeFailed",
            ChangeReason::EntityTagMismatch => "EntityTagMismatch",
            ChangeReason::LastModifiedNewer => "LastModifiedNewer",
            ChangeReason::ByteLengthMismatch => "ByteLengthMismatch",
            ChangeReason::LocalHashMismatch => "LocalHashMismatch",
            ChangeReason::NoCacheEntry => "NoCacheEntry",
            ChangeReason::NoChangeDetected => "NoChangeDetected",
        }
    }

    /// Human-readable explanation for logs and the status view.
    pub fn describe(&self) -> &'static str {
        match self {
            ChangeReason::NoLocalCopy => "no local copy present",
            ChangeReason::ProbeFailed => "remote probe failed, assuming changed",
            ChangeReason::EntityTagMismatch => "remote entity tag differs from cached",
            ChangeReason::LastModifiedNewer => "remote modified after cached version",
            ChangeReason::ByteLengthMismatch => "remote length differs from local copy",
            ChangeReason::LocalHashMismatch => "local copy no longer matches cached hash",
            ChangeReason::NoCacheEntry => "local copy has no cache record",
            ChangeReason::NoChangeDetected => "no change detected",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-resource, per-run classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeVerdict {
    pub changed: bool,
    pub reason: ChangeReason,
}

impl ChangeVerdict {
    pub fn changed(reason: ChangeReason) -> Self {
        Self {
            changed: true,
            reason,
        }
    }

    pub fn unchanged() -> Self {
        Self {
            changed: false,
            reason: ChangeReason::NoChangeDetected,
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest and run clock
// ---------------------------------------------------------------------------

/// Outcome of one resource in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    Downloaded,
    Skipped,
    Failed,
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestStatus::Downloaded => write!(f, "downloaded"),
            ManifestStatus::Skipped => write!(f, "skipped"),
            ManifestStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub url: ResourceUrl,
    pub status: ManifestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChangeReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
}

/// Last run's outcome for every resource. Overwritten each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub last_updated: DateTime<Utc>,
    pub total_files: usize,
    #[serde(default)]
    pub downloaded: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub cancelled: bool,
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from the entries of a run, tallying each status.
    pub fn from_entries(
        last_updated: DateTime<Utc>,
        files: Vec<ManifestEntry>,
        cancelled: bool,
    ) -> Self {
        let count = |status: ManifestStatus| files.iter().filter(|f| f.status == status).count();
        Self {
            last_updated,
            total_files: files.len(),
            downloaded: count(ManifestStatus::Downloaded),
            skipped: count(ManifestStatus::Skipped),
            failed: count(ManifestStatus::Failed),
            cancelled,
            files,
        }
    }
}

/// Completion time of the last run that reached finalization.
///
/// `date` and `time` duplicate `timestamp` for operators reading the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunClock {
    pub timestamp: DateTime<Utc>,
    pub date: String,
    pub time: String,
}

impl RunClock {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            date: timestamp.format("%Y-%m-%d").to_string(),
            time: timestamp.format("%H:%M:%S").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
