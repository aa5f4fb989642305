//! Error types for feedmirror-sync.
//!
//! [`SyncError`] is the only error that escapes a run. The per-resource
//! errors ([`ProbeError`], [`FetchError`], [`SanitizeError`]) and
//! [`CacheCorruptionError`] are recovered inside the engine and end up as
//! log lines and manifest entries.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use feedmirror_core::ConfigError;

/// Errors that abort a run or a command.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Setup failure: resource list or settings unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error on engine-owned state, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (diff cache, manifest, run clock).
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of the lightweight metadata request. Always treated as "changed".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe returned HTTP status {status}")]
    Status { status: u16 },

    #[error("probe transport error: {0}")]
    Transport(String),

    #[error("probe timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },
}

/// Failure while downloading a resource body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("download timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("body truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while turning a raw payload into the stored form.
#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("payload is empty")]
    Empty,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The persisted diff cache exists but cannot be used.
#[derive(Debug, Error)]
pub enum CacheCorruptionError {
    #[error("diff cache unreadable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("diff cache unparsable at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
