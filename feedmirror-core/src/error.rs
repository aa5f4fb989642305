//! Error types for feedmirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// Setup errors: anything that prevents a run from starting.
///
/// These are the only errors that surface as a process-level failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading configuration.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource list did not exist at the expected path.
    #[error("resource list not found at {path}")]
    NotFound { path: PathBuf },

    /// A resource list line that is not an absolute http(s) URL.
    #[error("line {line}: not an absolute http(s) URL: {url}")]
    InvalidUrl { line: usize, url: String },

    /// The URL has no path segment to name the local copy after.
    #[error("cannot derive a local file name from {url}")]
    NoFileName { url: String },

    /// The URL would be mirrored over a file the mirror itself owns.
    #[error("{url} would overwrite the run manifest")]
    ReservedName { url: String },

    /// Two distinct URLs would be mirrored into the same local file.
    #[error("{first} and {second} both map to {path}")]
    DuplicateLocalPath {
        path: PathBuf,
        first: String,
        second: String,
    },

    /// YAML parse error on the settings file, with path context.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A settings value that parsed but is out of range.
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    /// `dirs::home_dir()` returned `None` and no root override was given.
    #[error("cannot determine home directory; set $HOME or FEEDMIRROR_ROOT")]
    HomeNotFound,
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
