//! On-disk layout of a mirror root.
//!
//! # Storage layout
//!
//! ```text
//! <root>/                  (default ~/.feedmirror, or $FEEDMIRROR_ROOT)
//!   resources.txt          newline-delimited resource URLs
//!   config.yaml            optional settings
//!   data/
//!     <name>.csv           sanitized datasets
//!     manifest.json        last run outcome
//!   state/
//!     diff-cache.json      per-resource remote signals + content hashes
//!     last-run.json        run clock
//! ```
//!
//! Tests always construct a [`Layout`] with [`Layout::at`] over a `TempDir`;
//! only the binary calls [`Layout::discover`].

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable overriding the default root.
pub const ROOT_ENV: &str = "FEEDMIRROR_ROOT";

pub const RESOURCES_FILE: &str = "resources.txt";
pub const SETTINGS_FILE: &str = "config.yaml";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DIFF_CACHE_FILE: &str = "diff-cache.json";
pub const RUN_CLOCK_FILE: &str = "last-run.json";

/// Paths of every file the mirror reads or writes, rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted at an explicit directory. Pure, no I/O.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from an explicit override, `$FEEDMIRROR_ROOT`, or
    /// `<home>/.feedmirror`, in that order.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(root) = explicit {
            return Ok(Self::at(root));
        }
        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(Self::at(home.join(".feedmirror")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resources_path(&self) -> PathBuf {
        self.root.join(RESOURCES_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir().join(MANIFEST_FILE)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn diff_cache_path(&self) -> PathBuf {
        self.state_dir().join(DIFF_CACHE_FILE)
    }

    pub fn run_clock_path(&self) -> PathBuf {
        self.state_dir().join(RUN_CLOCK_FILE)
    }
}
