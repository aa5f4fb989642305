//! feedmirror core library: domain types, on-disk layout, settings and the
//! resource list.
//!
//! - [`types`]: resource descriptors, remote signals, cache and manifest records
//! - [`paths`]: [`Layout`] of the mirror root directory
//! - [`settings`]: [`SyncSettings`] loaded from `config.yaml`
//! - [`resources`]: newline-delimited resource list parsing
//! - [`error`]: [`ConfigError`]

pub mod error;
pub mod paths;
pub mod resources;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use paths::Layout;
pub use settings::SyncSettings;
pub use types::{
    CacheEntry, ChangeReason, ChangeVerdict, Manifest, ManifestEntry, ManifestStatus,
    RemoteSignals, ResourceDescriptor, ResourceUrl, RunClock,
};
