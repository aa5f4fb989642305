//! # feedmirror-sync
//!
//! Incremental sync engine for remote CSV feeds.
//!
//! Call [`pipeline::run`] to sync the mirror at a [`feedmirror_core::Layout`]
//! over HTTP, or build a [`SyncEngine`] around any [`RemoteClient`].

pub mod decision;
pub mod diff_cache;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod manifest;
pub mod pipeline;
pub mod remote;
pub mod sanitizer;
pub mod staleness;

pub use engine::{
    CancelToken, ResourceAction, ResourceResult, RunOptions, RunOutcome, RunReport, SyncEngine,
};
pub use error::{CacheCorruptionError, FetchError, ProbeError, SanitizeError, SyncError};
pub use remote::{FetchedBody, RemoteClient, UreqClient};
