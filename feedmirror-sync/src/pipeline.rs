//! Shared entrypoints used by every CLI command.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use feedmirror_core::{Layout, Manifest, RunClock, SyncSettings};

use crate::diff_cache;
use crate::engine::{CancelToken, RunOptions, RunOutcome, SyncEngine};
use crate::manifest;
use crate::remote::UreqClient;
use crate::staleness::{self, Freshness, StalenessPolicy};
use crate::SyncError;

/// Run a sync over the network against the mirror at `layout`.
///
/// This is the canonical entrypoint for both `feedmirror run` and each tick
/// of `feedmirror watch`.
pub fn run(
    layout: &Layout,
    options: RunOptions,
    cancel: &CancelToken,
) -> Result<RunOutcome, SyncError> {
    let settings = SyncSettings::load_at(&layout.settings_path())?;
    let client = UreqClient::new(&settings.user_agent);
    SyncEngine::new(client, layout.clone(), settings).run(options, cancel)
}

/// Snapshot of the mirror's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub root: PathBuf,
    pub freshness_hours: u64,
    pub last_run: Option<RunClock>,
    pub age_secs: Option<i64>,
    /// Whether a run started now without `--force` would be skipped.
    pub gated: bool,
    pub cached_resources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_error: Option<String>,
    pub manifest: Option<Manifest>,
}

/// Read-only status of the mirror at `layout`.
pub fn status(layout: &Layout) -> Result<StatusReport, SyncError> {
    let settings = SyncSettings::load_at(&layout.settings_path())?;
    let last_run = staleness::load_clock_at(&layout.run_clock_path());
    let policy = StalenessPolicy::new(settings.freshness_window());
    let freshness = policy.evaluate(last_run.as_ref(), Utc::now());
    let age_secs = match freshness {
        Freshness::NeverRun => None,
        Freshness::Fresh { age } | Freshness::Stale { age } => Some(age.num_seconds()),
    };

    let (cached_resources, cache_error) = match diff_cache::try_load_at(&layout.diff_cache_path()) {
        Ok(cache) => (cache.len(), None),
        Err(err) => (0, Some(err.to_string())),
    };

    let manifest = match manifest::load_at(&layout.manifest_path()) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!("ignoring unreadable manifest: {err}");
            None
        }
    };

    Ok(StatusReport {
        root: layout.root().to_path_buf(),
        freshness_hours: settings.freshness_hours,
        last_run,
        age_secs,
        gated: freshness.is_fresh(),
        cached_resources,
        cache_error,
        manifest,
    })
}

/// What `clear_cache` actually removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedState {
    pub diff_cache: bool,
    pub run_clock: bool,
}

/// Forget every cached signal and the run clock, so the next run
/// re-evaluates and re-downloads every resource. Mirrored files are kept.
pub fn clear_cache(layout: &Layout) -> Result<ClearedState, SyncError> {
    let diff_cache = diff_cache::clear_at(&layout.diff_cache_path())?;
    let run_clock = staleness::clear_clock_at(&layout.run_clock_path())?;
    tracing::info!(
        "cleared diff cache ({}) and run clock ({})",
        if diff_cache { "removed" } else { "absent" },
        if run_clock { "removed" } else { "absent" }
    );
    Ok(ClearedState {
        diff_cache,
        run_clock,
    })
}
