//! Sync orchestration.
//!
//! ## Run state machine
//!
//! 1. `Gated`: load the resource list (fatal on error), then skip the whole
//!    run if the last one finished inside the freshness window.
//! 2. `Probing`: load the diff cache, treating corruption as empty.
//! 3. Per resource, on a bounded worker pool: fingerprint + probe, decide,
//!    and on a change fetch + sanitize.
//! 4. `Finalizing`: persist the diff cache once, write the manifest, and
//!    advance the run clock unless the run was cancelled.
//!
//! Workers never touch the in-memory cache. They receive a copy of their
//! resource's entry and send results back over a channel; this thread is
//! the only writer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use feedmirror_core::{
    resources, CacheEntry, ChangeReason, Layout, Manifest, ManifestEntry, ManifestStatus,
    ResourceDescriptor, ResourceUrl, RunClock, SyncSettings,
};

use crate::decision::decide;
use crate::diff_cache::{self, DiffCache};
use crate::error::SyncError;
use crate::fetcher::fetch_to_temp;
use crate::fingerprint::{fingerprint, LocalFingerprint};
use crate::manifest;
use crate::remote::RemoteClient;
use crate::sanitizer::Sanitizer;
use crate::staleness::{self, format_age, Freshness, StalenessPolicy};

// ---------------------------------------------------------------------------
// Options and cancellation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Bypass the staleness gate.
    pub force: bool,
    /// Probe and decide only; download and persist nothing.
    pub dry_run: bool,
}

/// Cooperative cancellation flag shared between a run and its caller.
///
/// Checked before each resource starts; a resource already in flight runs
/// to completion or to a clean failure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to one resource in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAction {
    Downloaded,
    /// `--dry-run`: the resource *would* have been downloaded.
    WouldDownload,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResult {
    pub name: String,
    pub url: ResourceUrl,
    pub action: ResourceAction,
    /// Absent only when the resource failed before a decision was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChangeReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl ResourceResult {
    pub fn manifest_entry(&self) -> ManifestEntry {
        let status = match self.action {
            ResourceAction::Downloaded => ManifestStatus::Downloaded,
            ResourceAction::WouldDownload | ResourceAction::Skipped => ManifestStatus::Skipped,
            ResourceAction::Failed => ManifestStatus::Failed,
        };
        ManifestEntry {
            name: self.name.clone(),
            url: self.url.clone(),
            status,
            reason: self.reason,
            error: self.error.clone(),
            checked_at: self.checked_at,
            downloaded_at: self.downloaded_at,
        }
    }
}

/// Summary of a run that got past the staleness gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub cancelled: bool,
    /// Resources in the list, including any never started.
    pub total: usize,
    /// One result per started resource, in resource-list order.
    pub results: Vec<ResourceResult>,
}

impl RunReport {
    pub fn count(&self, action: ResourceAction) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(ResourceAction::Downloaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(ResourceAction::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(ResourceAction::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The last run is recent enough; nothing was probed.
    Gated { last_run: RunClock, age: Duration },
    Completed(RunReport),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Job<'a> {
    index: usize,
    resource: &'a ResourceDescriptor,
    cached: Option<CacheEntry>,
}

struct Processed {
    result: ResourceResult,
    /// Replacement cache entry; only set after a successful download.
    cache_update: Option<CacheEntry>,
}

pub struct SyncEngine<C> {
    client: C,
    layout: Layout,
    settings: SyncSettings,
    sanitizer: Sanitizer,
}

impl<C: RemoteClient> SyncEngine<C> {
    pub fn new(client: C, layout: Layout, settings: SyncSettings) -> Self {
        let sanitizer = Sanitizer::from_settings(&settings);
        Self {
            client,
            layout,
            settings,
            sanitizer,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one sync over the resource list at the layout's root.
    ///
    /// Only setup failures and state persistence failures are returned as
    /// errors; every per-resource failure is folded into the report.
    pub fn run(&self, options: RunOptions, cancel: &CancelToken) -> Result<RunOutcome, SyncError> {
        let started_at = Utc::now();
        let resources = resources::load_resource_list_at(
            &self.layout.resources_path(),
            &self.layout.data_dir(),
        )?;

        if !options.force {
            let clock = staleness::load_clock_at(&self.layout.run_clock_path());
            let policy = StalenessPolicy::new(self.settings.freshness_window());
            if let (Some(last_run), Freshness::Fresh { age }) =
                (clock.as_ref(), policy.evaluate(clock.as_ref(), started_at))
            {
                tracing::info!(
                    "last run finished {} ago, inside the {}h freshness window; skipping",
                    format_age(age),
                    self.settings.freshness_hours
                );
                return Ok(RunOutcome::Gated {
                    last_run: last_run.clone(),
                    age,
                });
            }
        }

        let mut cache = diff_cache::load_at(&self.layout.diff_cache_path());
        tracing::info!(
            "checking {} resource(s) with {} worker(s){}",
            resources.len(),
            self.settings.workers().min(resources.len().max(1)),
            if options.dry_run { " [dry-run]" } else { "" }
        );

        let results = self.process_all(&resources, &mut cache, options, cancel);
        let finished_at = Utc::now();
        let cancelled = results.len() < resources.len();
        let report = RunReport {
            started_at,
            finished_at,
            dry_run: options.dry_run,
            cancelled,
            total: resources.len(),
            results,
        };

        if cancelled {
            tracing::warn!(
                "run cancelled after {} of {} resource(s)",
                report.results.len(),
                report.total
            );
        }
        tracing::info!(
            "sync finished: {} downloaded, {} skipped, {} failed",
            report.downloaded(),
            report.skipped(),
            report.failed()
        );

        if options.dry_run {
            return Ok(RunOutcome::Completed(report));
        }

        diff_cache::save_at(&self.layout.diff_cache_path(), &cache)?;
        let manifest = Manifest::from_entries(
            finished_at,
            report.results.iter().map(ResourceResult::manifest_entry).collect(),
            cancelled,
        );
        manifest::write_at(&self.layout.manifest_path(), &manifest)?;
        if !cancelled {
            staleness::save_clock_at(&self.layout.run_clock_path(), &RunClock::at(finished_at))?;
        }

        Ok(RunOutcome::Completed(report))
    }

    /// Fan resources out to the worker pool and collect results in list
    /// order. Resources not started before cancellation are omitted.
    fn process_all(
        &self,
        resources: &[ResourceDescriptor],
        cache: &mut DiffCache,
        options: RunOptions,
        cancel: &CancelToken,
    ) -> Vec<ResourceResult> {
        let jobs: Vec<Job<'_>> = resources
            .iter()
            .enumerate()
            .map(|(index, resource)| Job {
                index,
                resource,
                cached: cache.get(resource.url.as_str()).cloned(),
            })
            .collect();
        let workers = self.settings.workers().min(jobs.len()).max(1);
        let cursor = AtomicUsize::new(0);
        let mut slots: Vec<Option<ResourceResult>> = vec![None; jobs.len()];

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, Processed)>();
            for _ in 0..workers {
                let tx = tx.clone();
                let jobs = &jobs;
                let cursor = &cursor;
                scope.spawn(move || loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(job) = jobs.get(cursor.fetch_add(1, Ordering::SeqCst)) else {
                        break;
                    };
                    let processed = self.process(job.resource, job.cached.as_ref(), options);
                    if tx.send((job.index, processed)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (index, processed) in rx {
                if let Some(entry) = processed.cache_update {
                    cache.insert(processed.result.url.as_str().to_owned(), entry);
                }
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(processed.result);
                }
            }
        });

        slots.into_iter().flatten().collect()
    }

    /// The per-resource pipeline. Never fails; errors become a `Failed`
    /// result carrying the message.
    fn process(
        &self,
        resource: &ResourceDescriptor,
        cached: Option<&CacheEntry>,
        options: RunOptions,
    ) -> Processed {
        let checked_at = Utc::now();
        let name = resource.name.as_str();
        let url = resource.url.as_str();
        let result = |action, reason, error| ResourceResult {
            name: resource.name.clone(),
            url: resource.url.clone(),
            action,
            reason,
            error,
            checked_at,
            downloaded_at: None,
        };
        let failed = |reason: Option<ChangeReason>, error: String| {
            tracing::warn!("{name} ({url}) failed: {error}");
            Processed {
                result: result(ResourceAction::Failed, reason, Some(error)),
                cache_update: None,
            }
        };

        let local = match fingerprint(&resource.local_path) {
            Ok(local) => local,
            Err(err) => {
                return failed(
                    None,
                    format!("cannot read {}: {err}", resource.local_path.display()),
                )
            }
        };

        let probe = self.client.probe(url, self.settings.probe_timeout());
        if let Err(err) = &probe {
            tracing::warn!("{name}: {err}");
        }

        let verdict = decide(probe.as_ref(), cached, &local);
        tracing::info!("{name}: {} ({})", verdict.reason, verdict.reason.describe());

        if !verdict.changed {
            return Processed {
                result: result(ResourceAction::Skipped, Some(verdict.reason), None),
                cache_update: None,
            };
        }
        if options.dry_run {
            tracing::info!("[dry-run] would download: {url}");
            return Processed {
                result: result(ResourceAction::WouldDownload, Some(verdict.reason), None),
                cache_update: None,
            };
        }

        let fetched = match fetch_to_temp(
            &self.client,
            url,
            self.settings.fetch_timeout(),
            &self.layout.data_dir(),
        ) {
            Ok(fetched) => fetched,
            Err(err) => return failed(Some(verdict.reason), err.to_string()),
        };

        let stats = match self
            .sanitizer
            .sanitize(fetched.payload.path(), &resource.local_path)
        {
            Ok(stats) => stats,
            Err(err) => return failed(Some(verdict.reason), err.to_string()),
        };

        let (content_hash, stored_length) = match fingerprint(&resource.local_path) {
            Ok(LocalFingerprint::Present { hash, size }) => (hash, size),
            Ok(LocalFingerprint::Absent) => {
                return failed(
                    Some(verdict.reason),
                    format!("{} vanished after write", resource.local_path.display()),
                )
            }
            Err(err) => {
                return failed(
                    Some(verdict.reason),
                    format!("cannot read {}: {err}", resource.local_path.display()),
                )
            }
        };

        let downloaded_at = Utc::now();
        let signals = match &probe {
            Ok(probed) => fetched.signals.clone().or(probed),
            Err(_) => fetched.signals.clone(),
        };
        let entry = CacheEntry {
            entity_tag: signals.entity_tag,
            last_modified: signals.last_modified,
            byte_length: Some(fetched.byte_length()),
            stored_length: Some(stored_length),
            content_hash: Some(content_hash),
            last_downloaded_at: downloaded_at,
        };

        tracing::info!(
            "downloaded {name}: {} byte(s), {} row(s){}",
            fetched.bytes_received,
            stats.rows,
            if stats.removed_columns.is_empty() {
                String::new()
            } else {
                format!(", removed {}", stats.removed_columns.join(", "))
            }
        );

        Processed {
            result: ResourceResult {
                downloaded_at: Some(downloaded_at),
                ..result(ResourceAction::Downloaded, Some(verdict.reason), None)
            },
            cache_update: Some(entry),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
