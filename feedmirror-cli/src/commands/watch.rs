//! `feedmirror watch`: scheduled runs until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use feedmirror_core::Layout;
use feedmirror_sync::{pipeline, CancelToken, RunOptions};

use super::run::print_outcome;

/// Arguments for `feedmirror watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Hours between runs. Each run is still gated by the freshness window.
    #[arg(long, default_value_t = 1)]
    pub interval_hours: u64,
}

impl WatchArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        if self.interval_hours == 0 {
            bail!("--interval-hours must be at least 1");
        }
        let period = Duration::from_secs(self.interval_hours.saturating_mul(60 * 60));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        runtime.block_on(watch(layout.clone(), period))
    }
}

async fn watch(layout: Layout, period: Duration) -> Result<()> {
    let cancel = CancelToken::new();
    let stop = Arc::new(tokio::sync::Notify::new());
    {
        let cancel = cancel.clone();
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received ctrl-c, stopping after in-flight resources");
                    cancel.cancel();
                    stop.notify_one();
                }
                Err(err) => tracing::warn!("ctrl-c handler failed: {err}"),
            }
        });
    }

    tracing::info!(
        "watching {} every {}h",
        layout.root().display(),
        period.as_secs() / (60 * 60)
    );
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.notified() => break,
            _ = interval.tick() => {}
        }
        if cancel.is_cancelled() {
            break;
        }

        let job_layout = layout.clone();
        let job_cancel = cancel.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            pipeline::run(&job_layout, RunOptions::default(), &job_cancel)
        })
        .await
        .context("sync task panicked")?;

        // Setup errors are logged and retried on the next tick.
        match outcome {
            Ok(outcome) => print_outcome(&outcome),
            Err(err) => tracing::error!("scheduled run failed: {err}"),
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    tracing::info!("watch stopped");
    Ok(())
}
