//! `feedmirror clear-cache`: forget cached signals and the run clock.

use anyhow::{Context, Result};
use clap::Args;

use feedmirror_core::Layout;
use feedmirror_sync::pipeline;

/// Arguments for `feedmirror clear-cache`.
#[derive(Args, Debug)]
pub struct ClearCacheArgs {}

impl ClearCacheArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        let cleared = pipeline::clear_cache(layout).with_context(|| {
            format!("failed to clear cache at {}", layout.root().display())
        })?;
        if !cleared.diff_cache && !cleared.run_clock {
            println!("✓ nothing to clear");
        } else {
            println!("✓ cache cleared; the next run re-downloads every resource");
        }
        Ok(())
    }
}
