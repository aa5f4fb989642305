//! `feedmirror status`: freshness and last-run visibility.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use feedmirror_core::{Layout, ManifestEntry, ManifestStatus};
use feedmirror_sync::{
    pipeline::{self, StatusReport},
    staleness::format_datetime_age,
};

/// Arguments for `feedmirror status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        let report = pipeline::status(layout).with_context(|| {
            format!("failed to read mirror state at {}", layout.root().display())
        })?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "resource")]
    name: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "reason")]
    reason: String,
    #[tabled(rename = "downloaded")]
    downloaded: String,
}

fn print_table(report: &StatusReport) {
    let freshness = match (&report.last_run, report.gated) {
        (None, _) => "never run".bright_black().to_string(),
        (Some(clock), true) => format!(
            "{} (last run {} ago)",
            "FRESH".green().bold(),
            format_datetime_age(clock.timestamp)
        ),
        (Some(clock), false) => format!(
            "{} (last run {} ago)",
            "STALE".yellow().bold(),
            format_datetime_age(clock.timestamp)
        ),
    };
    println!(
        "feedmirror v{} | {} | window {}h | {}",
        env!("CARGO_PKG_VERSION"),
        report.root.display(),
        report.freshness_hours,
        freshness
    );
    println!("{} resource(s) in diff cache", report.cached_resources);
    if let Some(err) = &report.cache_error {
        println!("{} {err}", "!".yellow().bold());
    }

    let Some(manifest) = &report.manifest else {
        println!("No runs recorded yet. Run 'feedmirror run' to populate the mirror.");
        return;
    };

    println!(
        "Last run {} ago: {} downloaded, {} skipped, {} failed{}",
        format_datetime_age(manifest.last_updated),
        manifest.downloaded,
        manifest.skipped,
        manifest.failed,
        if manifest.cancelled { " (cancelled)" } else { "" }
    );
    if manifest.files.is_empty() {
        return;
    }

    let rows: Vec<StatusTableRow> = manifest.files.iter().map(table_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if manifest.failed > 0 {
        println!("Run 'feedmirror run --force' to retry failed resources.");
    }
}

fn table_row(entry: &ManifestEntry) -> StatusTableRow {
    StatusTableRow {
        name: entry.name.clone(),
        status: status_label(entry.status),
        reason: entry
            .error
            .clone()
            .or_else(|| entry.reason.map(|r| r.describe().to_string()))
            .unwrap_or_default(),
        downloaded: entry
            .downloaded_at
            .map(format_datetime_age)
            .map(|age| format!("{age} ago"))
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn status_label(status: ManifestStatus) -> String {
    match status {
        ManifestStatus::Downloaded => "DOWNLOADED".green().bold().to_string(),
        ManifestStatus::Skipped => "SKIPPED".bright_black().bold().to_string(),
        ManifestStatus::Failed => "FAILED".red().bold().to_string(),
    }
}
