//! `feedmirror run`: one sync pass over the resource list.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use feedmirror_core::{Layout, RunClock};
use feedmirror_sync::{
    pipeline, staleness::format_age, CancelToken, ResourceAction, RunOptions, RunOutcome,
    RunReport,
};

use super::with_ctrl_c;

/// Arguments for `feedmirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Ignore the freshness window and check every resource now.
    #[arg(long)]
    pub force: bool,

    /// Probe and report what would be downloaded without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        let options = RunOptions {
            force: self.force,
            dry_run: self.dry_run,
        };
        let cancel = CancelToken::new();
        let job_layout = layout.clone();
        let job_cancel = cancel.clone();
        let outcome = with_ctrl_c(cancel, move || {
            pipeline::run(&job_layout, options, &job_cancel)
        })?
        .with_context(|| format!("sync failed for mirror at {}", layout.root().display()))?;

        if self.json {
            print_json(&outcome)?;
        } else {
            print_outcome(&outcome);
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
enum OutcomeJson<'a> {
    Gated {
        #[serde(rename = "lastRun")]
        last_run: &'a RunClock,
        #[serde(rename = "ageSecs")]
        age_secs: i64,
    },
    Completed(&'a RunReport),
}

fn print_json(outcome: &RunOutcome) -> Result<()> {
    let payload = match outcome {
        RunOutcome::Gated { last_run, age } => OutcomeJson::Gated {
            last_run,
            age_secs: age.num_seconds(),
        },
        RunOutcome::Completed(report) => OutcomeJson::Completed(report),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize run JSON")?
    );
    Ok(())
}

/// Human-readable summary shared with `feedmirror watch`.
pub(crate) fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Gated { last_run, age } => {
            println!(
                "✓ last run finished {} ago ({} {} UTC); nothing to do",
                format_age(*age),
                last_run.date,
                last_run.time
            );
            println!("Run 'feedmirror run --force' to check every resource anyway.");
        }
        RunOutcome::Completed(report) => print_report(report),
    }
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if report.total == 0 {
        println!("{prefix}✓ resource list is empty; nothing to do");
        return;
    }

    let mut summary = format!(
        "{prefix}✓ sync finished ({} downloaded, {} skipped, {} failed",
        report.downloaded(),
        report.skipped(),
        report.failed()
    );
    if report.dry_run {
        summary.push_str(&format!(
            ", {} would download",
            report.count(ResourceAction::WouldDownload)
        ));
    }
    summary.push(')');
    println!("{summary}");

    for result in &report.results {
        let reason = result.reason.map(|r| r.as_str()).unwrap_or("-");
        match result.action {
            ResourceAction::Downloaded => {
                println!("  {}  {}  {}", "✎".green(), result.name, reason.bright_black())
            }
            ResourceAction::WouldDownload => {
                println!("  {}  {}  {}", "~".yellow(), result.name, reason.bright_black())
            }
            ResourceAction::Skipped => {
                println!("  ·  {}  {}", result.name, reason.bright_black())
            }
            ResourceAction::Failed => println!(
                "  {}  {}  {}",
                "✗".red(),
                result.name,
                result.error.as_deref().unwrap_or(reason).red()
            ),
        }
    }

    if report.cancelled {
        println!(
            "{} run cancelled after {} of {} resource(s); the next run resumes the rest",
            "!".yellow().bold(),
            report.results.len(),
            report.total
        );
    }
}
