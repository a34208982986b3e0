// run.rs — `mbt run`: replay a trace directory and report.

use std::path::Path;

use anyhow::{bail, Context};
use mbt_authz::{Harness, HarnessConfig, RunReport, UnknownActionPolicy};

use super::truncate;

pub struct RunArgs<'a> {
    pub traces: Option<&'a Path>,
    pub config: &'a Path,
    pub pattern: Option<&'a str>,
    pub report: Option<&'a Path>,
    pub ignore_unknown_actions: bool,
}

pub fn execute(args: &RunArgs<'_>) -> anyhow::Result<()> {
    let mut config = HarnessConfig::load_or_default(args.config)?;
    if let Some(traces) = args.traces {
        config.traces_dir = traces.to_path_buf();
    }
    if let Some(pattern) = args.pattern {
        config.file_pattern = pattern.to_string();
    }
    if args.ignore_unknown_actions {
        config.unknown_actions = UnknownActionPolicy::Ignore;
    }

    let harness = Harness::in_memory(config);
    let config = harness.config();
    tracing::info!(
        traces_dir = %config.traces_dir.display(),
        pattern = %config.file_pattern,
        unknown_actions = ?config.unknown_actions,
        "starting run"
    );
    let report = harness.run()?;
    print_summary(&report);

    if let Some(path) = args.report {
        let json = report.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    if report.aborted {
        bail!("run aborted by a fatal driver error");
    }
    if report.failed() > 0 {
        bail!("{} of {} trace(s) failed", report.failed(), report.traces.len());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    if report.traces.is_empty() {
        println!("No trace files found.");
        return;
    }

    println!("{:<48} {:<8} {:<14}", "TRACE", "STEPS", "STATUS");
    println!("{}", "-".repeat(72));
    for t in &report.traces {
        let status = match &t.status {
            mbt_authz::TraceStatus::Passed => "passed",
            mbt_authz::TraceStatus::Mismatch { .. } => "mismatch",
            mbt_authz::TraceStatus::ParseFailed { .. } => "parse_failed",
            mbt_authz::TraceStatus::Fatal { .. } => "fatal",
        };
        println!(
            "{:<48} {:<8} {:<14}",
            truncate(&t.path.display().to_string(), 46),
            t.steps_applied,
            status,
        );
        if !t.is_passed() {
            println!("    {}", t.status);
        }
    }
    println!(
        "\n{} passed, {} failed{}.",
        report.passed(),
        report.failed(),
        if report.aborted { " (aborted)" } else { "" }
    );
}
