//! # mbt
//!
//! Command-line interface for the authorization-grant conformance harness.
//!
//! - `mbt run` — replay every trace under a directory and report
//! - `mbt inspect FILE` — decode one trace and print its steps

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Replay model-checker traces against a grant store.
#[derive(Parser)]
#[command(name = "mbt", version, about)]
struct Cli {
    /// Log every replayed step. Ignored when `RUST_LOG` is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay every trace file and report per-file results.
    Run {
        /// Trace directory (overrides `traces_dir` from the config).
        #[arg(long)]
        traces: Option<PathBuf>,
        /// Harness config file.
        #[arg(long, default_value = "mbt.toml")]
        config: PathBuf,
        /// File-name glob (overrides `file_pattern` from the config).
        #[arg(long)]
        pattern: Option<String>,
        /// Write the run report as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Skip unknown actions instead of aborting the run.
        #[arg(long)]
        ignore_unknown_actions: bool,
    },
    /// Decode one trace file and print its steps without replaying.
    Inspect {
        /// Trace file.
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), cli.verbose)?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match &cli.command {
        Commands::Run {
            traces,
            config,
            pattern,
            report,
            ignore_unknown_actions,
        } => commands::run::execute(&commands::run::RunArgs {
            traces: traces.as_deref(),
            config,
            pattern: pattern.as_deref(),
            report: report.as_deref(),
            ignore_unknown_actions: *ignore_unknown_actions,
        }),
        Commands::Inspect { file } => commands::inspect::execute(file),
    }
}

/// `RUST_LOG` wins when set; otherwise both crates log at `info`, or
/// `debug` with `--verbose`.
fn log_filter(rust_log: Option<&str>, verbose: bool) -> anyhow::Result<EnvFilter> {
    match rust_log.filter(|d| !d.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid RUST_LOG: {}", directives)),
        None => {
            let level = if verbose { "debug" } else { "info" };
            Ok(EnvFilter::try_new(format!("mbt_authz={level},mbt={level}"))?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_is_not_overridden() {
        let filter = log_filter(Some("mbt_authz=trace"), true).unwrap().to_string();
        assert!(filter.contains("mbt_authz=trace"), "{}", filter);
        assert!(!filter.contains("debug"), "{}", filter);
    }

    #[test]
    fn verbose_applies_without_rust_log() {
        let filter = log_filter(None, true).unwrap().to_string();
        assert!(filter.contains("mbt_authz=debug"), "{}", filter);
        let filter = log_filter(Some(""), false).unwrap().to_string();
        assert!(filter.contains("mbt=info"), "{}", filter);
    }
}
