// runner.rs — Harness: discovers trace files and replays each one in a
// fresh environment.
//
// Failure scoping:
// - Parse failures and conformance mismatches fail only their own file.
// - Fatal driver errors (unknown action, setup failure) abort the run;
//   files after it are not replayed and the report is marked aborted.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::dispatcher::{ActionDispatcher, ReplaySummary};
use crate::env::ReplayEnv;
use crate::error::DriverError;
use crate::report::{RunReport, TraceReport, TraceStatus};
use crate::store::{GrantStore, MemoryGrantStore};
use crate::trace::Trace;

/// Replays traces against stores built by a factory, one store per trace.
pub struct Harness<S> {
    config: HarnessConfig,
    factory: Box<dyn Fn() -> S>,
}

impl Harness<MemoryGrantStore> {
    /// A harness replaying against the in-memory reference store.
    pub fn in_memory(config: HarnessConfig) -> Self {
        Self::new(config, MemoryGrantStore::new)
    }
}

impl<S: GrantStore> Harness<S> {
    pub fn new(config: HarnessConfig, factory: impl Fn() -> S + 'static) -> Self {
        Self {
            config,
            factory: Box::new(factory),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(self.config.unknown_actions)
    }

    /// A new environment: fixture identities, clock at genesis, empty store.
    pub fn fresh_env(&self) -> Result<ReplayEnv<S>, DriverError> {
        ReplayEnv::new(&self.config, (self.factory)())
    }

    /// Replay one decoded trace in a fresh environment.
    pub fn run_trace(&self, trace: &Trace) -> Result<ReplaySummary, DriverError> {
        let mut env = self.fresh_env()?;
        self.dispatcher().replay(&mut env, trace)
    }

    /// Load and replay one trace file.
    pub fn run_file(&self, path: &Path) -> TraceReport {
        let run_id = Uuid::new_v4();
        let mut summary = ReplaySummary::default();
        let outcome = Trace::load(path)
            .map_err(DriverError::from)
            .and_then(|trace| {
                let mut env = self.fresh_env()?;
                self.dispatcher().replay_into(&mut env, &trace, &mut summary)
            });

        let status = match outcome {
            Ok(()) => {
                tracing::info!(%run_id, path = %path.display(), steps = summary.applied, "trace passed");
                TraceStatus::Passed
            }
            Err(e) => {
                tracing::error!(%run_id, path = %path.display(), error = %e, "trace failed");
                e.into()
            }
        };
        TraceReport {
            run_id,
            path: path.to_path_buf(),
            steps_applied: summary.applied,
            steps_skipped: summary.skipped,
            status,
        }
    }

    /// Trace files under the configured directory, in sorted order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, DriverError> {
        discover(&self.config.traces_dir, &self.config.file_pattern)
    }

    /// Replay every discovered trace file.
    pub fn run(&self) -> Result<RunReport, DriverError> {
        let started_at = Utc::now();
        let paths = self.discover()?;
        if paths.is_empty() {
            tracing::warn!(dir = %self.config.traces_dir.display(), "no trace files found");
        }
        tracing::info!(count = paths.len(), dir = %self.config.traces_dir.display(), "replaying traces");

        let mut traces = Vec::with_capacity(paths.len());
        let mut aborted = false;
        for path in &paths {
            let report = self.run_file(path);
            let fatal = matches!(report.status, TraceStatus::Fatal { .. });
            traces.push(report);
            if fatal {
                tracing::error!(path = %path.display(), "fatal driver error, aborting run");
                aborted = true;
                break;
            }
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            traces,
            aborted,
        })
    }
}

/// Find files under `root` (at any depth) whose name matches `file_pattern`.
pub fn discover(root: &Path, file_pattern: &str) -> Result<Vec<PathBuf>, DriverError> {
    if !root.is_dir() {
        return Err(DriverError::Setup(format!(
            "trace directory {} does not exist",
            root.display()
        )));
    }
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        file_pattern
    );
    let entries = glob::glob(&pattern).map_err(|e| {
        DriverError::Setup(format!("invalid file pattern '{}': {}", file_pattern, e))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
        }
    }
    paths.sort();
    Ok(paths)
}
