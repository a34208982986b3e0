// report.rs — Per-trace and per-run results.
//
// Reports are plain serde data so the CLI can print them as a table or write
// them out as JSON unchanged.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConformanceMismatch, DriverError};

/// How the replay of one trace file ended.
///
/// Serializes as `{"status": "mismatch", "step": 3, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceStatus {
    /// Every step matched the model.
    Passed,

    /// The implementation diverged from the model.
    Mismatch {
        step: usize,
        action: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// The file is not a valid trace.
    ParseFailed { reason: String },

    /// The replay hit an unrecoverable driver error.
    Fatal { reason: String },
}

impl TraceStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, TraceStatus::Passed)
    }
}

impl From<ConformanceMismatch> for TraceStatus {
    fn from(m: ConformanceMismatch) -> Self {
        TraceStatus::Mismatch {
            step: m.step,
            action: m.action,
            field: m.field,
            expected: m.expected,
            actual: m.actual,
        }
    }
}

impl From<DriverError> for TraceStatus {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Mismatch(m) => m.into(),
            DriverError::Parse(p) => TraceStatus::ParseFailed {
                reason: p.to_string(),
            },
            fatal => TraceStatus::Fatal {
                reason: fatal.to_string(),
            },
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceStatus::Passed => write!(f, "passed"),
            TraceStatus::Mismatch {
                step,
                action,
                field,
                expected,
                actual,
            } => write!(
                f,
                "mismatch at step {} ({}): {}: expected {}, observed {}",
                step, action, field, expected, actual
            ),
            TraceStatus::ParseFailed { reason } => write!(f, "parse failed: {}", reason),
            TraceStatus::Fatal { reason } => write!(f, "fatal: {}", reason),
        }
    }
}

/// Result of replaying one trace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReport {
    pub run_id: Uuid,
    pub path: PathBuf,
    /// Steps applied before the replay ended.
    pub steps_applied: usize,
    /// Unknown steps skipped under the ignore policy.
    #[serde(default)]
    pub steps_skipped: usize,
    #[serde(flatten)]
    pub status: TraceStatus,
}

impl TraceReport {
    pub fn is_passed(&self) -> bool {
        self.status.is_passed()
    }
}

/// Result of one harness run over a trace directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub traces: Vec<TraceReport>,
    /// A fatal error stopped the run; later files were not replayed.
    pub aborted: bool,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.traces.iter().filter(|t| t.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.traces.len() - self.passed()
    }

    /// True when every trace passed and the run was not aborted.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed() == 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: TraceStatus) -> TraceReport {
        TraceReport {
            run_id: Uuid::new_v4(),
            path: PathBuf::from("traces/t.json"),
            steps_applied: 2,
            steps_skipped: 0,
            status,
        }
    }

    #[test]
    fn mismatch_serializes_flat_with_status_tag() {
        let status: TraceStatus = ConformanceMismatch {
            step: 3,
            action: "execute grant".to_string(),
            field: "updated".to_string(),
            expected: "a".to_string(),
            actual: "b".to_string(),
        }
        .into();
        let json = serde_json::to_value(report(status)).unwrap();
        assert_eq!(json["status"], "mismatch");
        assert_eq!(json["step"], 3);
        assert_eq!(json["field"], "updated");
        assert_eq!(json["steps_applied"], 2);
    }

    #[test]
    fn driver_errors_map_to_statuses() {
        let fatal: TraceStatus = DriverError::Setup("no fixture".to_string()).into();
        match fatal {
            TraceStatus::Fatal { reason } => assert!(reason.contains("no fixture")),
            other => panic!("expected Fatal, got {:?}", other),
        }
        let parse: TraceStatus = DriverError::Parse(crate::error::ParseError::InvalidState {
            index: 1,
            reason: "bad label".to_string(),
        })
        .into();
        assert!(matches!(parse, TraceStatus::ParseFailed { .. }));
    }

    #[test]
    fn run_success_requires_all_passed_and_no_abort() {
        let now = Utc::now();
        let mut run = RunReport {
            started_at: now,
            finished_at: now,
            traces: vec![report(TraceStatus::Passed)],
            aborted: false,
        };
        assert!(run.is_success());
        run.aborted = true;
        assert!(!run.is_success());
        run.aborted = false;
        run.traces.push(report(TraceStatus::ParseFailed {
            reason: "x".to_string(),
        }));
        assert!(!run.is_success());
        assert_eq!(run.passed(), 1);
        assert_eq!(run.failed(), 1);

        let round: RunReport = serde_json::from_str(&run.to_json().unwrap()).unwrap();
        assert_eq!(round.traces[1].status, run.traces[1].status);
    }
}
