//! Harness configuration, loaded from `mbt.toml`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Upper bound for configured durations (100 years).
const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 3600;

/// What to do with an action tag the driver does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownActionPolicy {
    /// Abort the whole run.
    #[default]
    Fail,
    /// Skip the step with a warning.
    Ignore,
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Root of the trace directory tree.
    #[serde(default = "default_traces_dir")]
    pub traces_dir: PathBuf,

    /// Glob applied to file names under `traces_dir`.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Denomination of every amount and limit.
    #[serde(default = "default_denom")]
    pub denom: String,

    /// Lifetime of a freshly given grant, in seconds.
    #[serde(default = "default_grant_ttl_secs")]
    pub grant_ttl_secs: u64,

    /// How far an expire step moves the simulated clock, in seconds.
    /// Must be at least 1: an expired grant is one whose expiration lies
    /// strictly behind the clock.
    #[serde(default = "default_clock_step_secs")]
    pub clock_step_secs: u64,

    /// Simulated time at the start of every trace.
    #[serde(default = "default_genesis_time")]
    pub genesis_time: DateTime<Utc>,

    #[serde(default)]
    pub unknown_actions: UnknownActionPolicy,

    /// On exec, require the stored authorization to equal the one built
    /// from the step's grant payload.
    #[serde(default = "default_true")]
    pub check_stored_payload: bool,

    /// After each step, compare the store against the model's
    /// `active_grants` / `expired_grants` bookkeeping.
    #[serde(default)]
    pub verify_model_state: bool,

    #[serde(default)]
    pub fixture: FixtureConfig,
}

/// Names provisioned before each trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default = "default_accounts")]
    pub accounts: Vec<String>,

    #[serde(default = "default_validators")]
    pub validators: Vec<String>,

    /// Account that receives every send executed through a grant.
    #[serde(default = "default_recipient")]
    pub default_recipient: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            traces_dir: default_traces_dir(),
            file_pattern: default_file_pattern(),
            denom: default_denom(),
            grant_ttl_secs: default_grant_ttl_secs(),
            clock_step_secs: default_clock_step_secs(),
            genesis_time: default_genesis_time(),
            unknown_actions: UnknownActionPolicy::default(),
            check_stored_payload: default_true(),
            verify_model_state: false,
            fixture: FixtureConfig::default(),
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            validators: default_validators(),
            default_recipient: default_recipient(),
        }
    }
}

// Serde default functions
fn default_traces_dir() -> PathBuf {
    PathBuf::from("traces")
}

fn default_file_pattern() -> String {
    "*.json".to_string()
}

fn default_denom() -> String {
    "stake".to_string()
}

fn default_grant_ttl_secs() -> u64 {
    3600
}

fn default_clock_step_secs() -> u64 {
    60
}

fn default_genesis_time() -> DateTime<Utc> {
    // 2022-01-01T00:00:00Z
    DateTime::<Utc>::from_timestamp(1_640_995_200, 0).unwrap_or_default()
}

fn default_true() -> bool {
    true
}

fn default_accounts() -> Vec<String> {
    ["A", "B", "C", "default_recipient"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_validators() -> Vec<String> {
    ["X", "Y", "Z"].iter().map(|s| s.to_string()).collect()
}

fn default_recipient() -> String {
    "default_recipient".to_string()
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Setup(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DriverError::Setup(format!("invalid config {}: {}", path.display(), e)))?;
        if config.clock_step_secs == 0 {
            return Err(DriverError::Setup(format!(
                "invalid config {}: clock_step_secs must be at least 1",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, DriverError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn grant_ttl(&self) -> Duration {
        Duration::seconds(self.grant_ttl_secs.min(MAX_DURATION_SECS) as i64)
    }

    pub fn clock_step(&self) -> Duration {
        Duration::seconds(self.clock_step_secs.clamp(1, MAX_DURATION_SECS) as i64)
    }
}
