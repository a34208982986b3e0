// error.rs — Error taxonomy for trace replay.
//
// Replay errors fall into two groups. Errors that are *checked* against the
// trace's expected outcome (BuildError, ResolutionError, StoreError,
// AcceptError) never escape a handler on their own. Errors that *escape*
// (DriverError) end the replay of the current trace, and `Setup` /
// `UnrecognizedAction` end the whole run.

use std::path::PathBuf;

use thiserror::Error;

/// A trace file could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The trace file could not be read.
    #[error("failed to read trace file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid trace JSON.
    #[error("malformed trace JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A state decoded as JSON but does not describe a valid step.
    #[error("state {index}: {reason}")]
    InvalidState { index: usize, reason: String },
}

/// A symbolic name from the model has no concrete identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No account is registered under this name.
    #[error("unknown account '{0}'")]
    UnknownAccount(String),

    /// No validator is registered under this name.
    #[error("unknown validator '{0}'")]
    UnknownValidator(String),
}

/// An abstract payload or exec request cannot be turned into a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A name in the payload did not resolve.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The payload's authorization logic is not generic, send or stake.
    #[error("unknown authorization logic '{0}'")]
    UnknownLogic(String),

    /// The model message type has no concrete counterpart.
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    /// Amounts and limits must be non-negative.
    #[error("negative amount {0}")]
    NegativeAmount(i64),

    /// A redelegation needs a destination validator.
    #[error("redelegation is missing a destination validator")]
    MissingNewValidator,

    /// Stake payloads may carry an allow list or a deny list, never both.
    #[error("cannot set both allow and deny lists")]
    BothValidatorLists,

    /// Stake payloads must carry one non-empty validator list.
    #[error("allow and deny lists cannot both be empty")]
    NoValidatorList,

    /// The built authorization failed its own consistency check.
    #[error("invalid authorization: {0}")]
    Invalid(String),
}

/// Why an authorization refused a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceptError {
    /// The message spends more than the remaining limit.
    #[error("insufficient grant: requested {requested}, remaining {remaining}")]
    Insufficient { requested: u64, remaining: u64 },

    /// The validator is not on the allow list.
    #[error("validator {0} is not on the allow list")]
    NotAllowed(String),

    /// The validator is on the deny list.
    #[error("validator {0} is on the deny list")]
    Denied(String),

    /// The authorization does not cover this kind of message.
    #[error("message {0} is not supported by the authorization")]
    UnsupportedMessage(String),
}

/// Errors reported by a [`GrantStore`](crate::store::GrantStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No grant is stored under the key.
    #[error("no authorization found for {msg_type_url} ({granter} -> {grantee})")]
    NotFound {
        granter: String,
        grantee: String,
        msg_type_url: String,
    },

    /// The grant exists but its expiration has passed.
    #[error("authorization for {msg_type_url} ({granter} -> {grantee}) has expired")]
    Expired {
        granter: String,
        grantee: String,
        msg_type_url: String,
    },

    /// The authorization cannot be stored (e.g. it has no message type).
    #[error("cannot store authorization: {0}")]
    InvalidAuthorization(String),

    /// The authorization refused the dispatched message.
    #[error("authorization rejected message: {0}")]
    Rejected(#[from] AcceptError),
}

/// An observed effect diverged from the trace's expected outcome.
///
/// This is the harness's primary finding, so it carries everything needed
/// to locate the divergence: the step index, the action, the compared
/// field, and both values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {step} ({action}): {field}: expected {expected}, observed {actual}")]
pub struct ConformanceMismatch {
    pub step: usize,
    pub action: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
}

/// Errors that escape a replay.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The trace could not be decoded. Aborts this trace only.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The implementation diverged from the model. Aborts this trace only.
    #[error(transparent)]
    Mismatch(#[from] ConformanceMismatch),

    /// The trace contains an action the driver does not know. Fatal.
    #[error("step {step}: unrecognized action '{tag}'")]
    UnrecognizedAction { step: usize, tag: String },

    /// The replay environment could not be provisioned. Fatal.
    #[error("environment setup failed: {0}")]
    Setup(String),
}

impl DriverError {
    /// Fatal errors abort the whole run, not just the current trace.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::UnrecognizedAction { .. } | DriverError::Setup(_)
        )
    }
}
