// trace.rs — Trace model and loader.
//
// A trace file is one run of the model checker:
//
//   { "#meta": {...}, "vars": [...], "states": [ state, state, ... ] }
//
// Each state records the action the model just took, the outcome it
// predicts, and a snapshot of the model's own bookkeeping. Decoding happens
// in two passes: serde reads the file into private `Raw*` structs (with the
// `#set`/`#map` markers unwrapped by `crate::itf`), then `Trace::from_raw`
// converts them into the typed `Step`/`Action` values the driver consumes.
// Nothing downstream ever sees a string-keyed action or a set marker.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::itf;

/// Model value that marks a stake limit as unlimited.
pub const UNLIMITED_SENTINEL: &str = "inf";

/// The outcome the model predicts for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutcomeLabel {
    GrantSuccess,
    GrantFailed,
    RevokeSuccess,
    RevokeFailed,
    NonexistentGrantExec,
    ExpiredAuthExec,
    InsufficientGrantExec,
    SuccessfulAuthExec,
    InappropriateAuthStakeNotAllow,
    InappropriateAuthStakeDeny,
    InappropriateAuthForMessage,
    GrantSpent,
}

impl OutcomeLabel {
    pub const ALL: [OutcomeLabel; 12] = [
        OutcomeLabel::GrantSuccess,
        OutcomeLabel::GrantFailed,
        OutcomeLabel::RevokeSuccess,
        OutcomeLabel::RevokeFailed,
        OutcomeLabel::NonexistentGrantExec,
        OutcomeLabel::ExpiredAuthExec,
        OutcomeLabel::InsufficientGrantExec,
        OutcomeLabel::SuccessfulAuthExec,
        OutcomeLabel::InappropriateAuthStakeNotAllow,
        OutcomeLabel::InappropriateAuthStakeDeny,
        OutcomeLabel::InappropriateAuthForMessage,
        OutcomeLabel::GrantSpent,
    ];

    /// The label as the model spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeLabel::GrantSuccess => "grant_success",
            OutcomeLabel::GrantFailed => "grant_failed",
            OutcomeLabel::RevokeSuccess => "revoke_success",
            OutcomeLabel::RevokeFailed => "revoke_failed",
            OutcomeLabel::NonexistentGrantExec => "non_existent_auth",
            OutcomeLabel::ExpiredAuthExec => "tried to execute an expired grant",
            OutcomeLabel::InsufficientGrantExec => "insufficient_auth_exec",
            OutcomeLabel::SuccessfulAuthExec => "successful_auth_exec",
            OutcomeLabel::InappropriateAuthStakeNotAllow => "inappropriate_auth_stake_not_allow",
            OutcomeLabel::InappropriateAuthStakeDeny => "inappropriate_auth_stake_deny",
            OutcomeLabel::InappropriateAuthForMessage => {
                "message_not_supported_by_the_authorization"
            }
            OutcomeLabel::GrantSpent => "grant_spent",
        }
    }

    /// Labels under which an exec must be refused by the store.
    pub fn is_rejected_exec(&self) -> bool {
        matches!(
            self,
            OutcomeLabel::InsufficientGrantExec
                | OutcomeLabel::InappropriateAuthStakeNotAllow
                | OutcomeLabel::InappropriateAuthStakeDeny
                | OutcomeLabel::InappropriateAuthForMessage
        )
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown outcome label '{}'", s))
    }
}

impl TryFrom<String> for OutcomeLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutcomeLabel> for String {
    fn from(label: OutcomeLabel) -> Self {
        label.as_str().to_string()
    }
}

/// Identifies a grant slot: (granter, grantee, model message type).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantDescriptor {
    #[serde(default)]
    pub granter: String,
    #[serde(default)]
    pub grantee: String,
    #[serde(default, rename = "sdk_message_type")]
    pub message_type: String,
}

impl GrantDescriptor {
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            granter: granter.into(),
            grantee: grantee.into(),
            message_type: message_type.into(),
        }
    }

    /// A grant from an account to itself.
    pub fn is_self_grant(&self) -> bool {
        self.granter == self.grantee
    }
}

impl fmt::Display for GrantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} [{}]", self.granter, self.grantee, self.message_type)
    }
}

/// Limit of a stake payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeLimit {
    Finite(i64),
    Unlimited,
}

/// The model's abstract description of an authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationPayload {
    Generic,
    Send {
        limit: i64,
    },
    Stake {
        allow_list: BTreeSet<String>,
        deny_list: BTreeSet<String>,
        limit: StakeLimit,
    },
    /// A logic tag the driver does not know; building it always fails.
    Unrecognized {
        logic: String,
    },
}

impl AuthorizationPayload {
    pub fn logic(&self) -> &str {
        match self {
            AuthorizationPayload::Generic => "generic",
            AuthorizationPayload::Send { .. } => "send",
            AuthorizationPayload::Stake { .. } => "stake",
            AuthorizationPayload::Unrecognized { logic } => logic,
        }
    }
}

/// What the grantee attempts to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub message_type: String,
    pub amount: i64,
    pub validator: String,
    pub new_validator: Option<String>,
}

/// The model's prediction for an exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub accept: bool,
    pub delete: bool,
    pub updated: Option<AuthorizationPayload>,
    pub description: String,
}

/// One action of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The initial state; nothing to apply.
    Init,
    GiveGrant {
        grant: GrantDescriptor,
        payload: AuthorizationPayload,
    },
    RevokeGrant {
        grant: GrantDescriptor,
    },
    ExpireGrant {
        grant: GrantDescriptor,
    },
    ExecuteGrant {
        grant: GrantDescriptor,
        payload: AuthorizationPayload,
        request: ExecRequest,
        expected: ExecResult,
    },
    /// An action tag the driver does not know.
    Unrecognized {
        tag: String,
    },
}

impl Action {
    pub const GIVE_GRANT: &'static str = "give grant";
    pub const REVOKE_GRANT: &'static str = "revoke grant";
    pub const EXPIRE_GRANT: &'static str = "expire grant";
    pub const EXECUTE_GRANT: &'static str = "execute grant";

    /// The action tag as the model spells it ("" for the initial state).
    pub fn tag(&self) -> &str {
        match self {
            Action::Init => "",
            Action::GiveGrant { .. } => Self::GIVE_GRANT,
            Action::RevokeGrant { .. } => Self::REVOKE_GRANT,
            Action::ExpireGrant { .. } => Self::EXPIRE_GRANT,
            Action::ExecuteGrant { .. } => Self::EXECUTE_GRANT,
            Action::Unrecognized { tag } => tag,
        }
    }

    pub fn grant(&self) -> Option<&GrantDescriptor> {
        match self {
            Action::GiveGrant { grant, .. }
            | Action::RevokeGrant { grant }
            | Action::ExpireGrant { grant }
            | Action::ExecuteGrant { grant, .. } => Some(grant),
            Action::Init | Action::Unrecognized { .. } => None,
        }
    }

    /// Whether replaying this action checks the outcome label.
    fn needs_label(&self) -> bool {
        matches!(
            self,
            Action::GiveGrant { .. } | Action::RevokeGrant { .. } | Action::ExecuteGrant { .. }
        )
    }
}

/// The model's own view of the grants after a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelState {
    pub active_grants: Vec<(GrantDescriptor, AuthorizationPayload)>,
    pub expired_grants: BTreeSet<GrantDescriptor>,
}

/// One state of the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Position in the trace's `states` array.
    pub index: usize,
    pub action: Action,
    /// Expected outcome; `None` when the model left it empty.
    pub outcome: Option<OutcomeLabel>,
    /// Grants outstanding according to the model (not enforced).
    pub num_grants: i64,
    /// Executions performed according to the model (not enforced).
    pub num_execs: i64,
    pub model: ModelState,
}

/// A decoded trace: one independent unit of replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub meta: serde_json::Value,
    pub vars: Vec<String>,
    pub steps: Vec<Step>,
}

impl Trace {
    /// Decode a trace from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: RawTrace = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    /// Read and decode a trace file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    fn from_raw(raw: RawTrace) -> Result<Self, ParseError> {
        let steps = raw
            .states
            .into_iter()
            .enumerate()
            .map(|(index, state)| state.into_step(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            meta: raw.meta,
            vars: raw.vars,
            steps,
        })
    }
}

// ── Raw serde model ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawTrace {
    #[serde(rename = "#meta", alias = "meta", default)]
    meta: serde_json::Value,
    #[serde(default)]
    vars: Vec<String>,
    states: Vec<RawState>,
}

#[derive(Debug, Default, Deserialize)]
struct RawState {
    #[serde(default)]
    action_taken: RawAction,
    #[serde(default)]
    outcome_status: String,
    #[serde(default, deserialize_with = "itf::int")]
    num_grants: i64,
    #[serde(default, deserialize_with = "itf::int")]
    num_execs: i64,
    #[serde(default, deserialize_with = "itf::map")]
    active_grants: Vec<(GrantDescriptor, RawPayload)>,
    #[serde(default, deserialize_with = "itf::set")]
    expired_grants: BTreeSet<GrantDescriptor>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    grant: GrantDescriptor,
    #[serde(default)]
    grant_payload: RawPayload,
    #[serde(default)]
    exec_message: RawExecMessage,
    #[serde(default)]
    exec_outcome: RawExecOutcome,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(default)]
    authorization_logic: String,
    #[serde(default, deserialize_with = "itf::int")]
    limit: i64,
    #[serde(default)]
    special_value: String,
    #[serde(default, deserialize_with = "itf::set")]
    allow_list: BTreeSet<String>,
    #[serde(default, deserialize_with = "itf::set")]
    deny_list: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExecMessage {
    #[serde(default)]
    message_type: String,
    #[serde(default, deserialize_with = "itf::int")]
    amount: i64,
    #[serde(default)]
    validator: String,
    #[serde(default)]
    new_validator: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawExecOutcome {
    #[serde(default)]
    accept: bool,
    #[serde(default)]
    delete: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    updated: RawPayload,
}

impl RawPayload {
    fn into_payload(self) -> AuthorizationPayload {
        match self.authorization_logic.as_str() {
            "generic" => AuthorizationPayload::Generic,
            "send" => AuthorizationPayload::Send { limit: self.limit },
            "stake" => AuthorizationPayload::Stake {
                allow_list: self.allow_list,
                deny_list: self.deny_list,
                limit: if self.special_value == UNLIMITED_SENTINEL {
                    StakeLimit::Unlimited
                } else {
                    StakeLimit::Finite(self.limit)
                },
            },
            _ => AuthorizationPayload::Unrecognized {
                logic: self.authorization_logic,
            },
        }
    }

    /// An empty logic means the model left the payload unset.
    fn into_optional_payload(self) -> Option<AuthorizationPayload> {
        if self.authorization_logic.is_empty() {
            None
        } else {
            Some(self.into_payload())
        }
    }
}

impl RawState {
    fn into_step(self, index: usize) -> Result<Step, ParseError> {
        let raw = self.action_taken;
        let action = match raw.action_type.as_str() {
            "" => Action::Init,
            Action::GIVE_GRANT => Action::GiveGrant {
                grant: raw.grant,
                payload: raw.grant_payload.into_payload(),
            },
            Action::REVOKE_GRANT => Action::RevokeGrant { grant: raw.grant },
            Action::EXPIRE_GRANT => Action::ExpireGrant { grant: raw.grant },
            Action::EXECUTE_GRANT => {
                let message = raw.exec_message;
                Action::ExecuteGrant {
                    grant: raw.grant,
                    payload: raw.grant_payload.into_payload(),
                    request: ExecRequest {
                        message_type: message.message_type,
                        amount: message.amount,
                        validator: message.validator,
                        new_validator: Some(message.new_validator).filter(|v| !v.is_empty()),
                    },
                    expected: ExecResult {
                        accept: raw.exec_outcome.accept,
                        delete: raw.exec_outcome.delete,
                        updated: raw.exec_outcome.updated.into_optional_payload(),
                        description: raw.exec_outcome.description,
                    },
                }
            }
            _ => Action::Unrecognized {
                tag: raw.action_type,
            },
        };

        let outcome = if self.outcome_status.is_empty() {
            None
        } else {
            match self.outcome_status.parse::<OutcomeLabel>() {
                Ok(label) => Some(label),
                Err(reason) if action.needs_label() => {
                    return Err(ParseError::InvalidState { index, reason });
                }
                Err(_) => {
                    tracing::debug!(
                        step = index,
                        action = action.tag(),
                        outcome = %self.outcome_status,
                        "ignoring unchecked outcome label"
                    );
                    None
                }
            }
        };

        let model = ModelState {
            active_grants: self
                .active_grants
                .into_iter()
                .map(|(grant, payload)| (grant, payload.into_payload()))
                .collect(),
            expired_grants: self.expired_grants,
        };

        Ok(Step {
            index,
            action,
            outcome,
            num_grants: self.num_grants,
            num_execs: self.num_execs,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "#meta": {"format": "ITF", "source": "authz.tla"},
        "vars": ["action_taken", "active_grants", "outcome_status"],
        "states": [
            {
                "#meta": {"index": 0},
                "action_taken": {"action_type": ""},
                "active_grants": {"#map": []},
                "expired_grants": {"#set": []},
                "num_execs": 0,
                "num_grants": 0,
                "outcome_status": ""
            },
            {
                "action_taken": {
                    "action_type": "give grant",
                    "grant": {"granter": "A", "grantee": "B", "sdk_message_type": "msg_delegate"},
                    "grant_payload": {
                        "authorization_logic": "stake",
                        "allow_list": {"#set": ["X", "Y"]},
                        "deny_list": {"#set": []},
                        "limit": {"#bigint": "0"},
                        "special_value": "inf"
                    }
                },
                "active_grants": {"#map": [[
                    {"granter": "A", "grantee": "B", "sdk_message_type": "msg_delegate"},
                    {"authorization_logic": "stake", "allow_list": {"#set": ["X", "Y"]},
                     "deny_list": {"#set": []}, "limit": 0, "special_value": "inf"}
                ]]},
                "num_grants": 1,
                "outcome_status": "grant_success"
            },
            {
                "action_taken": {
                    "action_type": "execute grant",
                    "grant": {"granter": "A", "grantee": "B", "sdk_message_type": "msg_send"},
                    "grant_payload": {"authorization_logic": "send", "limit": 100},
                    "exec_message": {"message_type": "msg_send", "amount": 30, "validator": "", "new_validator": ""},
                    "exec_outcome": {
                        "accept": true, "delete": false, "description": "spent",
                        "updated": {"authorization_logic": "send", "limit": 70}
                    }
                },
                "outcome_status": "successful_auth_exec"
            }
        ]
    }"##;

    #[test]
    fn parses_states_into_typed_steps() {
        let trace = Trace::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(trace.vars.len(), 3);
        assert_eq!(trace.meta["source"], "authz.tla");
        assert_eq!(trace.steps.len(), 3);

        assert_eq!(trace.steps[0].action, Action::Init);
        assert_eq!(trace.steps[0].outcome, None);

        match &trace.steps[1].action {
            Action::GiveGrant { grant, payload } => {
                assert_eq!(grant, &GrantDescriptor::new("A", "B", "msg_delegate"));
                match payload {
                    AuthorizationPayload::Stake {
                        allow_list,
                        deny_list,
                        limit,
                    } => {
                        assert_eq!(allow_list.len(), 2);
                        assert!(deny_list.is_empty());
                        assert_eq!(*limit, StakeLimit::Unlimited);
                    }
                    other => panic!("expected stake payload, got {:?}", other),
                }
            }
            other => panic!("expected give grant, got {:?}", other),
        }
        assert_eq!(trace.steps[1].outcome, Some(OutcomeLabel::GrantSuccess));
        assert_eq!(trace.steps[1].model.active_grants.len(), 1);
        assert_eq!(trace.steps[1].num_grants, 1);
    }

    #[test]
    fn exec_step_carries_request_and_prediction() {
        let trace = Trace::from_slice(SAMPLE.as_bytes()).unwrap();
        match &trace.steps[2].action {
            Action::ExecuteGrant {
                request, expected, ..
            } => {
                assert_eq!(request.amount, 30);
                assert_eq!(request.new_validator, None);
                assert!(expected.accept);
                assert!(!expected.delete);
                assert_eq!(
                    expected.updated,
                    Some(AuthorizationPayload::Send { limit: 70 })
                );
            }
            other => panic!("expected execute grant, got {:?}", other),
        }
    }

    #[test]
    fn unknown_action_tag_is_kept_for_the_dispatcher() {
        let json = r#"{"states": [{"action_taken": {"action_type": "burn grant"}}]}"#;
        let trace = Trace::from_slice(json.as_bytes()).unwrap();
        assert_eq!(
            trace.steps[0].action,
            Action::Unrecognized {
                tag: "burn grant".to_string()
            }
        );
    }

    #[test]
    fn unknown_label_on_checked_step_is_a_parse_error() {
        let json = r#"{"states": [{
            "action_taken": {"action_type": "revoke grant", "grant": {"granter": "A", "grantee": "B", "sdk_message_type": "msg_send"}},
            "outcome_status": "revoked_ok"
        }]}"#;
        match Trace::from_slice(json.as_bytes()) {
            Err(ParseError::InvalidState { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected InvalidState, got {:?}", other),
        }
    }

    #[test]
    fn unknown_label_on_expire_step_is_ignored() {
        let json = r#"{"states": [{
            "action_taken": {"action_type": "expire grant"},
            "outcome_status": "expire_success"
        }]}"#;
        let trace = Trace::from_slice(json.as_bytes()).unwrap();
        assert_eq!(trace.steps[0].outcome, None);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        match Trace::from_slice(b"{\"states\": [") {
            Err(ParseError::Json(_)) => {}
            other => panic!("expected Json error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        match Trace::load("/nonexistent/trace.itf.json") {
            Err(ParseError::Io { .. }) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn outcome_labels_round_trip_through_model_spelling() {
        for label in OutcomeLabel::ALL {
            assert_eq!(label.as_str().parse::<OutcomeLabel>(), Ok(label));
        }
        assert!(OutcomeLabel::InsufficientGrantExec.is_rejected_exec());
        assert!(!OutcomeLabel::GrantSpent.is_rejected_exec());
    }

    #[test]
    fn unknown_payload_logic_is_preserved() {
        let payload = RawPayload {
            authorization_logic: "vesting".to_string(),
            ..RawPayload::default()
        }
        .into_payload();
        assert_eq!(
            payload,
            AuthorizationPayload::Unrecognized {
                logic: "vesting".to_string()
            }
        );
    }
}
