// execute.rs — Replay of "execute grant".
//
// The grantee executes one message on the granter's behalf. The grant is
// fetched by the message's type, the message is rebuilt from the request,
// and the store's decision is compared against the model's prediction:
// the accept/delete flags, the updated authorization, and what a re-fetch
// returns afterwards.

use crate::authorization::{AcceptResponse, Authorization};
use crate::env::{GrantRef, ReplayEnv};
use crate::error::{ConformanceMismatch, StoreError};
use crate::oracle::{label_str, Oracle};
use crate::store::GrantStore;
use crate::trace::{AuthorizationPayload, ExecRequest, ExecResult, GrantDescriptor, OutcomeLabel};

/// Labels that mean "there was nothing to execute against".
const ABSENT_LABELS: [OutcomeLabel; 2] = [
    OutcomeLabel::NonexistentGrantExec,
    OutcomeLabel::ExpiredAuthExec,
];

/// Everything an exec step carries.
#[derive(Debug, Clone, Copy)]
pub struct ExecStep<'a> {
    pub grant: &'a GrantDescriptor,
    pub payload: &'a AuthorizationPayload,
    pub request: &'a ExecRequest,
    pub predicted: &'a ExecResult,
    pub expected: Option<OutcomeLabel>,
}

pub fn apply<S: GrantStore>(
    env: &mut ReplayEnv<S>,
    oracle: &Oracle<'_>,
    exec: ExecStep<'_>,
) -> Result<(), ConformanceMismatch> {
    let expected = exec.expected;

    // An unresolvable request has no grant to find.
    let key = match env.resolve(exec.grant, &exec.request.message_type) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(step = oracle.step(), error = %e, "exec target not resolvable");
            return oracle.ensure_label_in(expected, &ABSENT_LABELS, "absent");
        }
    };
    let stored = match env.fetch(&key) {
        Some(stored) => stored,
        None => return oracle.ensure_label_in(expected, &ABSENT_LABELS, "absent"),
    };
    if let Some(label) = expected.filter(|l| ABSENT_LABELS.contains(l)) {
        return Err(oracle.mismatch("outcome", label.as_str(), "grant present"));
    }

    if env.settings.check_stored_payload {
        let from_payload = env
            .builder()
            .build(exec.payload, &exec.grant.message_type)
            .map_err(|e| oracle.mismatch("grant_payload", format!("{:?}", stored), e.to_string()))?;
        oracle.ensure_eq("stored_authorization", &from_payload, &stored)?;
    }

    let message = env.default_recipient().and_then(|recipient| {
        env.builder()
            .build_message(exec.request, &key.granter, &recipient)
    });
    let message = match message {
        Ok(message) => message,
        Err(e) if matches!(expected, Some(l) if l.is_rejected_exec()) => {
            tracing::debug!(step = oracle.step(), error = %e, "exec message not buildable");
            return Ok(());
        }
        Err(e) => {
            return Err(oracle.mismatch(
                "outcome",
                label_str(expected),
                format!("message not buildable: {}", e),
            ))
        }
    };

    let now = env.now();
    let result = env
        .store
        .dispatch(&key.grantee, std::slice::from_ref(&message), now)
        .and_then(single_response);
    tracing::debug!(
        step = oracle.step(),
        msg_type_url = key.msg_type_url,
        result = ?result,
        "exec dispatched"
    );

    match (expected, result) {
        (Some(OutcomeLabel::SuccessfulAuthExec), Ok(response)) => {
            check_flags(oracle, exec.predicted, &response)?;
            let predicted_update = if matches!(exec.payload, AuthorizationPayload::Generic) {
                None
            } else {
                exec.predicted
                    .updated
                    .as_ref()
                    .map(|payload| env.builder().build(payload, &exec.grant.message_type))
                    .transpose()
                    .map_err(|e| oracle.mismatch("updated", "buildable payload", e.to_string()))?
            };
            oracle.ensure_eq("updated", &predicted_update, &response.updated)?;
            let remaining = if response.delete {
                None
            } else {
                Some(response.updated.unwrap_or(stored))
            };
            check_after(env, oracle, &key, &remaining)
        }
        (Some(OutcomeLabel::GrantSpent), Ok(response)) => {
            check_flags(oracle, exec.predicted, &response)?;
            oracle.ensure_eq("updated", &None, &response.updated)?;
            check_after(env, oracle, &key, &None)
        }
        (Some(label), Err(e)) if label.is_rejected_exec() => {
            tracing::debug!(step = oracle.step(), error = %e, "exec rejected as predicted");
            check_after(env, oracle, &key, &Some(stored))
        }
        (expected, Ok(response)) => {
            let observed = if response.delete {
                OutcomeLabel::GrantSpent
            } else {
                OutcomeLabel::SuccessfulAuthExec
            };
            Err(oracle.mismatch("outcome", label_str(expected), observed.as_str()))
        }
        (expected, Err(e)) => Err(oracle.mismatch(
            "outcome",
            label_str(expected),
            format!("rejected: {}", e),
        )),
    }
}

fn single_response(responses: Vec<AcceptResponse>) -> Result<AcceptResponse, StoreError> {
    responses.into_iter().next().ok_or_else(|| {
        StoreError::InvalidAuthorization("dispatch returned no response".to_string())
    })
}

fn check_flags(
    oracle: &Oracle<'_>,
    predicted: &ExecResult,
    response: &AcceptResponse,
) -> Result<(), ConformanceMismatch> {
    oracle.ensure_eq("accept", &predicted.accept, &response.accept)?;
    oracle.ensure_eq("delete", &predicted.delete, &response.delete)
}

fn check_after<S: GrantStore>(
    env: &ReplayEnv<S>,
    oracle: &Oracle<'_>,
    key: &GrantRef,
    expected: &Option<Authorization>,
) -> Result<(), ConformanceMismatch> {
    oracle.ensure_eq("authorization_after_exec", expected, &env.fetch(key))
}
