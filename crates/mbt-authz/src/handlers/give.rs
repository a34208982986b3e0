// give.rs — Replay of "give grant".

use crate::env::ReplayEnv;
use crate::error::ConformanceMismatch;
use crate::oracle::Oracle;
use crate::store::GrantStore;
use crate::trace::{AuthorizationPayload, GrantDescriptor, OutcomeLabel};

/// Give `grant` with `payload` and check the model's verdict.
///
/// Self-grants are invalid before the store is ever consulted. Otherwise
/// the grant is built, checked, saved with `now + grant_ttl`, and then
/// re-fetched: presence must line up with `GrantSuccess`.
pub fn apply<S: GrantStore>(
    env: &mut ReplayEnv<S>,
    oracle: &Oracle<'_>,
    grant: &GrantDescriptor,
    payload: &AuthorizationPayload,
    expected: Option<OutcomeLabel>,
) -> Result<(), ConformanceMismatch> {
    if grant.is_self_grant() {
        tracing::debug!(step = oracle.step(), grant = %grant, "self-grant rejected");
        return oracle.ensure_label(expected, OutcomeLabel::GrantFailed);
    }

    let built = env.grant_ref(grant).and_then(|key| {
        let authorization = env.builder().build(payload, &grant.message_type)?;
        Ok((key, authorization))
    });
    let (key, authorization) = match built {
        Ok(built) => built,
        Err(e) => {
            tracing::debug!(step = oracle.step(), grant = %grant, error = %e, "grant not buildable");
            return oracle.ensure_label(expected, OutcomeLabel::GrantFailed);
        }
    };
    if let Err(e) = authorization.validate_basic() {
        tracing::debug!(step = oracle.step(), grant = %grant, error = %e, "grant failed validation");
        return oracle.ensure_label(expected, OutcomeLabel::GrantFailed);
    }

    let expiration = env.now() + env.settings.grant_ttl;
    if let Err(e) = env
        .store
        .save_grant(&key.grantee, &key.granter, authorization.clone(), expiration)
    {
        tracing::debug!(step = oracle.step(), grant = %grant, error = %e, "store refused grant");
        return oracle.ensure_label(expected, OutcomeLabel::GrantFailed);
    }

    match env.fetch(&key) {
        Some(stored) => {
            oracle.ensure_label(expected, OutcomeLabel::GrantSuccess)?;
            oracle.ensure_eq("stored_authorization", &authorization, &stored)
        }
        None => oracle.ensure_label(expected, OutcomeLabel::GrantFailed),
    }
}
