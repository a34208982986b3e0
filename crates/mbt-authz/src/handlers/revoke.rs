// revoke.rs — Replay of "revoke grant".

use crate::env::ReplayEnv;
use crate::error::ConformanceMismatch;
use crate::oracle::Oracle;
use crate::store::GrantStore;
use crate::trace::{GrantDescriptor, OutcomeLabel};

/// Delete `grant` and check the model's verdict.
///
/// A failed delete must leave the grant exactly as it was.
pub fn apply<S: GrantStore>(
    env: &mut ReplayEnv<S>,
    oracle: &Oracle<'_>,
    grant: &GrantDescriptor,
    expected: Option<OutcomeLabel>,
) -> Result<(), ConformanceMismatch> {
    let key = match env.grant_ref(grant) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(step = oracle.step(), grant = %grant, error = %e, "revoke target not resolvable");
            return oracle.ensure_label(expected, OutcomeLabel::RevokeFailed);
        }
    };

    let before = env.fetch(&key);
    let deleted = env
        .store
        .delete_grant(&key.grantee, &key.granter, key.msg_type_url);
    let after = env.fetch(&key);

    match deleted {
        Ok(()) => {
            oracle.ensure_label(expected, OutcomeLabel::RevokeSuccess)?;
            oracle.ensure_eq("authorization_after_revoke", &None, &after)
        }
        Err(e) => {
            tracing::debug!(step = oracle.step(), grant = %grant, error = %e, "revoke refused");
            oracle.ensure_label(expected, OutcomeLabel::RevokeFailed)?;
            oracle.ensure_eq("authorization_after_revoke", &before, &after)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::give;
    use crate::handlers::testing::{env, grant, send};

    #[test]
    fn revoke_existing_grant() {
        let mut env = env();
        let g = grant("A", "B", "msg_send");
        give::apply(
            &mut env,
            &Oracle::new(1, "give grant"),
            &g,
            &send(10),
            Some(OutcomeLabel::GrantSuccess),
        )
        .unwrap();
        apply(
            &mut env,
            &Oracle::new(2, "revoke grant"),
            &g,
            Some(OutcomeLabel::RevokeSuccess),
        )
        .unwrap();
        assert!(env.store.is_empty());
    }

    #[test]
    fn revoke_absent_grant_is_deterministic() {
        let mut env = env();
        let g = grant("A", "B", "msg_send");
        let oracle = Oracle::new(1, "revoke grant");
        for _ in 0..3 {
            apply(&mut env, &oracle, &g, Some(OutcomeLabel::RevokeFailed)).unwrap();
        }
        let err = apply(&mut env, &oracle, &g, Some(OutcomeLabel::RevokeSuccess)).unwrap_err();
        assert_eq!(err.expected, "revoke_success");
        assert_eq!(err.actual, "revoke_failed");
    }

    #[test]
    fn unknown_message_type_cannot_be_revoked() {
        let mut env = env();
        let g = grant("A", "B", "msg_mint");
        apply(
            &mut env,
            &Oracle::new(1, "revoke grant"),
            &g,
            Some(OutcomeLabel::RevokeFailed),
        )
        .unwrap();
    }
}
