// expire.rs — Replay of "expire grant".
//
// Time passes for one grant: it is re-saved with an expiration equal to the
// current simulated time, then the shared clock moves on by `clock_step`.
// Only the targeted grant falls behind the clock; grants given later still
// get a full lifetime. The step carries no checked outcome label.

use crate::env::ReplayEnv;
use crate::error::ConformanceMismatch;
use crate::oracle::Oracle;
use crate::store::GrantStore;
use crate::trace::GrantDescriptor;

pub fn apply<S: GrantStore>(
    env: &mut ReplayEnv<S>,
    oracle: &Oracle<'_>,
    grant: &GrantDescriptor,
) -> Result<(), ConformanceMismatch> {
    let key = env
        .grant_ref(grant)
        .map_err(|e| oracle.mismatch("grant", grant.to_string(), e.to_string()))?;
    let authorization = env
        .fetch(&key)
        .ok_or_else(|| oracle.mismatch("grant", format!("{} present", grant), "absent"))?;

    let now = env.now();
    env.store
        .save_grant(&key.grantee, &key.granter, authorization, now)
        .map_err(|e| oracle.mismatch("save_grant", "ok", e.to_string()))?;
    env.clock.advance(env.settings.clock_step);

    tracing::debug!(
        step = oracle.step(),
        grant = %grant,
        expired_at = %now,
        now = %env.now(),
        "grant expired"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::handlers::give;
    use crate::handlers::testing::{env, grant, send};
    use crate::store::MemoryGrantStore;
    use crate::trace::OutcomeLabel;

    #[test]
    fn expired_grant_is_no_longer_fetchable() {
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
        let start = env.now();
        apply(&mut env, &Oracle::new(2, "expire grant"), &g).unwrap();

        assert_eq!(env.now(), start + env.settings.clock_step);
        let key = env.grant_ref(&g).unwrap();
        assert!(env.fetch(&key).is_none());
        // The grant is still stored, just behind the clock.
        assert_eq!(env.store.len(), 1);
    }

    #[test]
    fn zero_clock_step_still_expires() {
        let config = HarnessConfig {
            clock_step_secs: 0,
            ..HarnessConfig::default()
        };
        let mut env = ReplayEnv::new(&config, MemoryGrantStore::new()).unwrap();
        let g = grant("A", "B", "msg_send");
        give::apply(
            &mut env,
            &Oracle::new(1, "give grant"),
            &g,
            &send(10),
            Some(OutcomeLabel::GrantSuccess),
        )
        .unwrap();
        apply(&mut env, &Oracle::new(2, "expire grant"), &g).unwrap();

        let key = env.grant_ref(&g).unwrap();
        assert!(env.fetch(&key).is_none());
    }

    #[test]
    fn other_grants_survive_the_clock_step() {
        let mut env = env();
        let expired = grant("A", "B", "msg_send");
        let kept = grant("A", "C", "msg_send");
        for (i, g) in [&expired, &kept].into_iter().enumerate() {
            give::apply(
                &mut env,
                &Oracle::new(i + 1, "give grant"),
                g,
                &send(10),
                Some(OutcomeLabel::GrantSuccess),
            )
            .unwrap();
        }
        apply(&mut env, &Oracle::new(3, "expire grant"), &expired).unwrap();
        let key = env.grant_ref(&kept).unwrap();
        assert!(env.fetch(&key).is_some());
    }

    #[test]
    fn expiring_absent_grant_is_a_mismatch() {
        let mut env = env();
        let err = apply(
            &mut env,
            &Oracle::new(4, "expire grant"),
            &grant("A", "B", "msg_send"),
        )
        .unwrap_err();
        assert_eq!(err.step, 4);
        assert_eq!(err.field, "grant");
        assert_eq!(err.actual, "absent");
    }
}
