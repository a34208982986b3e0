// dispatcher.rs — Routes each trace step to its handler.
//
// The dispatcher holds no replay state of its own; everything mutable is in
// the `ReplayEnv` passed to each call. Steps are applied strictly in trace
// order and the first error ends the replay.

use crate::config::UnknownActionPolicy;
use crate::env::ReplayEnv;
use crate::error::DriverError;
use crate::handlers::execute::ExecStep;
use crate::handlers::{execute, expire, give, revoke};
use crate::oracle::Oracle;
use crate::store::GrantStore;
use crate::trace::{Action, Step, Trace};

/// What happened to a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step was applied and every check passed.
    Applied,
    /// The step was not applied (unknown action under the ignore policy).
    Skipped,
}

/// Totals for one replayed trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionDispatcher {
    on_unknown: UnknownActionPolicy,
}

impl ActionDispatcher {
    pub fn new(on_unknown: UnknownActionPolicy) -> Self {
        Self { on_unknown }
    }

    /// Apply one step.
    pub fn dispatch<S: GrantStore>(
        &self,
        env: &mut ReplayEnv<S>,
        step: &Step,
    ) -> Result<StepOutcome, DriverError> {
        let oracle = Oracle::for_step(step);
        match &step.action {
            Action::Init => {}
            Action::GiveGrant { grant, payload } => {
                give::apply(env, &oracle, grant, payload, step.outcome)?
            }
            Action::RevokeGrant { grant } => revoke::apply(env, &oracle, grant, step.outcome)?,
            Action::ExpireGrant { grant } => expire::apply(env, &oracle, grant)?,
            Action::ExecuteGrant {
                grant,
                payload,
                request,
                expected,
            } => execute::apply(
                env,
                &oracle,
                ExecStep {
                    grant,
                    payload,
                    request,
                    predicted: expected,
                    expected: step.outcome,
                },
            )?,
            Action::Unrecognized { tag } => {
                return match self.on_unknown {
                    UnknownActionPolicy::Fail => Err(DriverError::UnrecognizedAction {
                        step: step.index,
                        tag: tag.clone(),
                    }),
                    UnknownActionPolicy::Ignore => {
                        tracing::warn!(step = step.index, action = %tag, "skipping unrecognized action");
                        Ok(StepOutcome::Skipped)
                    }
                };
            }
        }

        if env.settings.verify_model_state {
            oracle.verify_model_state(env, step)?;
        }
        Ok(StepOutcome::Applied)
    }

    /// Apply every step of `trace` in order.
    pub fn replay<S: GrantStore>(
        &self,
        env: &mut ReplayEnv<S>,
        trace: &Trace,
    ) -> Result<ReplaySummary, DriverError> {
        let mut summary = ReplaySummary::default();
        self.replay_into(env, trace, &mut summary)?;
        Ok(summary)
    }

    /// Like [`replay`](Self::replay), but `summary` keeps the counts reached
    /// when the replay stops early.
    pub fn replay_into<S: GrantStore>(
        &self,
        env: &mut ReplayEnv<S>,
        trace: &Trace,
        summary: &mut ReplaySummary,
    ) -> Result<(), DriverError> {
        for step in &trace.steps {
            tracing::debug!(
                step = step.index,
                action = step.action.tag(),
                grant = ?step.action.grant().map(|g| g.to_string()),
                outcome = step.outcome.map(|o| o.as_str()).unwrap_or(""),
                num_grants = step.num_grants,
                num_execs = step.num_execs,
                "applying step"
            );
            match self.dispatch(env, step)? {
                StepOutcome::Applied => summary.applied += 1,
                StepOutcome::Skipped => summary.skipped += 1,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::store::MemoryGrantStore;
    use crate::trace::{GrantDescriptor, ModelState, OutcomeLabel};

    fn step(index: usize, action: Action, outcome: Option<OutcomeLabel>) -> Step {
        Step {
            index,
            action,
            outcome,
            num_grants: 0,
            num_execs: 0,
            model: ModelState::default(),
        }
    }

    fn env(config: &HarnessConfig) -> ReplayEnv<MemoryGrantStore> {
        ReplayEnv::new(config, MemoryGrantStore::new()).unwrap()
    }

    #[test]
    fn init_is_a_no_op() {
        let config = HarnessConfig::default();
        let mut env = env(&config);
        let outcome = ActionDispatcher::default()
            .dispatch(&mut env, &step(0, Action::Init, None))
            .unwrap();
        assert_eq!(outcome, StepOutcome::Applied);
        assert!(env.store.is_empty());
    }

    #[test]
    fn unknown_action_is_fatal_by_default() {
        let config = HarnessConfig::default();
        let mut env = env(&config);
        let unknown = step(
            5,
            Action::Unrecognized {
                tag: "burn grant".to_string(),
            },
            None,
        );
        match ActionDispatcher::default().dispatch(&mut env, &unknown) {
            Err(e @ DriverError::UnrecognizedAction { .. }) => {
                assert!(e.is_fatal());
                assert_eq!(e.to_string(), "step 5: unrecognized action 'burn grant'");
            }
            other => panic!("expected UnrecognizedAction, got {:?}", other),
        }

        let ignoring = ActionDispatcher::new(UnknownActionPolicy::Ignore);
        assert_eq!(
            ignoring.dispatch(&mut env, &unknown).unwrap(),
            StepOutcome::Skipped
        );
    }

    #[test]
    fn replay_stops_at_first_mismatch() {
        let config = HarnessConfig::default();
        let mut env = env(&config);
        let grant = GrantDescriptor::new("A", "B", "msg_send");
        let trace = Trace {
            meta: serde_json::Value::Null,
            vars: Vec::new(),
            steps: vec![
                step(0, Action::Init, None),
                step(
                    1,
                    Action::RevokeGrant {
                        grant: grant.clone(),
                    },
                    Some(OutcomeLabel::RevokeSuccess),
                ),
                step(
                    2,
                    Action::GiveGrant {
                        grant,
                        payload: crate::trace::AuthorizationPayload::Send { limit: 5 },
                    },
                    Some(OutcomeLabel::GrantSuccess),
                ),
            ],
        };
        match ActionDispatcher::default().replay(&mut env, &trace) {
            Err(DriverError::Mismatch(m)) => assert_eq!(m.step, 1),
            other => panic!("expected mismatch at step 1, got {:?}", other),
        }
        // Step 2 never ran.
        assert!(env.store.is_empty());
    }

    #[test]
    fn model_state_verification_catches_missing_grant() {
        let config = HarnessConfig {
            verify_model_state: true,
            ..HarnessConfig::default()
        };
        let mut env = env(&config);
        let grant = GrantDescriptor::new("A", "B", "msg_send");
        let mut init = step(0, Action::Init, None);
        init.model.active_grants = vec![(
            grant,
            crate::trace::AuthorizationPayload::Send { limit: 5 },
        )];
        match ActionDispatcher::default().dispatch(&mut env, &init) {
            Err(DriverError::Mismatch(m)) => assert_eq!(m.field, "model_state"),
            other => panic!("expected model_state mismatch, got {:?}", other),
        }
    }
}
