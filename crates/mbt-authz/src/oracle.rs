// oracle.rs — Comparisons between observed effects and the model's prediction.
//
// Every check a handler makes goes through an `Oracle` bound to the current
// step, so a failed comparison always comes back as a `ConformanceMismatch`
// naming the step index, the action and the compared field.

use std::fmt::Debug;

use crate::env::ReplayEnv;
use crate::error::ConformanceMismatch;
use crate::store::GrantStore;
use crate::trace::{OutcomeLabel, Step};

/// Rendering of a missing outcome label.
const NO_LABEL: &str = "<none>";

/// Checks for one step.
#[derive(Debug, Clone, Copy)]
pub struct Oracle<'a> {
    step: usize,
    action: &'a str,
}

impl<'a> Oracle<'a> {
    pub fn new(step: usize, action: &'a str) -> Self {
        Self { step, action }
    }

    pub fn for_step(step: &'a Step) -> Self {
        Self::new(step.index, step.action.tag())
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn mismatch(
        &self,
        field: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> ConformanceMismatch {
        ConformanceMismatch {
            step: self.step,
            action: self.action.to_string(),
            field: field.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Structural equality, rendered with `Debug` on failure.
    pub fn ensure_eq<T: PartialEq + Debug>(
        &self,
        field: &str,
        expected: &T,
        actual: &T,
    ) -> Result<(), ConformanceMismatch> {
        if expected == actual {
            Ok(())
        } else {
            Err(self.mismatch(field, format!("{:?}", expected), format!("{:?}", actual)))
        }
    }

    /// The model's label must be exactly the observed one.
    pub fn ensure_label(
        &self,
        expected: Option<OutcomeLabel>,
        observed: OutcomeLabel,
    ) -> Result<(), ConformanceMismatch> {
        if expected == Some(observed) {
            Ok(())
        } else {
            Err(self.mismatch("outcome", label_str(expected), observed.as_str()))
        }
    }

    /// The model's label must be one of `allowed`; `observed` describes
    /// what the store did.
    pub fn ensure_label_in(
        &self,
        expected: Option<OutcomeLabel>,
        allowed: &[OutcomeLabel],
        observed: &str,
    ) -> Result<(), ConformanceMismatch> {
        match expected {
            Some(label) if allowed.contains(&label) => Ok(()),
            _ => Err(self.mismatch("outcome", label_str(expected), observed)),
        }
    }

    /// Compare the store against the model's grant bookkeeping after a step.
    ///
    /// Grants the model lists as active (and not expired) must be
    /// fetchable; grants it lists as expired (and not active) must not be.
    pub fn verify_model_state<S: GrantStore>(
        &self,
        env: &ReplayEnv<S>,
        step: &Step,
    ) -> Result<(), ConformanceMismatch> {
        let model = &step.model;
        for (grant, _) in &model.active_grants {
            if model.expired_grants.contains(grant) {
                continue;
            }
            let key = env
                .grant_ref(grant)
                .map_err(|e| self.mismatch("model_state", grant.to_string(), e.to_string()))?;
            if env.fetch(&key).is_none() {
                return Err(self.mismatch(
                    "model_state",
                    format!("active grant {}", grant),
                    "absent",
                ));
            }
        }
        for grant in &model.expired_grants {
            if model.active_grants.iter().any(|(active, _)| active == grant) {
                continue;
            }
            let key = env
                .grant_ref(grant)
                .map_err(|e| self.mismatch("model_state", grant.to_string(), e.to_string()))?;
            if env.fetch(&key).is_some() {
                return Err(self.mismatch(
                    "model_state",
                    format!("expired grant {} absent", grant),
                    "present",
                ));
            }
        }
        Ok(())
    }
}

pub fn label_str(label: Option<OutcomeLabel>) -> &'static str {
    label.map(|l| l.as_str()).unwrap_or(NO_LABEL)
}
