//! Per-action replay handlers.
//!
//! Each handler applies one action to the environment and checks the
//! observed effect against the step's expected outcome. Build and store
//! failures are observations here: they only surface as a
//! [`ConformanceMismatch`](crate::error::ConformanceMismatch) when the
//! model predicted otherwise.

pub mod execute;
pub mod expire;
pub mod give;
pub mod revoke;
