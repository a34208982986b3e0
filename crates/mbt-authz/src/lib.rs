//! # mbt-authz
//!
//! Trace-driven conformance harness for authorization grants.
//!
//! A model checker explores the grant / revoke / expire / execute state
//! space and writes each execution path as a JSON trace. The harness
//! replays every step against a [`GrantStore`] and checks that the store's
//! observable behavior matches the outcome the model predicted. The first
//! divergence in a trace is reported as a [`ConformanceMismatch`] carrying
//! the step index, the compared field and both values.
//!
//! ## Key components
//!
//! - [`Trace`] — decoded trace file (set/map/bigint wrappers already unwrapped)
//! - [`AuthorizationBuilder`] — model payloads → concrete authorizations and messages
//! - [`ActionDispatcher`] — routes each step to its handler
//! - [`GrantStore`] — the system under test; [`MemoryGrantStore`] is the
//!   in-memory reference implementation
//! - [`Harness`] — discovers trace files and replays each in a fresh
//!   [`ReplayEnv`], producing a [`RunReport`]

pub mod authorization;
pub mod builder;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod handlers;
mod itf;
pub mod identity;
pub mod message;
pub mod oracle;
pub mod report;
pub mod runner;
pub mod store;
pub mod trace;

pub use authorization::{AcceptResponse, Authorization, StakeAuthorizationType, ValidatorScope};
pub use builder::AuthorizationBuilder;
pub use clock::SimClock;
pub use config::{FixtureConfig, HarnessConfig, UnknownActionPolicy};
pub use dispatcher::{ActionDispatcher, ReplaySummary, StepOutcome};
pub use env::{GrantRef, ReplayEnv, ReplaySettings};
pub use error::{
    AcceptError, BuildError, ConformanceMismatch, DriverError, ParseError, ResolutionError,
    StoreError,
};
pub use identity::{AccAddress, IdentityResolver, IdentityTable, ValAddress};
pub use message::{Coin, Message, MessageType};
pub use report::{RunReport, TraceReport, TraceStatus};
pub use runner::Harness;
pub use store::{Grant, GrantStore, MemoryGrantStore};
pub use trace::{
    Action, AuthorizationPayload, ExecRequest, ExecResult, GrantDescriptor, OutcomeLabel, Step,
    Trace,
};
