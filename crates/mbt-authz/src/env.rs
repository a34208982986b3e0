// env.rs — Per-trace replay environment.
//
// Everything a handler may read or mutate lives here: the identity table,
// the simulated clock and the store under test. A fresh environment is
// built for every trace file, so nothing carries over between traces.

use chrono::{DateTime, Duration, Utc};

use crate::authorization::Authorization;
use crate::builder::AuthorizationBuilder;
use crate::clock::SimClock;
use crate::config::HarnessConfig;
use crate::error::{BuildError, DriverError};
use crate::identity::{AccAddress, IdentityResolver, IdentityTable};
use crate::message::MessageType;
use crate::store::GrantStore;
use crate::trace::GrantDescriptor;

/// Replay settings taken from the harness configuration.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    pub denom: String,
    pub grant_ttl: Duration,
    pub clock_step: Duration,
    pub default_recipient: String,
    pub check_stored_payload: bool,
    pub verify_model_state: bool,
}

impl ReplaySettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            denom: config.denom.clone(),
            grant_ttl: config.grant_ttl(),
            clock_step: config.clock_step(),
            default_recipient: config.fixture.default_recipient.clone(),
            check_stored_payload: config.check_stored_payload,
            verify_model_state: config.verify_model_state,
        }
    }
}

/// A grant descriptor resolved to store coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRef {
    pub granter: AccAddress,
    pub grantee: AccAddress,
    pub msg_type_url: &'static str,
}

/// State of one trace replay.
pub struct ReplayEnv<S> {
    pub identities: IdentityTable,
    pub clock: SimClock,
    pub store: S,
    pub settings: ReplaySettings,
}

impl<S: GrantStore> ReplayEnv<S> {
    /// Provision identities from the fixture and start the clock at genesis.
    pub fn new(config: &HarnessConfig, store: S) -> Result<Self, DriverError> {
        Ok(Self {
            identities: IdentityTable::provision(&config.fixture)?,
            clock: SimClock::new(config.genesis_time),
            store,
            settings: ReplaySettings::from_config(config),
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn builder(&self) -> AuthorizationBuilder<'_, IdentityTable> {
        AuthorizationBuilder::new(&self.identities, &self.settings.denom)
    }

    pub fn default_recipient(&self) -> Result<AccAddress, BuildError> {
        Ok(self.identities.account(&self.settings.default_recipient)?)
    }

    /// Resolve a descriptor's parties and message type.
    pub fn grant_ref(&self, grant: &GrantDescriptor) -> Result<GrantRef, BuildError> {
        self.resolve(grant, &grant.message_type)
    }

    /// Resolve a descriptor's parties against an explicit model message type.
    pub fn resolve(
        &self,
        grant: &GrantDescriptor,
        message_type: &str,
    ) -> Result<GrantRef, BuildError> {
        Ok(GrantRef {
            granter: self.identities.account(&grant.granter)?,
            grantee: self.identities.account(&grant.grantee)?,
            msg_type_url: MessageType::from_model(message_type)?.type_url(),
        })
    }

    /// Re-read a grant from the store at the current simulated time.
    pub fn fetch(&self, key: &GrantRef) -> Option<Authorization> {
        self.store
            .get_authorization(&key.grantee, &key.granter, key.msg_type_url, self.now())
    }
}
