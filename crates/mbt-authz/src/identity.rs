// identity.rs — Symbolic names → concrete addresses.
//
// The model talks about accounts "A", "B", "C" and validators "X", "Y",
// "Z". An `IdentityTable` maps those names to addresses for one trace run.
// It is built fresh per trace from the fixture configuration and passed
// to every handler through the replay environment; there is no global
// name table.
//
// Addresses are derived deterministically from the name (SHA-256 of a
// role-prefixed name), so the same trace replays against the same
// addresses every time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::FixtureConfig;
use crate::error::{DriverError, ResolutionError};

const ACCOUNT_PREFIX: &str = "cosmos";
const VALIDATOR_PREFIX: &str = "cosmosvaloper";

/// Hex characters kept from the digest (20 bytes, like an SDK address).
const ADDRESS_HEX_LEN: usize = 40;

/// Address of an account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccAddress(String);

/// Address of a validator operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValAddress(String);

impl AccAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ValAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn derive_address(prefix: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}1{}", prefix, &digest[..ADDRESS_HEX_LEN])
}

/// Resolves the model's symbolic names.
pub trait IdentityResolver {
    fn account(&self, name: &str) -> Result<AccAddress, ResolutionError>;
    fn validator(&self, name: &str) -> Result<ValAddress, ResolutionError>;
}

/// The name tables for one trace run.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    accounts: BTreeMap<String, AccAddress>,
    validators: BTreeMap<String, ValAddress>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision every account and validator named by the fixture.
    ///
    /// Fails if a name is declared twice or if the default recipient is not
    /// one of the accounts.
    pub fn provision(fixture: &FixtureConfig) -> Result<Self, DriverError> {
        let mut table = Self::new();
        for name in &fixture.accounts {
            if table.accounts.contains_key(name) {
                return Err(DriverError::Setup(format!(
                    "account '{}' declared twice",
                    name
                )));
            }
            table.add_account(name);
        }
        for name in &fixture.validators {
            if table.validators.contains_key(name) {
                return Err(DriverError::Setup(format!(
                    "validator '{}' declared twice",
                    name
                )));
            }
            table.add_validator(name);
        }
        if !table.accounts.contains_key(&fixture.default_recipient) {
            return Err(DriverError::Setup(format!(
                "default recipient '{}' is not a fixture account",
                fixture.default_recipient
            )));
        }
        tracing::debug!(
            accounts = table.accounts.len(),
            validators = table.validators.len(),
            "identity table provisioned"
        );
        Ok(table)
    }

    /// Register an account and return its address.
    pub fn add_account(&mut self, name: &str) -> AccAddress {
        let address = AccAddress(derive_address(ACCOUNT_PREFIX, name));
        self.accounts.insert(name.to_string(), address.clone());
        address
    }

    /// Register a validator and return its address.
    pub fn add_validator(&mut self, name: &str) -> ValAddress {
        let address = ValAddress(derive_address(VALIDATOR_PREFIX, name));
        self.validators.insert(name.to_string(), address.clone());
        address
    }
}

impl IdentityResolver for IdentityTable {
    fn account(&self, name: &str) -> Result<AccAddress, ResolutionError> {
        self.accounts
            .get(name)
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownAccount(name.to_string()))
    }

    fn validator(&self, name: &str) -> Result<ValAddress, ResolutionError> {
        self.validators
            .get(name)
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownValidator(name.to_string()))
    }
}
