// store.rs — The grant store interface and an in-memory reference store.
//
// `GrantStore` is the seam between the harness and the system under test.
// The harness only ever talks to grants through it and never caches what
// it reads: every check re-fetches.
//
// `MemoryGrantStore` is the reference implementation replayed against by
// default. Grants are keyed by (granter, grantee, message type URL), where
// the URL comes from the authorization itself, not from the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::authorization::{AcceptResponse, Authorization};
use crate::error::StoreError;
use crate::identity::AccAddress;
use crate::message::Message;

/// Grant persistence and execution, as seen by the harness.
pub trait GrantStore {
    /// Store `authorization` for (granter, grantee), replacing any existing
    /// grant for the same message type.
    fn save_grant(
        &mut self,
        grantee: &AccAddress,
        granter: &AccAddress,
        authorization: Authorization,
        expiration: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Remove a grant. Fails if there is none.
    fn delete_grant(
        &mut self,
        grantee: &AccAddress,
        granter: &AccAddress,
        msg_type_url: &str,
    ) -> Result<(), StoreError>;

    /// The live authorization for a key, or `None` if missing or expired
    /// at `now`.
    fn get_authorization(
        &self,
        grantee: &AccAddress,
        granter: &AccAddress,
        msg_type_url: &str,
        now: DateTime<Utc>,
    ) -> Option<Authorization>;

    /// Execute `msgs` as `grantee`. Each message's signer is its granter.
    /// Either every message is accepted and its effect committed, or an
    /// error is returned and nothing changes.
    fn dispatch(
        &mut self,
        grantee: &AccAddress,
        msgs: &[Message],
        now: DateTime<Utc>,
    ) -> Result<Vec<AcceptResponse>, StoreError>;
}

/// A stored grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub authorization: Authorization,
    pub expiration: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GrantKey {
    granter: AccAddress,
    grantee: AccAddress,
    msg_type_url: String,
}

impl GrantKey {
    fn new(granter: &AccAddress, grantee: &AccAddress, msg_type_url: &str) -> Self {
        Self {
            granter: granter.clone(),
            grantee: grantee.clone(),
            msg_type_url: msg_type_url.to_string(),
        }
    }

    fn not_found(&self) -> StoreError {
        StoreError::NotFound {
            granter: self.granter.to_string(),
            grantee: self.grantee.to_string(),
            msg_type_url: self.msg_type_url.clone(),
        }
    }

    fn expired(&self) -> StoreError {
        StoreError::Expired {
            granter: self.granter.to_string(),
            grantee: self.grantee.to_string(),
            msg_type_url: self.msg_type_url.clone(),
        }
    }
}

/// In-memory reference grant store.
#[derive(Debug, Clone, Default)]
pub struct MemoryGrantStore {
    grants: BTreeMap<GrantKey, Grant>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored grants, expired ones included.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// The stored grant for a key, ignoring expiration.
    pub fn grant(
        &self,
        grantee: &AccAddress,
        granter: &AccAddress,
        msg_type_url: &str,
    ) -> Option<&Grant> {
        self.grants
            .get(&GrantKey::new(granter, grantee, msg_type_url))
    }
}

impl GrantStore for MemoryGrantStore {
    fn save_grant(
        &mut self,
        grantee: &AccAddress,
        granter: &AccAddress,
        authorization: Authorization,
        expiration: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let msg_type = authorization.message_type().ok_or_else(|| {
            StoreError::InvalidAuthorization(format!(
                "{:?} authorization has no message type",
                authorization.logic()
            ))
        })?;
        let key = GrantKey::new(granter, grantee, msg_type.type_url());
        tracing::debug!(
            granter = %granter,
            grantee = %grantee,
            msg_type_url = %key.msg_type_url,
            expiration = %expiration,
            "saving grant"
        );
        self.grants.insert(
            key,
            Grant {
                authorization,
                expiration,
            },
        );
        Ok(())
    }

    fn delete_grant(
        &mut self,
        grantee: &AccAddress,
        granter: &AccAddress,
        msg_type_url: &str,
    ) -> Result<(), StoreError> {
        let key = GrantKey::new(granter, grantee, msg_type_url);
        match self.grants.remove(&key) {
            Some(_) => Ok(()),
            None => Err(key.not_found()),
        }
    }

    fn get_authorization(
        &self,
        grantee: &AccAddress,
        granter: &AccAddress,
        msg_type_url: &str,
        now: DateTime<Utc>,
    ) -> Option<Authorization> {
        self.grant(grantee, granter, msg_type_url)
            .filter(|grant| grant.expiration >= now)
            .map(|grant| grant.authorization.clone())
    }

    fn dispatch(
        &mut self,
        grantee: &AccAddress,
        msgs: &[Message],
        now: DateTime<Utc>,
    ) -> Result<Vec<AcceptResponse>, StoreError> {
        // Work on a copy so a failure part-way through commits nothing.
        let mut staged = self.grants.clone();
        let mut responses = Vec::with_capacity(msgs.len());

        for msg in msgs {
            let granter = msg.signer();
            if granter == grantee {
                // Acting on one's own behalf needs no grant.
                responses.push(AcceptResponse {
                    accept: true,
                    delete: false,
                    updated: None,
                });
                continue;
            }

            let key = GrantKey::new(granter, grantee, msg.type_url());
            let (response, expiration) = {
                let grant = staged.get(&key).ok_or_else(|| key.not_found())?;
                if grant.expiration < now {
                    return Err(key.expired());
                }
                (grant.authorization.accept(msg)?, grant.expiration)
            };

            if response.delete {
                staged.remove(&key);
            } else if let Some(updated) = &response.updated {
                staged.insert(
                    key,
                    Grant {
                        authorization: updated.clone(),
                        expiration,
                    },
                );
            }
            responses.push(response);
        }

        self.grants = staged;
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixtureConfig;
    use crate::error::AcceptError;
    use crate::identity::{IdentityResolver, IdentityTable};
    use crate::message::{Coin, MessageType};
    use chrono::Duration;

    struct Fixture {
        ids: IdentityTable,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ids: IdentityTable::provision(&FixtureConfig::default()).unwrap(),
                now: Utc::now(),
            }
        }

        fn acc(&self, name: &str) -> AccAddress {
            self.ids.account(name).unwrap()
        }

        fn send(&self, from: &str, amount: u64) -> Message {
            Message::Send {
                from: self.acc(from),
                to: self.acc("default_recipient"),
                amount: Coin::new("stake", amount),
            }
        }
    }

    fn send_limit(amount: u64) -> Authorization {
        Authorization::Send {
            spend_limit: Coin::new("stake", amount),
        }
    }

    const SEND_URL: &str = "/cosmos.bank.v1beta1.MsgSend";

    #[test]
    fn save_keys_by_authorization_message_type() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        store
            .save_grant(&f.acc("B"), &f.acc("A"), send_limit(10), f.now + Duration::hours(1))
            .unwrap();
        assert_eq!(
            store.get_authorization(&f.acc("B"), &f.acc("A"), SEND_URL, f.now),
            Some(send_limit(10))
        );
        assert_eq!(
            store.get_authorization(
                &f.acc("B"),
                &f.acc("A"),
                MessageType::Delegate.type_url(),
                f.now
            ),
            None
        );
        // Direction matters.
        assert_eq!(
            store.get_authorization(&f.acc("A"), &f.acc("B"), SEND_URL, f.now),
            None
        );
    }

    #[test]
    fn expired_grants_are_not_returned() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        store
            .save_grant(&f.acc("B"), &f.acc("A"), send_limit(10), f.now)
            .unwrap();
        // Expiration equal to now is still live.
        assert!(store
            .get_authorization(&f.acc("B"), &f.acc("A"), SEND_URL, f.now)
            .is_some());
        let later = f.now + Duration::minutes(1);
        assert!(store
            .get_authorization(&f.acc("B"), &f.acc("A"), SEND_URL, later)
            .is_none());
        match store.dispatch(&f.acc("B"), &[f.send("A", 1)], later) {
            Err(StoreError::Expired { .. }) => {}
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn delete_missing_grant_fails() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        match store.delete_grant(&f.acc("B"), &f.acc("A"), SEND_URL) {
            Err(StoreError::NotFound { msg_type_url, .. }) => assert_eq!(msg_type_url, SEND_URL),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn dispatch_applies_update_then_delete() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        let expiration = f.now + Duration::hours(1);
        store
            .save_grant(&f.acc("B"), &f.acc("A"), send_limit(100), expiration)
            .unwrap();

        let first = store.dispatch(&f.acc("B"), &[f.send("A", 30)], f.now).unwrap();
        assert_eq!(first[0].updated, Some(send_limit(70)));
        let stored = store.grant(&f.acc("B"), &f.acc("A"), SEND_URL).unwrap();
        assert_eq!(stored.authorization, send_limit(70));
        assert_eq!(stored.expiration, expiration);

        let second = store.dispatch(&f.acc("B"), &[f.send("A", 70)], f.now).unwrap();
        assert!(second[0].delete);
        assert!(store.is_empty());
    }

    #[test]
    fn failed_dispatch_commits_nothing() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        store
            .save_grant(&f.acc("B"), &f.acc("A"), send_limit(50), f.now + Duration::hours(1))
            .unwrap();
        let result = store.dispatch(&f.acc("B"), &[f.send("A", 20), f.send("A", 40)], f.now);
        assert_eq!(
            result,
            Err(StoreError::Rejected(AcceptError::Insufficient {
                requested: 40,
                remaining: 30
            }))
        );
        assert_eq!(
            store.get_authorization(&f.acc("B"), &f.acc("A"), SEND_URL, f.now),
            Some(send_limit(50))
        );
    }

    #[test]
    fn self_signed_messages_need_no_grant() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        let resp = store.dispatch(&f.acc("A"), &[f.send("A", 5)], f.now).unwrap();
        assert!(resp[0].accept);
        assert!(store.is_empty());
    }

    #[test]
    fn unspecified_stake_cannot_be_saved() {
        let f = Fixture::new();
        let mut store = MemoryGrantStore::new();
        let auth = Authorization::Stake {
            validators: crate::authorization::ValidatorScope::AllowList(
                [f.ids.validator("X").unwrap()].into_iter().collect(),
            ),
            authorization_type: crate::authorization::StakeAuthorizationType::Unspecified,
            max_tokens: None,
        };
        match store.save_grant(&f.acc("B"), &f.acc("A"), auth, f.now) {
            Err(StoreError::InvalidAuthorization(_)) => {}
            other => panic!("expected InvalidAuthorization, got {:?}", other),
        }
        assert_eq!(store.len(), 0);
    }
}
