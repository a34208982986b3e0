// authorization.rs — Concrete authorization variants and their accept logic.
//
// An authorization decides whether a grantee may execute one message on the
// granter's behalf. `accept()` is a pure decision: it returns whether the
// message is accepted, whether the grant is used up (`delete`), and the
// authorization that should replace the stored one (`updated`). Persisting
// that decision is the store's job.
//
//   Generic → accepts anything, never changes
//   Send    → spend limit, decremented per message, deleted at zero
//   Stake   → validator allow/deny list, optional limit (None = unlimited)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AcceptError, BuildError};
use crate::identity::ValAddress;
use crate::message::{Coin, Message, MessageType};

/// Which staking message a stake authorization covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeAuthorizationType {
    Unspecified,
    Delegate,
    Undelegate,
    Redelegate,
}

impl StakeAuthorizationType {
    /// Pick the subtype from a model message type; anything that is not a
    /// staking message is `Unspecified`.
    pub fn for_message(message_type: Option<MessageType>) -> Self {
        match message_type {
            Some(MessageType::Delegate) => StakeAuthorizationType::Delegate,
            Some(MessageType::Undelegate) => StakeAuthorizationType::Undelegate,
            Some(MessageType::Redelegate) => StakeAuthorizationType::Redelegate,
            _ => StakeAuthorizationType::Unspecified,
        }
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            StakeAuthorizationType::Unspecified => None,
            StakeAuthorizationType::Delegate => Some(MessageType::Delegate),
            StakeAuthorizationType::Undelegate => Some(MessageType::Undelegate),
            StakeAuthorizationType::Redelegate => Some(MessageType::Redelegate),
        }
    }
}

/// The validators a stake authorization is restricted to (or from).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "validators", rename_all = "snake_case")]
pub enum ValidatorScope {
    AllowList(BTreeSet<ValAddress>),
    DenyList(BTreeSet<ValAddress>),
}

/// The authorization logic of a grant, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationLogic {
    Generic,
    Send,
    Stake,
}

/// A concrete authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "logic", rename_all = "snake_case")]
pub enum Authorization {
    Generic {
        msg: MessageType,
    },
    Send {
        spend_limit: Coin,
    },
    Stake {
        validators: ValidatorScope,
        authorization_type: StakeAuthorizationType,
        /// `None` means unlimited.
        max_tokens: Option<Coin>,
    },
}

/// The outcome of `Authorization::accept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub accept: bool,
    pub delete: bool,
    pub updated: Option<Authorization>,
}

impl AcceptResponse {
    fn accepted() -> Self {
        Self {
            accept: true,
            delete: false,
            updated: None,
        }
    }

    fn spent() -> Self {
        Self {
            accept: true,
            delete: true,
            updated: None,
        }
    }

    fn updated(authorization: Authorization) -> Self {
        Self {
            accept: true,
            delete: false,
            updated: Some(authorization),
        }
    }
}

impl Authorization {
    pub fn logic(&self) -> AuthorizationLogic {
        match self {
            Authorization::Generic { .. } => AuthorizationLogic::Generic,
            Authorization::Send { .. } => AuthorizationLogic::Send,
            Authorization::Stake { .. } => AuthorizationLogic::Stake,
        }
    }

    /// The message type this authorization is stored under, if it has one.
    ///
    /// A stake authorization with an unspecified subtype has none and
    /// cannot be stored.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Authorization::Generic { msg } => Some(*msg),
            Authorization::Send { .. } => Some(MessageType::Send),
            Authorization::Stake {
                authorization_type,
                ..
            } => authorization_type.message_type(),
        }
    }

    /// Self-consistency check run before a grant is saved.
    pub fn validate_basic(&self) -> Result<(), BuildError> {
        match self {
            Authorization::Generic { .. } => Ok(()),
            Authorization::Send { spend_limit } => {
                if spend_limit.is_zero() {
                    Err(BuildError::Invalid("spend limit must be positive".to_string()))
                } else {
                    Ok(())
                }
            }
            Authorization::Stake {
                validators,
                authorization_type,
                ..
            } => {
                if *authorization_type == StakeAuthorizationType::Unspecified {
                    return Err(BuildError::Invalid("unknown authorization type".to_string()));
                }
                match validators {
                    ValidatorScope::AllowList(list) | ValidatorScope::DenyList(list)
                        if list.is_empty() =>
                    {
                        Err(BuildError::Invalid("validator list cannot be empty".to_string()))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Decide whether `msg` may be executed under this authorization.
    pub fn accept(&self, msg: &Message) -> Result<AcceptResponse, AcceptError> {
        match self {
            Authorization::Generic { .. } => Ok(AcceptResponse::accepted()),
            Authorization::Send { spend_limit } => {
                let amount = match msg {
                    Message::Send { amount, .. } => amount,
                    other => {
                        return Err(AcceptError::UnsupportedMessage(
                            other.type_url().to_string(),
                        ))
                    }
                };
                let left = spend_limit
                    .checked_sub(amount)
                    .ok_or(AcceptError::Insufficient {
                        requested: amount.amount,
                        remaining: spend_limit.amount,
                    })?;
                if left.is_zero() {
                    Ok(AcceptResponse::spent())
                } else {
                    Ok(AcceptResponse::updated(Authorization::Send {
                        spend_limit: left,
                    }))
                }
            }
            Authorization::Stake {
                validators,
                authorization_type,
                max_tokens,
            } => {
                if authorization_type.message_type() != Some(msg.message_type()) {
                    return Err(AcceptError::UnsupportedMessage(msg.type_url().to_string()));
                }
                let (validator, amount) = match msg {
                    Message::Delegate {
                        validator, amount, ..
                    }
                    | Message::Undelegate {
                        validator, amount, ..
                    } => (validator, amount),
                    Message::BeginRedelegate {
                        dst_validator,
                        amount,
                        ..
                    } => (dst_validator, amount),
                    other => {
                        return Err(AcceptError::UnsupportedMessage(
                            other.type_url().to_string(),
                        ))
                    }
                };

                match validators {
                    ValidatorScope::DenyList(denied) if denied.contains(validator) => {
                        return Err(AcceptError::Denied(validator.to_string()));
                    }
                    ValidatorScope::AllowList(allowed) if !allowed.contains(validator) => {
                        return Err(AcceptError::NotAllowed(validator.to_string()));
                    }
                    _ => {}
                }

                let limit = match max_tokens {
                    None => return Ok(AcceptResponse::updated(self.clone())),
                    Some(limit) => limit,
                };
                let left = limit
                    .checked_sub(amount)
                    .ok_or(AcceptError::Insufficient {
                        requested: amount.amount,
                        remaining: limit.amount,
                    })?;
                if left.is_zero() {
                    Ok(AcceptResponse::spent())
                } else {
                    Ok(AcceptResponse::updated(Authorization::Stake {
                        validators: validators.clone(),
                        authorization_type: *authorization_type,
                        max_tokens: Some(left),
                    }))
                }
            }
        }
    }
}
