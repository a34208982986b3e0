// builder.rs — Abstract payloads → concrete authorizations and messages.
//
// The builder is a pure function of its inputs and the identity table:
// it never touches the store. Failures come back as `BuildError`, which the
// handlers check against the step's expected outcome instead of
// propagating.

use std::collections::BTreeSet;

use crate::authorization::{Authorization, StakeAuthorizationType, ValidatorScope};
use crate::error::BuildError;
use crate::identity::{AccAddress, IdentityResolver, ValAddress};
use crate::message::{Coin, Message, MessageType};
use crate::trace::{AuthorizationPayload, ExecRequest, StakeLimit};

/// Proposal every model "other" message votes on.
const VOTE_PROPOSAL_ID: u64 = 1;

/// Builds concrete values from model payloads for one replay environment.
pub struct AuthorizationBuilder<'a, R: IdentityResolver + ?Sized> {
    resolver: &'a R,
    denom: &'a str,
}

impl<'a, R: IdentityResolver + ?Sized> AuthorizationBuilder<'a, R> {
    pub fn new(resolver: &'a R, denom: &'a str) -> Self {
        Self { resolver, denom }
    }

    /// Build the authorization a grant payload describes for `message_type`
    /// (a model message name such as `msg_delegate`).
    pub fn build(
        &self,
        payload: &AuthorizationPayload,
        message_type: &str,
    ) -> Result<Authorization, BuildError> {
        match payload {
            AuthorizationPayload::Generic => Ok(Authorization::Generic {
                msg: MessageType::from_model(message_type)?,
            }),
            AuthorizationPayload::Send { limit } => Ok(Authorization::Send {
                spend_limit: Coin::from_model(self.denom, *limit)?,
            }),
            AuthorizationPayload::Stake {
                allow_list,
                deny_list,
                limit,
            } => {
                let validators = match (allow_list.is_empty(), deny_list.is_empty()) {
                    (false, false) => return Err(BuildError::BothValidatorLists),
                    (true, true) => return Err(BuildError::NoValidatorList),
                    (false, true) => ValidatorScope::AllowList(self.validators(allow_list)?),
                    (true, false) => ValidatorScope::DenyList(self.validators(deny_list)?),
                };
                let authorization_type =
                    StakeAuthorizationType::for_message(MessageType::from_model(message_type).ok());
                let max_tokens = match limit {
                    StakeLimit::Unlimited => None,
                    StakeLimit::Finite(amount) => Some(Coin::from_model(self.denom, *amount)?),
                };
                Ok(Authorization::Stake {
                    validators,
                    authorization_type,
                    max_tokens,
                })
            }
            AuthorizationPayload::Unrecognized { logic } => {
                Err(BuildError::UnknownLogic(logic.clone()))
            }
        }
    }

    /// Reconstruct the message a grantee executes on `granter`'s behalf.
    ///
    /// Sends go to `recipient`; staking messages use the granter as
    /// delegator; the model's "other" message becomes a vote.
    pub fn build_message(
        &self,
        request: &ExecRequest,
        granter: &AccAddress,
        recipient: &AccAddress,
    ) -> Result<Message, BuildError> {
        let message_type = MessageType::from_model(&request.message_type)?;
        let message = match message_type {
            MessageType::Send => Message::Send {
                from: granter.clone(),
                to: recipient.clone(),
                amount: self.amount(request)?,
            },
            MessageType::Delegate => Message::Delegate {
                delegator: granter.clone(),
                validator: self.resolver.validator(&request.validator)?,
                amount: self.amount(request)?,
            },
            MessageType::Undelegate => Message::Undelegate {
                delegator: granter.clone(),
                validator: self.resolver.validator(&request.validator)?,
                amount: self.amount(request)?,
            },
            MessageType::Redelegate => {
                let new_validator = request
                    .new_validator
                    .as_deref()
                    .ok_or(BuildError::MissingNewValidator)?;
                Message::BeginRedelegate {
                    delegator: granter.clone(),
                    src_validator: self.resolver.validator(&request.validator)?,
                    dst_validator: self.resolver.validator(new_validator)?,
                    amount: self.amount(request)?,
                }
            }
            MessageType::Vote => Message::Vote {
                voter: granter.clone(),
                proposal_id: VOTE_PROPOSAL_ID,
            },
        };
        Ok(message)
    }

    fn validators(&self, names: &BTreeSet<String>) -> Result<BTreeSet<ValAddress>, BuildError> {
        names
            .iter()
            .map(|name| self.resolver.validator(name).map_err(BuildError::from))
            .collect()
    }

    fn amount(&self, request: &ExecRequest) -> Result<Coin, BuildError> {
        Coin::from_model(self.denom, request.amount)
    }
}
