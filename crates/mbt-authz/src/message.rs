// message.rs — Concrete messages a grantee can execute.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::identity::{AccAddress, ValAddress};

/// An amount in a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Build a coin from a model amount, rejecting negatives.
    pub fn from_model(denom: &str, amount: i64) -> Result<Self, BuildError> {
        u64::try_from(amount)
            .map(|amount| Self::new(denom, amount))
            .map_err(|_| BuildError::NegativeAmount(amount))
    }

    /// `self - other`, or `None` if the result would be negative or the
    /// denominations differ.
    pub fn checked_sub(&self, other: &Coin) -> Option<Coin> {
        if self.denom != other.denom {
            return None;
        }
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Coin::new(self.denom.clone(), amount))
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// The kinds of message the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Send,
    Delegate,
    Undelegate,
    Redelegate,
    /// The model's "some other message" (`msg_alpha`), realised as a vote.
    Vote,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::Send,
        MessageType::Delegate,
        MessageType::Undelegate,
        MessageType::Redelegate,
        MessageType::Vote,
    ];

    /// Look up a model message name such as `msg_send`.
    pub fn from_model(name: &str) -> Result<Self, BuildError> {
        MessageType::ALL
            .iter()
            .copied()
            .find(|t| t.model_name() == name)
            .ok_or_else(|| BuildError::UnknownMessageType(name.to_string()))
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            MessageType::Send => "msg_send",
            MessageType::Delegate => "msg_delegate",
            MessageType::Undelegate => "msg_undelegate",
            MessageType::Redelegate => "msg_redelegate",
            MessageType::Vote => "msg_alpha",
        }
    }

    /// The type URL grants are keyed by.
    pub fn type_url(&self) -> &'static str {
        match self {
            MessageType::Send => "/cosmos.bank.v1beta1.MsgSend",
            MessageType::Delegate => "/cosmos.staking.v1beta1.MsgDelegate",
            MessageType::Undelegate => "/cosmos.staking.v1beta1.MsgUndelegate",
            MessageType::Redelegate => "/cosmos.staking.v1beta1.MsgBeginRedelegate",
            MessageType::Vote => "/cosmos.gov.v1beta1.MsgVote",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

/// A message as the grantee submits it on the granter's behalf.
///
/// The signer of every message is the granter; the store matches it
/// against the grantee's grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Send {
        from: AccAddress,
        to: AccAddress,
        amount: Coin,
    },
    Delegate {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
    },
    Undelegate {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
    },
    BeginRedelegate {
        delegator: AccAddress,
        src_validator: ValAddress,
        dst_validator: ValAddress,
        amount: Coin,
    },
    Vote {
        voter: AccAddress,
        proposal_id: u64,
    },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Send { .. } => MessageType::Send,
            Message::Delegate { .. } => MessageType::Delegate,
            Message::Undelegate { .. } => MessageType::Undelegate,
            Message::BeginRedelegate { .. } => MessageType::Redelegate,
            Message::Vote { .. } => MessageType::Vote,
        }
    }

    pub fn type_url(&self) -> &'static str {
        self.message_type().type_url()
    }

    /// The account whose authority the message exercises.
    pub fn signer(&self) -> &AccAddress {
        match self {
            Message::Send { from, .. } => from,
            Message::Delegate { delegator, .. }
            | Message::Undelegate { delegator, .. }
            | Message::BeginRedelegate { delegator, .. } => delegator,
            Message::Vote { voter, .. } => voter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_map_to_type_urls() {
        assert_eq!(
            MessageType::from_model("msg_redelegate").unwrap().type_url(),
            "/cosmos.staking.v1beta1.MsgBeginRedelegate"
        );
        assert_eq!(
            MessageType::from_model("msg_alpha").unwrap(),
            MessageType::Vote
        );
        assert_eq!(
            MessageType::from_model("msg_burn"),
            Err(BuildError::UnknownMessageType("msg_burn".to_string()))
        );
    }

    #[test]
    fn coin_rejects_negative_model_amounts() {
        assert_eq!(Coin::from_model("stake", -1), Err(BuildError::NegativeAmount(-1)));
        assert_eq!(Coin::from_model("stake", 5).unwrap(), Coin::new("stake", 5));
    }

    #[test]
    fn checked_sub_stops_at_zero() {
        let limit = Coin::new("stake", 100);
        assert_eq!(limit.checked_sub(&Coin::new("stake", 30)), Some(Coin::new("stake", 70)));
        assert!(limit.checked_sub(&Coin::new("stake", 100)).unwrap().is_zero());
        assert_eq!(limit.checked_sub(&Coin::new("stake", 101)), None);
        assert_eq!(limit.checked_sub(&Coin::new("atom", 1)), None);
    }
}
