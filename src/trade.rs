//! Trade records and the proposal builder
use super::error::{LedgerError, Result};
use super::types::{Amount, Quantity, TimeStamp};
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

#[derive(
    minicbor::Encode, minicbor::Decode, serde::Serialize, Debug, Clone, Copy, Eq, PartialEq,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[n(0)]
    Buy,
    #[n(1)]
    Sell,
}

#[derive(
    minicbor::Encode, minicbor::Decode, serde::Serialize, Debug, Clone, Copy, Eq, PartialEq,
)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Successful,
    #[n(2)]
    Rejected,
}

/// Who hands over the commodity and who pays for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parties<'a> {
    pub seller: &'a str,
    pub buyer: &'a str,
}

impl Action {
    /// `buy`: the proposer (from) buys from the counterparty (to).
    /// `sell`: the proposer sells to the counterparty.
    pub fn resolve<'a>(&self, from_user_id: &'a str, to_user_id: &'a str) -> Parties<'a> {
        match self {
            Action::Buy => Parties {
                seller: to_user_id,
                buyer: from_user_id,
            },
            Action::Sell => Parties {
                seller: from_user_id,
                buyer: to_user_id,
            },
        }
    }
}

impl FromStr for Action {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            other => Err(LedgerError::invalid(format!(
                "invalid action: {other} (must be 'buy' or 'sell')"
            ))),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Pending => f.write_str("pending"),
            TradeStatus::Successful => f.write_str("successful"),
            TradeStatus::Rejected => f.write_str("rejected"),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, serde::Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[n(0)]
    pub trade_id: String,
    #[n(1)]
    pub from_user_id: String,
    #[n(2)]
    pub to_user_id: String,
    #[n(3)]
    pub commodity_id: String,
    #[n(4)]
    pub quantity: Quantity,
    #[n(5)]
    pub price: Amount,
    #[n(6)]
    pub action: Action,
    #[n(7)]
    pub status: TradeStatus,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
    #[n(9)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<TimeStamp<Utc>>,
}

impl Trade {
    pub fn parties(&self) -> Parties<'_> {
        self.action.resolve(&self.from_user_id, &self.to_user_id)
    }
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
    pub fn is_pending(&self) -> bool {
        self.status == TradeStatus::Pending
    }
}

// Drafts are assembled field by field, then checked in one go by `finalise`
#[derive(Debug, Default, Clone)]
pub struct TradeProposal {
    trade_id: Option<String>,
    from_user_id: Option<String>,
    to_user_id: Option<String>,
    commodity_id: Option<String>,
    quantity: Quantity,
    price: Option<Amount>,
    action: Option<Action>,
}

impl TradeProposal {
    /// Construct an empty draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_trade_id(mut self, trade_id: &str) -> Self {
        self.trade_id = Some(trade_id.to_string());
        self
    }
    pub fn set_from_user(mut self, user_id: &str) -> Self {
        self.from_user_id = Some(user_id.to_string());
        self
    }
    pub fn set_to_user(mut self, user_id: &str) -> Self {
        self.to_user_id = Some(user_id.to_string());
        self
    }
    pub fn set_commodity(mut self, commodity_id: &str) -> Self {
        self.commodity_id = Some(commodity_id.to_string());
        self
    }
    pub fn set_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }
    pub fn set_price(mut self, price: Amount) -> Self {
        self.price = Some(price);
        self
    }
    pub fn set_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
    pub fn trade_id(&self) -> Option<&str> {
        self.trade_id.as_deref()
    }

    /// Check every field and turn the draft into a pending trade.
    pub fn finalise(self, created_at: TimeStamp<Utc>) -> Result<Trade> {
        let action = self
            .action
            .ok_or_else(|| LedgerError::invalid("action is not set (must be 'buy' or 'sell')"))?;
        let trade_id = required(self.trade_id, "trade id")?;
        let from_user_id = required(self.from_user_id, "from user id")?;
        let to_user_id = required(self.to_user_id, "to user id")?;
        let commodity_id = required(self.commodity_id, "commodity id")?;

        if self.quantity == 0 {
            return Err(LedgerError::invalid("quantity is set to zero"));
        }
        let price = self
            .price
            .ok_or_else(|| LedgerError::invalid("price is not set"))?;
        if price.is_negative() {
            return Err(LedgerError::invalid(format!(
                "price must be non-negative, got {price}"
            )));
        }

        Ok(Trade {
            trade_id,
            from_user_id,
            to_user_id,
            commodity_id,
            quantity: self.quantity,
            price,
            action,
            status: TradeStatus::Pending,
            created_at,
            completed_at: None,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(LedgerError::invalid(format!("{field} is not set"))),
    }
}
