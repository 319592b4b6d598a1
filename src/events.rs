//! Notifications emitted by committed transactions
use super::error::Result;
use super::types::{Amount, Quantity, TimeStamp};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

pub const TRADE_EXECUTED: &str = "TradeExecuted";
pub const REDEMPTION_EXECUTED: &str = "RedemptionExecuted";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new<T: Serialize>(name: &str, payload: &T) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeExecuted {
    pub trade_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub commodity_id: String,
    pub quantity: Quantity,
    pub price: Amount,
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionExecuted {
    pub record_id: String,
    pub user_id: String,
    pub rule_id: String,
    pub reward_amount: Amount,
    pub timestamp: TimeStamp<Utc>,
}

/// Receives events after their transaction has been committed. Events of a
/// failed transaction are never published.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &Event);
}

pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &Event) {
        info!(event = %event.name, payload = %event.payload, "ledger event");
    }
}
