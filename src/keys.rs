//! Composite state keys. Every entity lives under its own prefix so a
//! collection can be listed with a single prefix scan.

pub const USER_ASSET_PREFIX: &str = "user_asset_";
pub const INVENTORY_PREFIX: &str = "inventory_";
pub const COMMODITY_PREFIX: &str = "commodity_";
pub const TRADE_PREFIX: &str = "trade_";
pub const REDEMPTION_RULE_PREFIX: &str = "redemption_rule_";
pub const REDEMPTION_RECORD_PREFIX: &str = "redemption_record_";

// secondary per-user indexes, kept outside every entity prefix above
pub const TRADE_INDEX_PREFIX: &str = "idx_trade_";
pub const REDEMPTION_INDEX_PREFIX: &str = "idx_redemption_";

pub fn user_asset(user_id: &str) -> String {
    format!("{USER_ASSET_PREFIX}{user_id}")
}

pub fn inventory(user_id: &str, commodity_id: &str) -> String {
    format!("{INVENTORY_PREFIX}{user_id}_{commodity_id}")
}

/// Prefix covering every inventory entry of `user_id`. Ids may themselves
/// contain `_`, so callers must check the owner of whatever the scan returns.
pub fn inventory_of(user_id: &str) -> String {
    format!("{INVENTORY_PREFIX}{user_id}_")
}

pub fn commodity(commodity_id: &str) -> String {
    format!("{COMMODITY_PREFIX}{commodity_id}")
}

pub fn trade(trade_id: &str) -> String {
    format!("{TRADE_PREFIX}{trade_id}")
}

pub fn redemption_rule(user_id: &str) -> String {
    format!("{REDEMPTION_RULE_PREFIX}{user_id}")
}

pub fn redemption_record(record_id: &str) -> String {
    format!("{REDEMPTION_RECORD_PREFIX}{record_id}")
}

// The user segment is length-prefixed so `u1` + `x_t` and `u1_x` + `t`
// land on different keys and one user's prefix never covers another's.
pub fn trade_index(user_id: &str, trade_id: &str) -> String {
    format!("{}{trade_id}", trade_index_of(user_id))
}

pub fn trade_index_of(user_id: &str) -> String {
    format!("{TRADE_INDEX_PREFIX}{}:{user_id}_", user_id.len())
}

pub fn redemption_index(user_id: &str, record_id: &str) -> String {
    format!("{}{record_id}", redemption_index_of(user_id))
}

pub fn redemption_index_of(user_id: &str) -> String {
    format!("{REDEMPTION_INDEX_PREFIX}{}:{user_id}_", user_id.len())
}
