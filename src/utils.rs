//! Identifier minting for callers that need fresh trade or record ids

use bech32::Bech32m;
use uuid7::uuid7;

pub const TRADE_HRP: &str = "trade_";
pub const RECORD_HRP: &str = "redeem_";

// time-ordered uuid, bech32m encoded under the given human readable part
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_trade_id() -> anyhow::Result<String> {
    new_uuid_to_bech32(TRADE_HRP)
}

pub fn new_record_id() -> anyhow::Result<String> {
    new_uuid_to_bech32(RECORD_HRP)
}
