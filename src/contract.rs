//! Contract facade: every ledger entry point by name.
//!
//! The typed methods are what embedders call. [`Contract::invoke`] is the
//! string-typed door a ledger host or the CLI goes through: it accepts bare
//! names (`InitUser`) or names qualified by their contract
//! (`AssetContract:InitUser`), parses the arguments and hands back the
//! JSON-shaped result, `null` for calls that only write.
use super::accounts::{Account, AccountLedger};
use super::catalog::{Commodity, CommodityCatalog};
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::escrow::TradeEngine;
use super::inventory::{InventoryEntry, InventoryLedger};
use super::metadata::Metadata;
use super::redemption::{RedemptionEngine, RedemptionRecord, RedemptionRule, RequiredItem};
use super::trade::{Trade, TradeProposal};
use super::types::{Amount, Op, Quantity, parse_quantity};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const ASSET_CONTRACT: &str = "AssetContract";
pub const COMMODITY_CONTRACT: &str = "CommodityContract";
pub const TRADE_CONTRACT: &str = "TradeContract";
pub const REDEMPTION_CONTRACT: &str = "RedemptionContract";

#[derive(Default)]
pub struct Contract {
    accounts: AccountLedger,
    inventory: InventoryLedger,
    catalog: CommodityCatalog,
    trades: TradeEngine,
    redemptions: RedemptionEngine,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    // accounts and inventory

    pub fn init_user(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        initial_balance: Amount,
    ) -> Result<Account> {
        self.accounts.initialize(tx, user_id, initial_balance)
    }
    pub fn get_user_assets(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Account> {
        self.accounts.get(tx, user_id)
    }
    pub fn update_balance(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        amount: Amount,
        op: Op,
    ) -> Result<Account> {
        self.accounts.adjust(tx, user_id, amount, op)
    }
    pub fn get_inventory(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
    ) -> Result<InventoryEntry> {
        self.inventory.get(tx, user_id, commodity_id)
    }
    pub fn get_all_inventory(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
    ) -> Result<Vec<InventoryEntry>> {
        self.inventory.get_all_for_user(tx, user_id)
    }
    pub fn update_inventory(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
        quantity: Quantity,
        op: Op,
    ) -> Result<InventoryEntry> {
        self.inventory.adjust(tx, user_id, commodity_id, quantity, op)
    }

    // catalog

    pub fn create_commodity(
        &self,
        tx: &mut TxContext<'_>,
        commodity_id: &str,
        name: &str,
        metadata: Metadata,
    ) -> Result<Commodity> {
        self.catalog.create(tx, commodity_id, name, metadata)
    }
    pub fn get_commodity(&self, tx: &mut TxContext<'_>, commodity_id: &str) -> Result<Commodity> {
        self.catalog.get(tx, commodity_id)
    }
    pub fn get_all_commodities(&self, tx: &mut TxContext<'_>) -> Result<Vec<Commodity>> {
        self.catalog.get_all(tx)
    }
    pub fn initialize_commodities(&self, tx: &mut TxContext<'_>) -> Result<Vec<String>> {
        self.catalog.seed_defaults(tx)
    }

    // trades

    pub fn create_trade(&self, tx: &mut TxContext<'_>, proposal: TradeProposal) -> Result<Trade> {
        self.trades.propose(tx, proposal)
    }
    pub fn execute_trade(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        self.trades.execute(tx, trade_id)
    }
    pub fn reject_trade(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        self.trades.reject(tx, trade_id)
    }
    pub fn get_trade_status(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        self.trades.status(tx, trade_id)
    }
    pub fn get_trade_history(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Vec<Trade>> {
        self.trades.history_for_user(tx, user_id)
    }

    // redemptions

    pub fn create_redemption_rule(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        required_items: Vec<RequiredItem>,
        reward_amount: Amount,
    ) -> Result<RedemptionRule> {
        self.redemptions
            .create_rule(tx, user_id, required_items, reward_amount)
    }
    pub fn get_redemption_rule(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
    ) -> Result<RedemptionRule> {
        self.redemptions.get_rule(tx, user_id)
    }
    pub fn execute_redemption(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        record_id: &str,
    ) -> Result<RedemptionRecord> {
        self.redemptions.execute(tx, user_id, record_id)
    }
    pub fn get_redemption_history(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
    ) -> Result<Vec<RedemptionRecord>> {
        self.redemptions.history_for_user(tx, user_id)
    }

    /// Route a string-typed call to its entry point.
    pub fn invoke(&self, tx: &mut TxContext<'_>, function: &str, args: &[String]) -> Result<Value> {
        let name = resolve(function)?;
        debug!(function = name, args = args.len(), "dispatching");

        match name {
            "InitUser" => {
                let [user_id, balance] = expect_args::<2>(name, args)?;
                self.init_user(tx, user_id, balance.parse()?)?;
                Ok(Value::Null)
            }
            "GetUserAssets" => {
                let [user_id] = expect_args::<1>(name, args)?;
                to_json(self.get_user_assets(tx, user_id)?)
            }
            "UpdateBalance" => {
                let [user_id, amount, op] = expect_args::<3>(name, args)?;
                self.update_balance(tx, user_id, amount.parse()?, op.parse()?)?;
                Ok(Value::Null)
            }
            "GetInventory" => {
                let [user_id, commodity_id] = expect_args::<2>(name, args)?;
                to_json(self.get_inventory(tx, user_id, commodity_id)?)
            }
            "GetAllInventory" => {
                let [user_id] = expect_args::<1>(name, args)?;
                to_json(self.get_all_inventory(tx, user_id)?)
            }
            "UpdateInventory" => {
                let [user_id, commodity_id, quantity, op] = expect_args::<4>(name, args)?;
                self.update_inventory(
                    tx,
                    user_id,
                    commodity_id,
                    parse_quantity(quantity)?,
                    op.parse()?,
                )?;
                Ok(Value::Null)
            }
            "CreateCommodity" => {
                let [commodity_id, commodity_name, metadata] = expect_args::<3>(name, args)?;
                let metadata = Metadata::parse_json(metadata)?;
                self.create_commodity(tx, commodity_id, commodity_name, metadata)?;
                Ok(Value::Null)
            }
            "GetCommodity" => {
                let [commodity_id] = expect_args::<1>(name, args)?;
                to_json(self.get_commodity(tx, commodity_id)?)
            }
            "GetAllCommodities" => {
                expect_args::<0>(name, args)?;
                to_json(self.get_all_commodities(tx)?)
            }
            "InitializeCommodities" => {
                expect_args::<0>(name, args)?;
                self.initialize_commodities(tx)?;
                Ok(Value::Null)
            }
            "CreateTrade" => {
                let [trade_id, from, to, commodity_id, quantity, price, action] =
                    expect_args::<7>(name, args)?;
                let proposal = TradeProposal::new()
                    .set_trade_id(trade_id)
                    .set_from_user(from)
                    .set_to_user(to)
                    .set_commodity(commodity_id)
                    .set_quantity(parse_quantity(quantity)?)
                    .set_price(price.parse()?)
                    .set_action(action.parse()?);
                self.create_trade(tx, proposal)?;
                Ok(Value::Null)
            }
            "ExecuteTrade" => {
                let [trade_id] = expect_args::<1>(name, args)?;
                self.execute_trade(tx, trade_id)?;
                Ok(Value::Null)
            }
            "RejectTrade" => {
                let [trade_id] = expect_args::<1>(name, args)?;
                self.reject_trade(tx, trade_id)?;
                Ok(Value::Null)
            }
            "GetTradeStatus" => {
                let [trade_id] = expect_args::<1>(name, args)?;
                to_json(self.get_trade_status(tx, trade_id)?)
            }
            "GetTradeHistory" => {
                let [user_id] = expect_args::<1>(name, args)?;
                to_json(self.get_trade_history(tx, user_id)?)
            }
            "CreateRedemptionRule" => {
                let [user_id, items, reward] = expect_args::<3>(name, args)?;
                let items = RequiredItem::parse_list(items)?;
                self.create_redemption_rule(tx, user_id, items, reward.parse()?)?;
                Ok(Value::Null)
            }
            "GetRedemptionRule" => {
                let [user_id] = expect_args::<1>(name, args)?;
                to_json(self.get_redemption_rule(tx, user_id)?)
            }
            "ExecuteRedemption" => {
                let [user_id, record_id] = expect_args::<2>(name, args)?;
                self.execute_redemption(tx, user_id, record_id)?;
                Ok(Value::Null)
            }
            "GetRedemptionHistory" => {
                let [user_id] = expect_args::<1>(name, args)?;
                to_json(self.get_redemption_history(tx, user_id)?)
            }
            other => Err(LedgerError::invalid(format!("unknown function: {other}"))),
        }
    }
}

/// The contract each entry point belongs to.
pub fn namespace_of(function: &str) -> Option<&'static str> {
    match function {
        "InitUser" | "GetUserAssets" | "UpdateBalance" | "GetInventory" | "GetAllInventory"
        | "UpdateInventory" => Some(ASSET_CONTRACT),
        "CreateCommodity" | "GetCommodity" | "GetAllCommodities" | "InitializeCommodities" => {
            Some(COMMODITY_CONTRACT)
        }
        "CreateTrade" | "ExecuteTrade" | "RejectTrade" | "GetTradeStatus" | "GetTradeHistory" => {
            Some(TRADE_CONTRACT)
        }
        "CreateRedemptionRule" | "GetRedemptionRule" | "ExecuteRedemption"
        | "GetRedemptionHistory" => Some(REDEMPTION_CONTRACT),
        _ => None,
    }
}

// strip and check an optional `Namespace:` qualifier
fn resolve(function: &str) -> Result<&str> {
    let (namespace, name) = match function.split_once(':') {
        Some((namespace, name)) => (Some(namespace), name),
        None => (None, function),
    };

    match (namespace, namespace_of(name)) {
        (_, None) => Err(LedgerError::invalid(format!("unknown function: {function}"))),
        (Some(given), Some(expected)) if given != expected => Err(LedgerError::invalid(format!(
            "function {name} belongs to {expected}, not {given}"
        ))),
        _ => Ok(name),
    }
}

fn expect_args<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(LedgerError::invalid(format!(
            "{function} expects {N} argument(s), got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
