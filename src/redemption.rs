//! Redemption rules: trade a fixed bundle of inventory for a balance reward
use super::accounts::{AccountLedger, Balances};
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::events::{Event, REDEMPTION_EXECUTED, RedemptionExecuted};
use super::inventory::{Holdings, InventoryLedger};
use super::keys;
use super::types::{Amount, Op, Quantity, TimeStamp};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{info, instrument};

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct RequiredItem {
    #[n(0)]
    pub commodity_id: String,
    #[n(1)]
    pub quantity: Quantity,
}

impl RequiredItem {
    pub fn new(commodity_id: &str, quantity: Quantity) -> Self {
        Self {
            commodity_id: commodity_id.to_string(),
            quantity,
        }
    }

    /// Parse the JSON list form, e.g. `[{"commodityId": "1", "quantity": 3}]`.
    pub fn parse_list(raw: &str) -> Result<Vec<RequiredItem>> {
        serde_json::from_str(raw)
            .map_err(|e| LedgerError::invalid(format!("failed to parse required items: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRule {
    #[n(0)]
    pub rule_id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub required_items: Vec<RequiredItem>,
    #[n(3)]
    pub reward_amount: Amount,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    #[n(0)]
    pub record_id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub rule_id: String,
    #[n(3)]
    pub reward_amount: Amount,
    #[n(4)]
    pub consumed_items: Vec<RequiredItem>,
    #[n(5)]
    pub timestamp: TimeStamp<Utc>,
}

pub struct RedemptionEngine<B = AccountLedger, H = InventoryLedger> {
    balances: B,
    holdings: H,
}

impl Default for RedemptionEngine {
    fn default() -> Self {
        Self::new(AccountLedger, InventoryLedger)
    }
}

impl<B: Balances, H: Holdings> RedemptionEngine<B, H> {
    pub fn new(balances: B, holdings: H) -> Self {
        Self { balances, holdings }
    }

    /// One rule per user; there is no update or delete.
    #[instrument(skip(self, tx, required_items), fields(items = required_items.len()))]
    pub fn create_rule(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        required_items: Vec<RequiredItem>,
        reward_amount: Amount,
    ) -> Result<RedemptionRule> {
        if required_items.is_empty() {
            return Err(LedgerError::invalid("required items cannot be empty"));
        }
        if !reward_amount.is_positive() {
            return Err(LedgerError::invalid(format!(
                "reward amount must be positive, got {reward_amount}"
            )));
        }

        let key = keys::redemption_rule(user_id);
        if tx.exists(&key)? {
            return Err(LedgerError::already_exists("redemption rule for user", user_id));
        }

        let rule = RedemptionRule {
            rule_id: format!("rule_{user_id}"),
            user_id: user_id.to_string(),
            required_items,
            reward_amount,
            created_at: tx.timestamp(),
        };
        tx.put_record(&key, &rule)?;

        info!(rule_id = %rule.rule_id, reward = %reward_amount, "redemption rule created");
        Ok(rule)
    }

    pub fn get_rule(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<RedemptionRule> {
        tx.get_record(&keys::redemption_rule(user_id))?
            .ok_or_else(|| LedgerError::not_found("redemption rule for user", user_id))
    }

    /// Consume the rule's bundle and pay out its reward. Either every item
    /// is available and everything happens, or nothing does.
    #[instrument(skip(self, tx))]
    pub fn execute(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        record_id: &str,
    ) -> Result<RedemptionRecord> {
        if record_id.is_empty() {
            return Err(LedgerError::invalid("record id is empty"));
        }

        let rule = self.get_rule(tx, user_id)?;

        let record_key = keys::redemption_record(record_id);
        if tx.exists(&record_key)? {
            return Err(LedgerError::already_exists("redemption record", record_id));
        }

        self.check_bundle(tx, user_id, &rule.required_items)?;

        for item in &rule.required_items {
            self.holdings
                .adjust_holding(tx, user_id, &item.commodity_id, item.quantity, Op::Debit)?;
        }
        self.balances
            .adjust_balance(tx, user_id, rule.reward_amount, Op::Credit)?;

        let record = RedemptionRecord {
            record_id: record_id.to_string(),
            user_id: user_id.to_string(),
            rule_id: rule.rule_id.clone(),
            reward_amount: rule.reward_amount,
            consumed_items: rule.required_items,
            timestamp: tx.timestamp(),
        };
        tx.put_record(&record_key, &record)?;
        tx.put_state(
            &keys::redemption_index(user_id, record_id),
            record_id.as_bytes().to_vec(),
        );

        let event = RedemptionExecuted {
            record_id: record.record_id.clone(),
            user_id: record.user_id.clone(),
            rule_id: record.rule_id.clone(),
            reward_amount: record.reward_amount,
            timestamp: record.timestamp.clone(),
        };
        tx.set_event(Event::new(REDEMPTION_EXECUTED, &event)?);

        info!(reward = %record.reward_amount, "redemption executed");
        Ok(record)
    }

    /// Redemptions made by `user_id`, ordered by record id.
    pub fn history_for_user(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
    ) -> Result<Vec<RedemptionRecord>> {
        let mut records = BTreeMap::new();

        for (_, record_id) in tx.scan_prefix(&keys::redemption_index_of(user_id))? {
            let record_id = String::from_utf8(record_id).map_err(LedgerError::codec)?;
            let record: RedemptionRecord = tx
                .get_record(&keys::redemption_record(&record_id))?
                .ok_or_else(|| LedgerError::not_found("redemption record", &record_id))?;
            if record.user_id == user_id {
                records.insert(record_id, record);
            }
        }

        Ok(records.into_values().collect())
    }

    // A commodity listed twice must be covered by its combined quantity.
    // The error names the first item, in rule order, that cannot be covered.
    fn check_bundle(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        items: &[RequiredItem],
    ) -> Result<()> {
        let mut claimed: BTreeMap<&str, Quantity> = BTreeMap::new();

        for item in items {
            let total = claimed.entry(item.commodity_id.as_str()).or_default();
            *total = total.saturating_add(item.quantity);

            let held = self.holdings.holding(tx, user_id, &item.commodity_id)?;
            if held.quantity < *total {
                return Err(LedgerError::InsufficientInventory {
                    user_id: user_id.to_string(),
                    commodity_id: item.commodity_id.clone(),
                    required: *total,
                    available: held.quantity,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn ts() -> TimeStamp<Utc> {
        TimeStamp::new_with(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn rule_validation() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, ts());
        let engine = RedemptionEngine::default();

        let err = engine
            .create_rule(&mut tx, "u1", vec![], Amount::from(500))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = engine
            .create_rule(&mut tx, "u1", vec![RequiredItem::new("1", 1)], Amount::ZERO)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let rule = engine
            .create_rule(&mut tx, "u1", vec![RequiredItem::new("1", 1)], Amount::from(5))
            .unwrap();
        assert_eq!(rule.rule_id, "rule_u1");

        let err = engine
            .create_rule(&mut tx, "u1", vec![RequiredItem::new("2", 1)], Amount::from(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn repeated_commodity_needs_combined_quantity() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, ts());
        let engine = RedemptionEngine::default();
        AccountLedger.initialize(&mut tx, "u1", Amount::ZERO).unwrap();
        InventoryLedger.adjust(&mut tx, "u1", "1", 5, Op::Credit).unwrap();

        let items = vec![RequiredItem::new("1", 3), RequiredItem::new("1", 3)];
        engine
            .create_rule(&mut tx, "u1", items, Amount::from(10))
            .unwrap();

        match engine.execute(&mut tx, "u1", "r1").unwrap_err() {
            LedgerError::InsufficientInventory {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reused_record_id_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, ts());
        let engine = RedemptionEngine::default();
        AccountLedger.initialize(&mut tx, "u1", Amount::ZERO).unwrap();
        InventoryLedger.adjust(&mut tx, "u1", "1", 5, Op::Credit).unwrap();
        engine
            .create_rule(&mut tx, "u1", vec![RequiredItem::new("1", 1)], Amount::from(10))
            .unwrap();

        engine.execute(&mut tx, "u1", "r1").unwrap();
        let err = engine.execute(&mut tx, "u1", "r1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(InventoryLedger.get(&mut tx, "u1", "1").unwrap().quantity, 4);
    }

    #[test]
    fn parses_required_items_json() {
        let items = RequiredItem::parse_list(
            r#"[{"commodityId": "c1", "quantity": 3}, {"commodityId": "c2", "quantity": 2}]"#,
        )
        .unwrap();
        assert_eq!(items, vec![RequiredItem::new("c1", 3), RequiredItem::new("c2", 2)]);

        let err = RequiredItem::parse_list(r#"[{"commodityId": "c1", "quantity": -3}]"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn history_keeps_ids_with_underscores_apart() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, ts());
        let engine = RedemptionEngine::default();
        for (user_id, record_id) in [("u1", "x_r"), ("u1_x", "r")] {
            AccountLedger.initialize(&mut tx, user_id, Amount::ZERO).unwrap();
            InventoryLedger.adjust(&mut tx, user_id, "1", 1, Op::Credit).unwrap();
            engine
                .create_rule(&mut tx, user_id, vec![RequiredItem::new("1", 1)], Amount::from(10))
                .unwrap();
            engine.execute(&mut tx, user_id, record_id).unwrap();
        }

        let history = engine.history_for_user(&mut tx, "u1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record_id, "x_r");

        let history = engine.history_for_user(&mut tx, "u1_x").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record_id, "r");
    }
}
