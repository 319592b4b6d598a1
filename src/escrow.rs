//! Trade escrow engine: propose, then execute or reject.
//!
//! A proposal only checks that the trade is feasible at that moment, nothing
//! is reserved. Execution re-checks both sides against current state before
//! moving stock and funds, because other transactions may have run in
//! between. All four ledger mutations and the status change are written to
//! the same transaction context, so they commit together or not at all.
use super::accounts::{AccountLedger, Balances};
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::events::{Event, TRADE_EXECUTED, TradeExecuted};
use super::inventory::{Holdings, InventoryLedger};
use super::keys;
use super::trade::{Trade, TradeProposal, TradeStatus};
use super::types::Op;
use std::collections::BTreeMap;
use tracing::{info, instrument};

pub struct TradeEngine<B = AccountLedger, H = InventoryLedger> {
    balances: B,
    holdings: H,
}

impl Default for TradeEngine {
    fn default() -> Self {
        Self::new(AccountLedger, InventoryLedger)
    }
}

impl<B: Balances, H: Holdings> TradeEngine<B, H> {
    pub fn new(balances: B, holdings: H) -> Self {
        Self { balances, holdings }
    }

    #[instrument(skip(self, tx, proposal), fields(trade_id = proposal.trade_id()))]
    pub fn propose(&self, tx: &mut TxContext<'_>, proposal: TradeProposal) -> Result<Trade> {
        let trade = proposal.finalise(tx.timestamp())?;

        let key = keys::trade(&trade.trade_id);
        if tx.exists(&key)? {
            return Err(LedgerError::already_exists("trade", &trade.trade_id));
        }

        self.check_feasible(tx, &trade)?;

        tx.put_record(&key, &trade)?;
        for user_id in [&trade.from_user_id, &trade.to_user_id] {
            tx.put_state(
                &keys::trade_index(user_id, &trade.trade_id),
                trade.trade_id.as_bytes().to_vec(),
            );
        }

        info!(
            from = %trade.from_user_id,
            to = %trade.to_user_id,
            commodity_id = %trade.commodity_id,
            quantity = trade.quantity,
            price = %trade.price,
            "trade proposed"
        );
        Ok(trade)
    }

    #[instrument(skip(self, tx))]
    pub fn execute(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        let mut trade = self.load_pending(tx, trade_id)?;

        // state may have moved since the proposal
        self.check_feasible(tx, &trade)?;

        let parties = trade.parties();
        let (seller, buyer) = (parties.seller.to_string(), parties.buyer.to_string());

        self.holdings
            .adjust_holding(tx, &seller, &trade.commodity_id, trade.quantity, Op::Debit)?;
        self.holdings
            .adjust_holding(tx, &buyer, &trade.commodity_id, trade.quantity, Op::Credit)?;
        self.balances
            .adjust_balance(tx, &buyer, trade.price, Op::Debit)?;
        self.balances
            .adjust_balance(tx, &seller, trade.price, Op::Credit)?;

        let completed_at = tx.timestamp();
        trade.status = TradeStatus::Successful;
        trade.completed_at = Some(completed_at.clone());
        tx.put_record(&keys::trade(trade_id), &trade)?;

        let event = TradeExecuted {
            trade_id: trade.trade_id.clone(),
            from_user_id: trade.from_user_id.clone(),
            to_user_id: trade.to_user_id.clone(),
            commodity_id: trade.commodity_id.clone(),
            quantity: trade.quantity,
            price: trade.price,
            timestamp: completed_at,
        };
        tx.set_event(Event::new(TRADE_EXECUTED, &event)?);

        info!(%seller, %buyer, "trade executed");
        Ok(trade)
    }

    #[instrument(skip(self, tx))]
    pub fn reject(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        let mut trade = self.load_pending(tx, trade_id)?;

        trade.status = TradeStatus::Rejected;
        trade.completed_at = Some(tx.timestamp());
        tx.put_record(&keys::trade(trade_id), &trade)?;

        info!("trade rejected");
        Ok(trade)
    }

    pub fn status(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        tx.get_record(&keys::trade(trade_id))?
            .ok_or_else(|| LedgerError::not_found("trade", trade_id))
    }

    /// Trades where `user_id` is either party, ordered by trade id.
    pub fn history_for_user(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Vec<Trade>> {
        let mut trades = BTreeMap::new();

        for (_, trade_id) in tx.scan_prefix(&keys::trade_index_of(user_id))? {
            let trade_id = String::from_utf8(trade_id).map_err(LedgerError::codec)?;
            let trade = self.status(tx, &trade_id)?;
            if trade.involves(user_id) {
                trades.insert(trade_id, trade);
            }
        }

        Ok(trades.into_values().collect())
    }

    fn load_pending(&self, tx: &mut TxContext<'_>, trade_id: &str) -> Result<Trade> {
        let trade = self.status(tx, trade_id)?;
        if !trade.is_pending() {
            return Err(LedgerError::InvalidState {
                trade_id: trade_id.to_string(),
                status: trade.status.to_string(),
            });
        }
        Ok(trade)
    }

    fn check_feasible(&self, tx: &mut TxContext<'_>, trade: &Trade) -> Result<()> {
        let parties = trade.parties();

        let stock = self
            .holdings
            .holding(tx, parties.seller, &trade.commodity_id)?;
        if stock.quantity < trade.quantity {
            return Err(LedgerError::InsufficientInventory {
                user_id: parties.seller.to_string(),
                commodity_id: trade.commodity_id.clone(),
                required: trade.quantity,
                available: stock.quantity,
            });
        }

        let funds = self.balances.account(tx, parties.buyer)?;
        if funds.balance < trade.price {
            return Err(LedgerError::InsufficientFunds {
                user_id: parties.buyer.to_string(),
                required: trade.price.to_string(),
                available: funds.balance.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use crate::trade::Action;
    use crate::types::{Amount, TimeStamp};

    fn setup(tx: &mut TxContext<'_>) {
        AccountLedger
            .initialize(tx, "u1", Amount::from(1000))
            .unwrap();
        AccountLedger
            .initialize(tx, "u2", Amount::from(1000))
            .unwrap();
        InventoryLedger
            .adjust(tx, "u2", "c1", 10, Op::Credit)
            .unwrap();
    }

    fn buy(trade_id: &str, quantity: u64, price: i64) -> TradeProposal {
        TradeProposal::new()
            .set_trade_id(trade_id)
            .set_from_user("u1")
            .set_to_user("u2")
            .set_commodity("c1")
            .set_quantity(quantity)
            .set_price(Amount::from(price))
            .set_action(Action::Buy)
    }

    #[test]
    fn propose_and_execute_moves_stock_and_funds() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        setup(&mut tx);
        let engine = TradeEngine::default();

        let trade = engine.propose(&mut tx, buy("t1", 5, 100)).unwrap();
        assert_eq!(trade.status, TradeStatus::Pending);

        let trade = engine.execute(&mut tx, "t1").unwrap();
        assert_eq!(trade.status, TradeStatus::Successful);
        assert!(trade.completed_at.is_some());

        assert_eq!(AccountLedger.get(&mut tx, "u1").unwrap().balance, Amount::from(900));
        assert_eq!(AccountLedger.get(&mut tx, "u2").unwrap().balance, Amount::from(1100));
        assert_eq!(InventoryLedger.get(&mut tx, "u1", "c1").unwrap().quantity, 5);
        assert_eq!(InventoryLedger.get(&mut tx, "u2", "c1").unwrap().quantity, 5);

        let ws = tx.into_write_set();
        assert_eq!(ws.events().len(), 1);
        assert_eq!(ws.events()[0].name, TRADE_EXECUTED);
        assert_eq!(ws.events()[0].payload["quantity"], 5);
    }

    #[test]
    fn terminal_trades_cannot_move() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        setup(&mut tx);
        let engine = TradeEngine::default();

        engine.propose(&mut tx, buy("t1", 5, 100)).unwrap();
        engine.reject(&mut tx, "t1").unwrap();

        assert_eq!(
            engine.execute(&mut tx, "t1").unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            engine.reject(&mut tx, "t1").unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn duplicate_trade_id_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        setup(&mut tx);
        let engine = TradeEngine::default();

        engine.propose(&mut tx, buy("t1", 5, 100)).unwrap();
        assert_eq!(
            engine.propose(&mut tx, buy("t1", 1, 1)).unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn self_trade_conserves_holdings() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        setup(&mut tx);
        let engine = TradeEngine::default();

        let proposal = TradeProposal::new()
            .set_trade_id("t1")
            .set_from_user("u2")
            .set_to_user("u2")
            .set_commodity("c1")
            .set_quantity(4)
            .set_price(Amount::from(50))
            .set_action(Action::Sell);
        engine.propose(&mut tx, proposal).unwrap();
        engine.execute(&mut tx, "t1").unwrap();

        assert_eq!(AccountLedger.get(&mut tx, "u2").unwrap().balance, Amount::from(1000));
        assert_eq!(InventoryLedger.get(&mut tx, "u2", "c1").unwrap().quantity, 10);
        assert_eq!(engine.history_for_user(&mut tx, "u2").unwrap().len(), 1);
    }

    #[test]
    fn history_keeps_ids_with_underscores_apart() {
        let store = MemoryStore::new();
        let mut tx = TxContext::new(&store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        let engine = TradeEngine::default();
        for user_id in ["u1", "u1_x", "v"] {
            AccountLedger
                .initialize(&mut tx, user_id, Amount::from(100))
                .unwrap();
        }
        InventoryLedger.adjust(&mut tx, "v", "c1", 10, Op::Credit).unwrap();

        for (trade_id, buyer) in [("x_t", "u1"), ("t", "u1_x")] {
            let proposal = TradeProposal::new()
                .set_trade_id(trade_id)
                .set_from_user(buyer)
                .set_to_user("v")
                .set_commodity("c1")
                .set_quantity(1)
                .set_price(Amount::from(1))
                .set_action(Action::Buy);
            engine.propose(&mut tx, proposal).unwrap();
        }

        let ids = |trades: Vec<Trade>| trades.into_iter().map(|t| t.trade_id).collect::<Vec<_>>();
        assert_eq!(ids(engine.history_for_user(&mut tx, "u1").unwrap()), ["x_t"]);
        assert_eq!(ids(engine.history_for_user(&mut tx, "u1_x").unwrap()), ["t"]);
        assert_eq!(ids(engine.history_for_user(&mut tx, "v").unwrap()), ["t", "x_t"]);
    }
}
