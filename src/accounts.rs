//! Account ledger: the only code allowed to change a user's balance
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::keys;
use super::types::{Amount, Op, TimeStamp};
use chrono::Utc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[n(0)]
    pub user_id: String,
    #[n(1)]
    pub balance: Amount,
    #[n(2)]
    pub updated_at: TimeStamp<Utc>,
}

/// Balance access as seen by the trade and redemption engines.
pub trait Balances {
    fn account(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Account>;
    fn adjust_balance(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        amount: Amount,
        op: Op,
    ) -> Result<Account>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AccountLedger;

impl AccountLedger {
    /// Create the account for `user_id`. Each user is initialised exactly once.
    #[instrument(skip(self, tx))]
    pub fn initialize(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        initial_balance: Amount,
    ) -> Result<Account> {
        if user_id.is_empty() {
            return Err(LedgerError::invalid("user id is empty"));
        }
        if initial_balance.is_negative() {
            return Err(LedgerError::invalid(format!(
                "initial balance must be non-negative, got {initial_balance}"
            )));
        }

        let key = keys::user_asset(user_id);
        if tx.exists(&key)? {
            return Err(LedgerError::already_exists("user", user_id));
        }

        let account = Account {
            user_id: user_id.to_string(),
            balance: initial_balance,
            updated_at: tx.timestamp(),
        };
        tx.put_record(&key, &account)?;

        info!(user_id, balance = %initial_balance, "account initialized");
        Ok(account)
    }

    pub fn get(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Account> {
        tx.get_record(&keys::user_asset(user_id))?
            .ok_or_else(|| LedgerError::not_found("user asset", user_id))
    }

    #[instrument(skip(self, tx))]
    pub fn adjust(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        amount: Amount,
        op: Op,
    ) -> Result<Account> {
        if amount.is_negative() {
            return Err(LedgerError::invalid(format!(
                "amount must be non-negative, got {amount}"
            )));
        }

        let mut account = self.get(tx, user_id)?;
        account.balance = match op {
            Op::Credit => account.balance.checked_add(amount)?,
            Op::Debit => {
                if account.balance < amount {
                    return Err(LedgerError::InsufficientFunds {
                        user_id: user_id.to_string(),
                        required: amount.to_string(),
                        available: account.balance.to_string(),
                    });
                }
                account.balance.checked_sub(amount)?
            }
        };
        account.updated_at = tx.timestamp();
        tx.put_record(&keys::user_asset(user_id), &account)?;

        debug!(user_id, %op, %amount, balance = %account.balance, "balance adjusted");
        Ok(account)
    }
}

impl Balances for AccountLedger {
    fn account(&self, tx: &mut TxContext<'_>, user_id: &str) -> Result<Account> {
        self.get(tx, user_id)
    }

    fn adjust_balance(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        amount: Amount,
        op: Op,
    ) -> Result<Account> {
        self.adjust(tx, user_id, amount, op)
    }
}
