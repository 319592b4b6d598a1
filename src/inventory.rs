//! Inventory ledger: per (user, commodity) quantities
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::keys;
use super::types::{Op, Quantity, TimeStamp};
use chrono::Utc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    #[n(0)]
    pub user_id: String,
    #[n(1)]
    pub commodity_id: String,
    #[n(2)]
    pub quantity: Quantity,
    #[n(3)]
    pub updated_at: TimeStamp<Utc>,
}

/// Inventory access as seen by the trade and redemption engines.
pub trait Holdings {
    fn holding(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
    ) -> Result<InventoryEntry>;
    fn adjust_holding(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
        quantity: Quantity,
        op: Op,
    ) -> Result<InventoryEntry>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryLedger;

impl InventoryLedger {
    /// Read an entry. A missing entry reads as quantity zero and is not
    /// written back.
    ///
    /// Ids joined by `_` can name the same key, (`u1`, `x_c`) and
    /// (`u1_x`, `c`) for instance. The entry stored there belongs to
    /// whichever pair wrote it first and the other pair gets InvalidArgument.
    pub fn get(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
    ) -> Result<InventoryEntry> {
        let key = keys::inventory(user_id, commodity_id);
        match tx.get_record::<InventoryEntry>(&key)? {
            Some(entry) if entry.user_id != user_id || entry.commodity_id != commodity_id => {
                Err(LedgerError::invalid(format!(
                    "inventory key {key} is held by user {}, commodity {}",
                    entry.user_id, entry.commodity_id
                )))
            }
            Some(entry) => Ok(entry),
            None => Ok(InventoryEntry {
                user_id: user_id.to_string(),
                commodity_id: commodity_id.to_string(),
                quantity: 0,
                updated_at: tx.timestamp(),
            }),
        }
    }

    /// Every non-empty holding of `user_id`, in key order.
    pub fn get_all_for_user(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
    ) -> Result<Vec<InventoryEntry>> {
        let entries: Vec<InventoryEntry> = tx.scan_records(&keys::inventory_of(user_id))?;

        // the prefix also matches users whose id extends this one
        Ok(entries
            .into_iter()
            .filter(|entry| entry.user_id == user_id && entry.quantity > 0)
            .collect())
    }

    #[instrument(skip(self, tx))]
    pub fn adjust(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
        quantity: Quantity,
        op: Op,
    ) -> Result<InventoryEntry> {
        let mut entry = self.get(tx, user_id, commodity_id)?;

        entry.quantity = match op {
            Op::Credit => entry.quantity.checked_add(quantity).ok_or_else(|| {
                LedgerError::invalid(format!(
                    "inventory overflow for user {user_id}, commodity {commodity_id}"
                ))
            })?,
            Op::Debit => {
                if entry.quantity < quantity {
                    return Err(LedgerError::InsufficientInventory {
                        user_id: user_id.to_string(),
                        commodity_id: commodity_id.to_string(),
                        required: quantity,
                        available: entry.quantity,
                    });
                }
                entry.quantity - quantity
            }
        };
        entry.updated_at = tx.timestamp();
        tx.put_record(&keys::inventory(user_id, commodity_id), &entry)?;

        debug!(user_id, commodity_id, %op, quantity, total = entry.quantity, "inventory adjusted");
        Ok(entry)
    }
}

impl Holdings for InventoryLedger {
    fn holding(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
    ) -> Result<InventoryEntry> {
        self.get(tx, user_id, commodity_id)
    }

    fn adjust_holding(
        &self,
        tx: &mut TxContext<'_>,
        user_id: &str,
        commodity_id: &str,
        quantity: Quantity,
        op: Op,
    ) -> Result<InventoryEntry> {
        self.adjust(tx, user_id, commodity_id, quantity, op)
    }
}
