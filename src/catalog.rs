//! Commodity catalog
use super::context::TxContext;
use super::error::{LedgerError, Result};
use super::keys;
use super::metadata::Metadata;
use super::types::TimeStamp;
use chrono::Utc;
use tracing::{debug, info, instrument};

/// The fixed starter catalog: (id, name, metadata JSON).
pub const DEFAULT_COMMODITIES: [(&str, &str, &str); 8] = [
    ("1", "Gold", r#"{"imageUrl": "/images/gold.png"}"#),
    ("2", "Silver", r#"{"imageUrl": "/images/silver.png"}"#),
    ("3", "Crude Oil", r#"{"imageUrl": "/images/oil.png"}"#),
    ("4", "Natural Gas", r#"{"imageUrl": "/images/gas.png"}"#),
    ("5", "Corn", r#"{"imageUrl": "/images/corn.png"}"#),
    ("6", "Wheat", r#"{"imageUrl": "/images/wheat.png"}"#),
    ("7", "Coffee", r#"{"imageUrl": "/images/coffee.png"}"#),
    ("8", "Sugar", r#"{"imageUrl": "/images/sugar.png"}"#),
];

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commodity {
    #[n(0)]
    pub commodity_id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    #[serde(skip_serializing_if = "Metadata::is_null")]
    pub metadata: Metadata,
    #[n(3)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommodityCatalog;

impl CommodityCatalog {
    #[instrument(skip(self, tx, metadata))]
    pub fn create(
        &self,
        tx: &mut TxContext<'_>,
        commodity_id: &str,
        name: &str,
        metadata: Metadata,
    ) -> Result<Commodity> {
        if commodity_id.is_empty() {
            return Err(LedgerError::invalid("commodity id is empty"));
        }

        let key = keys::commodity(commodity_id);
        if tx.exists(&key)? {
            return Err(LedgerError::already_exists("commodity", commodity_id));
        }

        let commodity = Commodity {
            commodity_id: commodity_id.to_string(),
            name: name.to_string(),
            metadata,
            created_at: tx.timestamp(),
        };
        tx.put_record(&key, &commodity)?;

        info!(commodity_id, name, "commodity created");
        Ok(commodity)
    }

    pub fn get(&self, tx: &mut TxContext<'_>, commodity_id: &str) -> Result<Commodity> {
        tx.get_record(&keys::commodity(commodity_id))?
            .ok_or_else(|| LedgerError::not_found("commodity", commodity_id))
    }

    pub fn get_all(&self, tx: &mut TxContext<'_>) -> Result<Vec<Commodity>> {
        tx.scan_records(keys::COMMODITY_PREFIX)
    }

    /// Create whatever part of [`DEFAULT_COMMODITIES`] is missing and return
    /// the ids that were created. Safe to run repeatedly: an existing
    /// commodity is skipped, any other failure aborts the call.
    #[instrument(skip(self, tx))]
    pub fn seed_defaults(&self, tx: &mut TxContext<'_>) -> Result<Vec<String>> {
        let mut created = vec![];

        for (id, name, metadata) in DEFAULT_COMMODITIES {
            let metadata = Metadata::parse_json(metadata)?;
            match self.create(tx, id, name, metadata) {
                Ok(commodity) => created.push(commodity.commodity_id),
                Err(LedgerError::AlreadyExists { .. }) => {
                    debug!(commodity_id = id, "commodity already present, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(created)
    }
}
