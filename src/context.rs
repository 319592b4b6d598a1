//! Transaction context: one logical unit of work against a state snapshot.
//!
//! Writes are staged in memory and only reach the store when the service
//! commits the resulting [`WriteSet`]. Reads see the transaction's own staged
//! writes first, so a multi-step operation observes its earlier steps. If an
//! operation returns an error the context is dropped and nothing is applied.
use super::error::{LedgerError, Result};
use super::events::Event;
use super::store::StateStore;
use super::types::TimeStamp;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

pub struct TxContext<'a> {
    store: &'a dyn StateStore,
    timestamp: TimeStamp<Utc>,
    writes: BTreeMap<String, Vec<u8>>,
    reads: BTreeSet<String>,
    range_reads: BTreeSet<String>,
    events: Vec<Event>,
}

impl<'a> TxContext<'a> {
    pub fn new(store: &'a dyn StateStore, timestamp: TimeStamp<Utc>) -> Self {
        Self {
            store,
            timestamp,
            writes: BTreeMap::new(),
            reads: BTreeSet::new(),
            range_reads: BTreeSet::new(),
            events: vec![],
        }
    }

    /// The deterministic transaction timestamp. The only clock the ledger uses.
    pub fn timestamp(&self) -> TimeStamp<Utc> {
        self.timestamp.clone()
    }

    pub fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(Some(staged.clone()));
        }
        self.reads.insert(key.to_string());
        self.store.get(key)
    }

    pub fn exists(&mut self, key: &str) -> Result<bool> {
        Ok(self.get_state(key)?.is_some())
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.writes.insert(key.to_string(), value);
    }

    /// Ordered prefix scan with staged writes layered over committed state.
    pub fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut merged: BTreeMap<String, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();

        let staged = self
            .writes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in staged {
            merged.insert(key.clone(), value.clone());
        }

        self.range_reads.insert(prefix.to_string());
        Ok(merged.into_iter().collect())
    }

    pub fn get_record<T>(&mut self, key: &str) -> Result<Option<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.get_state(key)? {
            Some(bytes) => minicbor::decode(&bytes)
                .map(Some)
                .map_err(LedgerError::codec),
            None => Ok(None),
        }
    }

    pub fn put_record<T>(&mut self, key: &str, record: &T) -> Result<()>
    where
        T: minicbor::Encode<()>,
    {
        let bytes = minicbor::to_vec(record).map_err(LedgerError::codec)?;
        self.put_state(key, bytes);
        Ok(())
    }

    pub fn scan_records<T>(&mut self, prefix: &str) -> Result<Vec<T>>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        self.scan_prefix(prefix)?
            .iter()
            .map(|(_, bytes)| minicbor::decode(bytes).map_err(LedgerError::codec))
            .collect()
    }

    pub fn set_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn into_write_set(self) -> WriteSet {
        WriteSet {
            timestamp: self.timestamp,
            writes: self.writes,
            reads: self.reads,
            range_reads: self.range_reads,
            events: self.events,
        }
    }
}

/// Everything a finished transaction wants to change, plus the keys it
/// depended on so a host can validate it against concurrent transactions.
#[derive(Debug, Clone)]
pub struct WriteSet {
    timestamp: TimeStamp<Utc>,
    writes: BTreeMap<String, Vec<u8>>,
    reads: BTreeSet<String>,
    range_reads: BTreeSet<String>,
    events: Vec<Event>,
}

impl WriteSet {
    pub fn timestamp(&self) -> &TimeStamp<Utc> {
        &self.timestamp
    }
    pub fn writes(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.writes.iter()
    }
    pub fn write_keys(&self) -> Vec<String> {
        self.writes.keys().cloned().collect()
    }
    pub fn read_keys(&self) -> Vec<String> {
        self.reads.iter().cloned().collect()
    }
    pub fn range_reads(&self) -> Vec<String> {
        self.range_reads.iter().cloned().collect()
    }
    pub fn events(&self) -> &[Event] {
        &self.events
    }
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.events.is_empty()
    }

    /// SHA-256 over the canonical CBOR of the sorted writes and the events.
    /// Two executors that ran the same transaction on the same snapshot
    /// produce the same digest.
    pub fn digest(&self) -> Result<String> {
        let mut encoder = minicbor::Encoder::new(Vec::new());
        encoder
            .array(self.writes.len() as u64)
            .map_err(LedgerError::codec)?;
        for (key, value) in &self.writes {
            encoder
                .array(2)
                .and_then(|e| e.str(key))
                .and_then(|e| e.bytes(value))
                .map_err(LedgerError::codec)?;
        }

        encoder
            .array(self.events.len() as u64)
            .map_err(LedgerError::codec)?;
        for event in &self.events {
            let payload = serde_json::to_string(&event.payload)?;
            encoder
                .array(2)
                .and_then(|e| e.str(&event.name))
                .and_then(|e| e.str(&payload))
                .map_err(LedgerError::codec)?;
        }

        let cbor = encoder.into_writer();
        Ok(sha256::digest(&cbor))
    }
}
