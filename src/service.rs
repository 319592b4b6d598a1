//! Service layer: the commit boundary around contract calls.
//!
//! Every submission runs against a fresh [`TxContext`]. Only when the
//! operation returns `Ok` is its write set applied to the store, in one
//! atomic batch, and only then are its events handed to the sinks.
use super::config::LedgerConfig;
use super::context::{TxContext, WriteSet};
use super::contract::Contract;
use super::error::Result;
use super::events::{Event, EventSink};
use super::store::{SledStore, StateStore};
use super::types::TimeStamp;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// What a committed transaction touched, and the digest of what it wrote.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub timestamp: TimeStamp<Utc>,
    pub digest: String,
    pub read_keys: Vec<String>,
    pub range_reads: Vec<String>,
    pub write_keys: Vec<String>,
    pub events: Vec<Event>,
}

impl Receipt {
    fn from_write_set(write_set: &WriteSet) -> Result<Self> {
        Ok(Self {
            timestamp: write_set.timestamp().clone(),
            digest: write_set.digest()?,
            read_keys: write_set.read_keys(),
            range_reads: write_set.range_reads(),
            write_keys: write_set.write_keys(),
            events: write_set.events().to_vec(),
        })
    }
}

pub struct LedgerService<S: StateStore = SledStore> {
    store: S,
    contract: Contract,
    sinks: Vec<Box<dyn EventSink>>,
    // one submission at a time so read-validate-write cannot interleave
    commit_lock: Mutex<()>,
}

impl LedgerService<SledStore> {
    /// Open the sled database described by `config`, seeding the default
    /// catalog if asked to.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let service = Self::new(SledStore::open(config)?);

        if config.seed_catalog {
            // fixed timestamp so every replica seeds identical records
            let epoch = TimeStamp::from_unix(0, 0)?;
            let (created, _) =
                service.submit(epoch, |contract, tx| contract.initialize_commodities(tx))?;
            info!(created = created.len(), "default catalog seeded");
        }

        Ok(service)
    }
}

impl<S: StateStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            contract: Contract::new(),
            sinks: vec![],
            commit_lock: Mutex::new(()),
        }
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `op` as one transaction and commit it if it succeeds. On error
    /// nothing it staged is applied and no event is published.
    #[instrument(skip_all, fields(timestamp = %timestamp))]
    pub fn submit<T, F>(&self, timestamp: TimeStamp<Utc>, op: F) -> Result<(T, Receipt)>
    where
        F: FnOnce(&Contract, &mut TxContext<'_>) -> Result<T>,
    {
        let guard = self.commit_lock.lock();

        let mut tx = TxContext::new(&self.store, timestamp);
        let value = match op(&self.contract, &mut tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "transaction aborted, write set discarded");
                return Err(err);
            }
        };

        let write_set = tx.into_write_set();
        let receipt = Receipt::from_write_set(&write_set)?;
        if !write_set.is_empty() {
            self.store.apply(&write_set)?;
        }

        // still under the commit lock, so sinks see events in commit order
        for event in write_set.events() {
            for sink in &self.sinks {
                sink.publish(event);
            }
        }
        drop(guard);

        info!(
            digest = %receipt.digest,
            writes = receipt.write_keys.len(),
            events = receipt.events.len(),
            "transaction committed"
        );
        Ok((value, receipt))
    }

    /// Run `op` read-only. Anything it stages is dropped.
    pub fn evaluate<T, F>(&self, timestamp: TimeStamp<Utc>, op: F) -> Result<T>
    where
        F: FnOnce(&Contract, &mut TxContext<'_>) -> Result<T>,
    {
        let mut tx = TxContext::new(&self.store, timestamp);
        let value = op(&self.contract, &mut tx)?;

        let write_set = tx.into_write_set();
        if !write_set.is_empty() {
            debug!(
                writes = write_set.write_keys().len(),
                "evaluation staged writes, discarding"
            );
        }
        Ok(value)
    }

    /// Submit a string-typed call, see [`Contract::invoke`].
    pub fn invoke(
        &self,
        timestamp: TimeStamp<Utc>,
        function: &str,
        args: &[String],
    ) -> Result<(Value, Receipt)> {
        self.submit(timestamp, |contract, tx| contract.invoke(tx, function, args))
    }

    /// Evaluate a string-typed call without committing it.
    pub fn query(
        &self,
        timestamp: TimeStamp<Utc>,
        function: &str,
        args: &[String],
    ) -> Result<Value> {
        self.evaluate(timestamp, |contract, tx| contract.invoke(tx, function, args))
    }
}
