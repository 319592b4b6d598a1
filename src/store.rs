//! The key-value state a transaction reads from and commits into.
//!
//! A [`StateStore`] only needs point reads, ordered prefix scans and the
//! ability to apply a whole [`WriteSet`] at once. Everything transactional
//! (staging, read-your-writes, rollback) lives in [`crate::context`].
use super::config::LedgerConfig;
use super::context::WriteSet;
use super::error::{LedgerError, Result};
use parking_lot::RwLock;
use sled::Batch;
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
    /// Apply every write in the set or none of them.
    fn apply(&self, write_set: &WriteSet) -> Result<()>;
}

pub struct SledStore {
    instance: Arc<sled::Db>,
    flush_on_commit: bool,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            instance,
            flush_on_commit: false,
        }
    }
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let db = config.to_sled().open()?;
        Ok(Self::new(Arc::new(db)).with_flush(config.flush_on_commit))
    }
    pub fn with_flush(mut self, flush_on_commit: bool) -> Self {
        self.flush_on_commit = flush_on_commit;
        self
    }
    pub fn instance(&self) -> &Arc<sled::Db> {
        &self.instance
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.instance.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.instance
            .scan_prefix(prefix.as_bytes())
            .map(|item| {
                let (key, value) = item?;
                let key = String::from_utf8(key.to_vec()).map_err(LedgerError::codec)?;
                Ok((key, value.to_vec()))
            })
            .collect()
    }

    fn apply(&self, write_set: &WriteSet) -> Result<()> {
        // one batch so sled applies the whole write set atomically
        let mut batch = Batch::default();
        for (key, value) in write_set.writes() {
            batch.insert(key.as_bytes(), value.as_slice());
        }
        self.instance.apply_batch(batch)?;

        if self.flush_on_commit {
            self.instance.flush()?;
        }
        Ok(())
    }
}

/// In-process store, mostly useful for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn apply(&self, write_set: &WriteSet) -> Result<()> {
        let mut entries = self.entries.write();
        for (key, value) in write_set.writes() {
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxContext;
    use crate::types::TimeStamp;

    fn commit(store: &dyn StateStore, pairs: &[(&str, &[u8])]) {
        let mut tx = TxContext::new(store, TimeStamp::new_with(2024, 1, 1, 0, 0, 0).unwrap());
        for (key, value) in pairs {
            tx.put_state(key, value.to_vec());
        }
        store.apply(&tx.into_write_set()).unwrap();
    }

    fn check_prefix_scan(store: &dyn StateStore) {
        commit(
            store,
            &[
                ("inventory_u1_c2", b"b"),
                ("inventory_u1_c1", b"a"),
                ("inventory_u2_c1", b"c"),
                ("trade_t1", b"d"),
            ],
        );

        let scanned = store.scan_prefix("inventory_u1_").unwrap();
        let keys: Vec<_> = scanned.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["inventory_u1_c1", "inventory_u1_c2"]);
        assert_eq!(store.get("trade_t1").unwrap(), Some(b"d".to_vec()));
        assert_eq!(store.get("trade_t2").unwrap(), None);
    }

    #[test]
    fn memory_store_prefix_scan_is_ordered() {
        check_prefix_scan(&MemoryStore::new());
    }

    #[test]
    fn sled_store_prefix_scan_is_ordered() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        check_prefix_scan(&SledStore::new(Arc::new(db)));
    }
}
