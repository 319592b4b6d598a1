//! Configuration for opening a ledger on top of sled
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: PathBuf,
    // sled deletes a temporary database when the last handle drops
    pub temporary: bool,
    pub flush_on_commit: bool,
    pub cache_capacity: Option<u64>,
    pub seed_catalog: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("asset-ledger.db"),
            temporary: false,
            flush_on_commit: true,
            cache_capacity: None,
            seed_catalog: false,
        }
    }
}

impl LedgerConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
    pub fn set_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }
    pub fn set_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }
    pub fn set_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = Some(bytes);
        self
    }
    /// Seed the default commodity catalog when the ledger is opened.
    pub fn set_seed_catalog(mut self, seed: bool) -> Self {
        self.seed_catalog = seed;
        self
    }
    pub fn to_sled(&self) -> sled::Config {
        let config = sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary);

        match self.cache_capacity {
            Some(bytes) => config.cache_capacity(bytes),
            None => config,
        }
    }
}
