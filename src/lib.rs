pub mod accounts;
pub mod catalog;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod escrow;
pub mod events;
pub mod inventory;
pub mod keys;
pub mod metadata;
pub mod redemption;
pub mod service;
pub mod store;
pub mod trade;
pub mod types;
pub mod utils;

pub use config::LedgerConfig;
pub use context::{TxContext, WriteSet};
pub use contract::Contract;
pub use error::{ErrorKind, LedgerError, Result};
pub use service::{LedgerService, Receipt};
pub use store::{MemoryStore, SledStore, StateStore};
pub use types::{Amount, Op, Quantity, TimeStamp};
