//! Error taxonomy shared by every ledger operation

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("insufficient balance for user {user_id} (required: {required}, available: {available})")]
    InsufficientFunds {
        user_id: String,
        required: String,
        available: String,
    },
    #[error(
        "insufficient inventory for user {user_id}, commodity {commodity_id} (required: {required}, available: {available})"
    )]
    InsufficientInventory {
        user_id: String,
        commodity_id: String,
        required: u64,
        available: u64,
    },
    #[error("trade {trade_id} is not pending (status: {status})")]
    InvalidState { trade_id: String, status: String },
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode or decode record: {0}")]
    Codec(String),
}

/// Fieldless view of [`LedgerError`], handy for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    InsufficientFunds,
    InsufficientInventory,
    InvalidState,
    Storage,
    Codec,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            LedgerError::InvalidState { .. } => ErrorKind::InvalidState,
            LedgerError::Storage(_) => ErrorKind::Storage,
            LedgerError::Codec(_) => ErrorKind::Codec,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }

    pub(crate) fn codec(err: impl std::fmt::Display) -> Self {
        LedgerError::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(value: serde_json::Error) -> Self {
        LedgerError::Codec(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = LedgerError::not_found("trade", "t1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "trade not found: t1");

        let err = LedgerError::already_exists("user", "u1");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.to_string(), "user u1 already exists");
    }
}
