use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::transaction::TransactionStatus;

pub type Result<T> = std::result::Result<T, WalletError>;

/// Every failure the ledger can report to its caller.
///
/// The business variants are recoverable and typed; infrastructure faults
/// (I/O, storage, serialization) are kept separate so callers can tell a
/// rejected operation from a broken store.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("transaction {0} already exists")]
    TransactionExists(Uuid),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("{actor} is not the sender of transaction {id}")]
    NotAuthorized { actor: String, id: Uuid },

    #[error("transaction {id} is {status}, expected pending")]
    InvalidState {
        id: Uuid,
        status: TransactionStatus,
    },

    #[error("insufficient balance for {login}: available {available}, requested {requested}")]
    DeficientBalance {
        login: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("bad credentials for {0}")]
    BadCredentials(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}
