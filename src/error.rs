use crate::domain::payment::{PaymentStatus, PaymentType};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Decimal),
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("Balance overflow: {balance} cannot absorb {amount}")]
    BalanceOverflow { balance: Decimal, amount: Decimal },
    #[error("Account not found: {0}")]
    AccountNotFound(u64),
    #[error("Account with tax id {0} already exists")]
    DuplicateAccount(String),
    #[error("Transfer payments require an idempotency key")]
    MissingIdempotencyKey,
    #[error("Unsupported payment type: {0:?}")]
    UnsupportedPaymentType(PaymentType),
    #[error("Write conflict: the record was modified concurrently")]
    WriteConflict,
    #[error("Payment record not found: {0}")]
    RecordNotFound(Uuid),
    #[error("Payment {id} is already {status:?}")]
    InvalidTransition { id: Uuid, status: PaymentStatus },
    #[error("Receiver call failed: {0}")]
    ExternalCallFailed(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Whether the failed step may be retried from a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PaymentError::WriteConflict)
    }
}
