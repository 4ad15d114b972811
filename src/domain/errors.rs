use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Account not found: {0}")]
    NotFound(String),
    #[error("Upstream ledger unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Upstream ledger returned a malformed payload: {0}")]
    UpstreamProtocol(String),
    #[error("Failed to persist reconciled state: {0}")]
    Storage(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerClientError {
    #[error("Failed to reach ledger endpoint: {0}")]
    UpstreamUnavailable(String),
    #[error("Unexpected status code: {0}")]
    UpstreamStatus(u16),
    #[error("Failed to decode ledger response: {0}")]
    UpstreamProtocol(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataStorageError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A malformed numeric or timestamp field that was replaced by a default value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionFallback {
    #[error("Malformed base-unit amount {0:?}")]
    Amount(String),
    #[error("Malformed epoch timestamp {0:?}")]
    Timestamp(String),
}

impl From<rusqlite::Error> for DataStorageError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DataStorageError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => DataStorageError::Storage(e.to_string()),
        }
    }
}

impl From<LedgerClientError> for ReconcileError {
    fn from(e: LedgerClientError) -> Self {
        match e {
            LedgerClientError::UpstreamUnavailable(_) | LedgerClientError::UpstreamStatus(_) => {
                ReconcileError::UpstreamUnavailable(e.to_string())
            }
            LedgerClientError::UpstreamProtocol(_) => ReconcileError::UpstreamProtocol(e.to_string()),
        }
    }
}

impl From<DataStorageError> for ReconcileError {
    fn from(e: DataStorageError) -> Self {
        match e {
            DataStorageError::AccountNotFound(handle) => ReconcileError::NotFound(handle),
            other => ReconcileError::Storage(other.to_string()),
        }
    }
}
