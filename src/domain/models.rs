use super::errors::DataStorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol of the chain's native asset.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Fractional digits between wei and ether.
pub const NATIVE_DECIMALS: u32 = 18;

/// An account whose history is reconciled against the remote ledger.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Account {
    /// Internal storage key
    pub id: i64,
    /// Externally visible account handle
    pub uuid: String,
    /// Chain address, unique across accounts
    pub address: String,
}

/// Direction of a transaction relative to the owning account.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl Direction {
    /// A transaction is a deposit when the account is its receiver.
    /// Addresses are compared exactly as returned by the ledger.
    pub fn classify(account_address: &str, receiver: &str) -> Self {
        if account_address == receiver {
            Direction::Deposit
        } else {
            Direction::Withdrawal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Deposit => "deposit",
            Direction::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = DataStorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Direction::Deposit),
            "withdrawal" => Ok(Direction::Withdrawal),
            other => Err(DataStorageError::Storage(format!(
                "unknown transaction type {other:?}"
            ))),
        }
    }
}

/// A transaction observed on the remote ledger and owned by an account.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Chain-level transaction hash, unique
    pub hash: String,
    /// Internal key of the owning account
    pub account_id: i64,
    /// Display amount with 18 fractional digits
    pub amount: String,
    /// Token symbol, always the native asset
    pub token: String,
    /// Block time of the transaction
    pub timestamp: DateTime<Utc>,
    /// Sender address
    pub sender: String,
    /// Receiver address
    pub receiver: String,
    /// Direction relative to the owning account
    pub direction: Direction,
}

/// Result of a redundant-safe save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    AlreadyExists,
}

/// Freshest remote view of an account, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciledPage {
    pub account: Account,
    pub transactions: Vec<Transaction>,
    /// Number of transactions written during this reconciliation
    pub persisted: usize,
}

impl ReconciledPage {
    pub fn count(&self) -> usize {
        self.transactions.len()
    }
}

/// Trait for account and transaction persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TransactionStore {
    /// Resolves an account by its external handle.
    async fn find_account_by_handle(&self, handle: &str) -> Result<Account, DataStorageError>;

    /// Retrieves all accounts ordered by internal key.
    async fn list_accounts(&self) -> Result<Vec<Account>, DataStorageError>;

    /// Creates the account, or corrects the handle of the account owning `address`.
    async fn save_account(&self, uuid: &str, address: &str) -> Result<Account, DataStorageError>;

    /// Checks whether a transaction with this hash has been stored.
    async fn transaction_exists(&self, hash: &str) -> Result<bool, DataStorageError>;

    /// Stores a transaction. Saving an already known hash is a no-op.
    async fn save_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<SaveOutcome, DataStorageError>;

    /// Retrieves a stored transaction by hash.
    ///
    /// Read-back surface for inspecting stored state; reconciliation never calls it.
    async fn get_transaction(&self, hash: &str) -> Result<Transaction, DataStorageError>;

    /// Retrieves the stored transactions of an account, newest first.
    ///
    /// Read-back surface like [`TransactionStore::get_transaction`].
    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, DataStorageError>;
}
