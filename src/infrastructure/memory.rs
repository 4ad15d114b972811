use crate::domain::{
    errors::DataStorageError,
    models::{Account, SaveOutcome, Transaction, TransactionStore},
};
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
pub struct InMemoryStore {
    accounts: DashMap<i64, Account>,
    // account uuid -> account id
    accounts_by_uuid: DashMap<String, i64>,
    // address -> account id
    accounts_by_address: DashMap<String, i64>,
    last_account_id: AtomicI64,
    account_writes: Mutex<()>,
    // tx hash -> transaction
    transactions: DashMap<String, Transaction>,
    // account id -> [tx hash] in insertion order
    transactions_by_account: DashMap<i64, Vec<String>>,
}

#[async_trait::async_trait]
impl TransactionStore for InMemoryStore {
    async fn find_account_by_handle(&self, handle: &str) -> Result<Account, DataStorageError> {
        // Index refs are released before touching `accounts`.
        let id = self.accounts_by_uuid.get(handle).map(|v| *v.value());
        id.and_then(|id| self.accounts.get(&id).map(|v| v.value().clone()))
            .ok_or_else(|| DataStorageError::AccountNotFound(handle.to_string()))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, DataStorageError> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|v| v.value().clone()).collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn save_account(&self, uuid: &str, address: &str) -> Result<Account, DataStorageError> {
        let _guard = self.account_writes.lock();

        let owner_id = self.accounts_by_uuid.get(uuid).map(|v| *v.value());
        if let Some(owner_id) = owner_id {
            let owner = self.accounts.get(&owner_id).map(|v| v.value().clone());
            if let Some(owner) = owner {
                if owner.address == address {
                    return Ok(owner);
                }
                return Err(DataStorageError::Conflict(format!(
                    "account uuid {uuid} already belongs to {}",
                    owner.address
                )));
            }
        }

        let existing_id = self.accounts_by_address.get(address).map(|v| *v.value());
        if let Some(id) = existing_id {
            let (previous_uuid, account) = {
                let mut account = self
                    .accounts
                    .get_mut(&id)
                    .ok_or_else(|| DataStorageError::Storage(format!("dangling account id {id}")))?;
                let previous_uuid = std::mem::replace(&mut account.uuid, uuid.to_string());
                (previous_uuid, account.clone())
            };
            tracing::info!("Updating account {} uuid to {}", address, uuid);
            self.accounts_by_uuid.remove(&previous_uuid);
            self.accounts_by_uuid.insert(uuid.to_string(), id);
            return Ok(account);
        }

        let id = self.last_account_id.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account {
            id,
            uuid: uuid.to_string(),
            address: address.to_string(),
        };
        self.accounts.insert(id, account.clone());
        self.accounts_by_uuid.insert(uuid.to_string(), id);
        self.accounts_by_address.insert(address.to_string(), id);
        Ok(account)
    }

    async fn transaction_exists(&self, hash: &str) -> Result<bool, DataStorageError> {
        Ok(self.transactions.contains_key(hash))
    }

    async fn save_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<SaveOutcome, DataStorageError> {
        let hash = transaction.hash.clone();
        let account_id = transaction.account_id;

        match self.transactions.entry(hash.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!("Transaction already exists: {}", hash);
                Ok(SaveOutcome::AlreadyExists)
            }
            Entry::Vacant(slot) => {
                slot.insert(transaction);
                self.transactions_by_account
                    .entry(account_id)
                    .or_default()
                    .push(hash);
                Ok(SaveOutcome::Inserted)
            }
        }
    }

    async fn get_transaction(&self, hash: &str) -> Result<Transaction, DataStorageError> {
        self.transactions
            .get(hash)
            .map(|v| v.value().clone())
            .ok_or_else(|| DataStorageError::TransactionNotFound(hash.to_string()))
    }

    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, DataStorageError> {
        let hashes = self
            .transactions_by_account
            .get(&account_id)
            .map(|v| v.value().clone())
            .unwrap_or_default();

        let mut transactions: Vec<Transaction> = hashes
            .iter()
            .filter_map(|hash| self.transactions.get(hash).map(|v| v.value().clone()))
            .collect();
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(transactions)
    }
}
