use crate::domain::{
    errors::{ConversionFallback, DataStorageError},
    models::{Account, Direction, SaveOutcome, Transaction, TransactionStore},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_uuid TEXT NOT NULL UNIQUE,
        address TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        amount TEXT NOT NULL,
        token TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        sender TEXT NOT NULL,
        receiver TEXT NOT NULL,
        type TEXT NOT NULL,
        tx_hash TEXT NOT NULL UNIQUE,
        account_id INTEGER NOT NULL REFERENCES accounts(id)
    );

    CREATE INDEX IF NOT EXISTS idx_transactions_account
        ON transactions(account_id, timestamp DESC);
";

const TRANSACTION_COLUMNS: &str =
    "tx_hash, account_id, amount, token, timestamp, sender, receiver, type";

/// Transaction store backed by a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`. `:memory:` opens a transient database.
    pub fn open(path: &str) -> Result<Self, DataStorageError> {
        tracing::info!("Opening transaction store at {}", path);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            tracing::warn!("Could not enable WAL journal mode on {}: {}", path, e);
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates the schema. Safe to run on an already migrated database.
    pub fn migrate(&self) -> Result<(), DataStorageError> {
        self.conn.lock().execute_batch(SCHEMA)?;
        tracing::info!("Database schema migrated successfully");
        Ok(())
    }
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        uuid: row.get(1)?,
        address: row.get(2)?,
    })
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let epoch: i64 = row.get(4)?;
    let timestamp = DateTime::<Utc>::from_timestamp(epoch, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Integer,
            Box::new(ConversionFallback::Timestamp(epoch.to_string())),
        )
    })?;
    let direction: String = row.get(7)?;
    let direction = direction
        .parse::<Direction>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        hash: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        token: row.get(3)?,
        timestamp,
        sender: row.get(5)?,
        receiver: row.get(6)?,
        direction,
    })
}

#[async_trait::async_trait]
impl TransactionStore for SqliteStore {
    async fn find_account_by_handle(&self, handle: &str) -> Result<Account, DataStorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, account_uuid, address FROM accounts WHERE account_uuid = ?1",
            params![handle],
            account_from_row,
        )
        .optional()?
        .ok_or_else(|| DataStorageError::AccountNotFound(handle.to_string()))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, DataStorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, account_uuid, address FROM accounts ORDER BY id")?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    async fn save_account(&self, uuid: &str, address: &str) -> Result<Account, DataStorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let by_uuid = tx
            .query_row(
                "SELECT id, account_uuid, address FROM accounts WHERE account_uuid = ?1",
                params![uuid],
                account_from_row,
            )
            .optional()?;
        if let Some(owner) = by_uuid {
            if owner.address == address {
                return Ok(owner);
            }
            return Err(DataStorageError::Conflict(format!(
                "account uuid {uuid} already belongs to {}",
                owner.address
            )));
        }

        let by_address = tx
            .query_row(
                "SELECT id, account_uuid, address FROM accounts WHERE address = ?1",
                params![address],
                account_from_row,
            )
            .optional()?;

        let account = match by_address {
            Some(mut account) => {
                tracing::info!("Updating account {} uuid to {}", address, uuid);
                tx.execute(
                    "UPDATE accounts SET account_uuid = ?1 WHERE id = ?2",
                    params![uuid, account.id],
                )?;
                account.uuid = uuid.to_string();
                account
            }
            None => {
                tx.execute(
                    "INSERT INTO accounts (account_uuid, address) VALUES (?1, ?2)",
                    params![uuid, address],
                )?;
                Account {
                    id: tx.last_insert_rowid(),
                    uuid: uuid.to_string(),
                    address: address.to_string(),
                }
            }
        };

        tx.commit()?;
        Ok(account)
    }

    async fn transaction_exists(&self, hash: &str) -> Result<bool, DataStorageError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE tx_hash = ?1)",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn save_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<SaveOutcome, DataStorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "INSERT INTO transactions
                (tx_hash, account_id, amount, token, timestamp, sender, receiver, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(tx_hash) DO NOTHING",
            params![
                transaction.hash,
                transaction.account_id,
                transaction.amount,
                transaction.token,
                transaction.timestamp.timestamp(),
                transaction.sender,
                transaction.receiver,
                transaction.direction.as_str(),
            ],
        )?;

        if changed == 0 {
            tracing::warn!("Transaction already exists: {}", transaction.hash);
            return Ok(SaveOutcome::AlreadyExists);
        }
        Ok(SaveOutcome::Inserted)
    }

    async fn get_transaction(&self, hash: &str) -> Result<Transaction, DataStorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE tx_hash = ?1"),
            params![hash],
            transaction_from_row,
        )
        .optional()?
        .ok_or_else(|| DataStorageError::TransactionNotFound(hash.to_string()))
    }

    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Transaction>, DataStorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE account_id = ?1 ORDER BY timestamp DESC, id ASC"
        ))?;
        let transactions = stmt
            .query_map(params![account_id], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }
}
