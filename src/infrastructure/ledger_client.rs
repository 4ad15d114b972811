use crate::domain::errors::LedgerClientError;
use serde::{Deserialize, Serialize};

/// Status value the explorer reports for a successful call.
pub const STATUS_OK: &str = "1";

/// A transaction as reported by the remote explorer, every field string encoded.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTransaction {
    pub block_number: String,
    pub time_stamp: String,
    pub hash: String,
    pub nonce: String,
    pub block_hash: String,
    pub transaction_index: String,
    pub from: String,
    pub to: String,
    /// Amount in base units
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub is_error: String,
    #[serde(rename = "txreceipt_status")]
    pub txreceipt_status: String,
    pub input: String,
    pub contract_address: String,
    pub cumulative_gas_used: String,
    pub gas_used: String,
    pub confirmations: String,
}

/// One page of an address's history, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerPage {
    /// Application-level status reported inside the payload
    pub status: String,
    /// Human readable message accompanying the status
    pub message: String,
    pub transactions: Vec<RawTransaction>,
}

impl LedgerPage {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// A client for the remote explorer holding an address's transaction history.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LedgerClient {
    /// Fetches a single bounded page of transactions for `address`, newest first.
    ///
    /// # Arguments
    ///
    /// * `address` - The chain address whose history is requested.
    ///
    /// # Returns
    ///
    /// * `Result<LedgerPage, LedgerClientError>` - The page if the explorer answered with a
    ///   well formed payload, even when that payload carries an error status. Transport
    ///   failures, non-2xx responses and undecodable bodies are errors.
    async fn get_transactions(&self, address: &str) -> Result<LedgerPage, LedgerClientError>;
}
