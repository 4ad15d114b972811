use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::domain::errors::LedgerClientError;

use super::ledger_client::{LedgerClient, LedgerPage, RawTransaction};

/// A client for the Etherscan account API.
#[derive(Clone)]
pub struct EtherscanClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

/// Response envelope of the `txlist` action.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Option<EnvelopeResult>,
}

/// On errors Etherscan replaces the transaction list with a message string.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeResult {
    Transactions(Vec<RawTransaction>),
    Message(String),
}

impl EtherscanClient {
    /// Creates a new `EtherscanClient` from the startup configuration.
    ///
    /// No request timeout is set; callers needing bounded latency wrap the call.
    pub fn from_config(config: &Config) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.etherscan_url.clone(),
            api_key: config.etherscan_api_key.clone(),
            page_size: config.page_size,
        }
    }

    /// Decodes a `txlist` response body.
    pub fn parse_page(body: &str) -> Result<LedgerPage, LedgerClientError> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| LedgerClientError::UpstreamProtocol(e.to_string()))?;

        let transactions = match envelope.result {
            Some(EnvelopeResult::Transactions(txs)) => txs,
            Some(EnvelopeResult::Message(detail)) => {
                tracing::warn!("Etherscan result carried no transactions: {}", detail);
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(LedgerPage {
            status: envelope.status,
            message: envelope.message,
            transactions,
        })
    }
}

#[async_trait::async_trait]
impl LedgerClient for EtherscanClient {
    async fn get_transactions(&self, address: &str) -> Result<LedgerPage, LedgerClientError> {
        let page_size = self.page_size.to_string();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", page_size.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LedgerClientError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerClientError::UpstreamStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LedgerClientError::UpstreamUnavailable(e.to_string()))?;

        Self::parse_page(&body)
    }
}
