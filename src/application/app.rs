use std::sync::Arc;

use super::reconciler::LedgerReconciler;
use super::Reconciler;
use crate::config::Config;
use crate::domain::errors::{DataStorageError, ReconcileError};
use crate::domain::models::{Account, ReconciledPage, TransactionStore};
use crate::infrastructure::etherscan_client::EtherscanClient;
use crate::infrastructure::sqlite::SqliteStore;

#[async_trait::async_trait]
pub trait Application {
    async fn get_accounts(&self) -> Result<Vec<Account>, DataStorageError>;
    async fn get_account_transactions(
        &self,
        account_uuid: &str,
    ) -> Result<ReconciledPage, ReconcileError>;
}

pub struct App<R, D> {
    reconciler: R,
    database: Arc<D>,
}

impl App<LedgerReconciler<EtherscanClient, SqliteStore>, SqliteStore> {
    pub fn new(config: &Config, database: Arc<SqliteStore>) -> Self {
        let reconciler = LedgerReconciler::builder()
            .ledger_client(EtherscanClient::from_config(config))
            .database(database.clone())
            .build();
        Self::with_parts(reconciler, database)
    }
}

impl<R, D> App<R, D> {
    pub fn with_parts(reconciler: R, database: Arc<D>) -> Self {
        Self {
            reconciler,
            database,
        }
    }
}

#[async_trait::async_trait]
impl<R, D> Application for App<R, D>
where
    R: Reconciler + Send + Sync + 'static,
    D: TransactionStore + Send + Sync + 'static,
{
    async fn get_accounts(&self) -> Result<Vec<Account>, DataStorageError> {
        tracing::info!("Getting all accounts ...");
        self.database.list_accounts().await
    }

    async fn get_account_transactions(
        &self,
        account_uuid: &str,
    ) -> Result<ReconciledPage, ReconcileError> {
        tracing::info!("Getting transactions for account {}", account_uuid);
        self.reconciler.reconcile(account_uuid).await
    }
}
