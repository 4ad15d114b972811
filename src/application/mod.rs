use crate::domain::{errors::ReconcileError, models::ReconciledPage};

pub mod app;
pub mod reconciler;

/// The `Reconciler` trait defines how an account's remote history is merged into
/// durable storage.
///
/// Implementors resolve the account, fetch the freshest page of its history from
/// the remote ledger, persist every transaction not seen before and return the
/// whole page ordered newest first.
///
/// # Errors
///
/// Unknown accounts, upstream failures and storage failures abort the whole call.
/// Malformed amounts and timestamps do not: they are replaced by zero values.
#[async_trait::async_trait]
pub trait Reconciler {
    async fn reconcile(&self, account_uuid: &str) -> Result<ReconciledPage, ReconcileError>;
}
