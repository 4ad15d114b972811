use super::Reconciler;
use crate::domain::{
    errors::ReconcileError,
    models::{
        Account, Direction, ReconciledPage, SaveOutcome, Transaction, TransactionStore,
        NATIVE_DECIMALS, NATIVE_SYMBOL,
    },
    units,
};
use crate::infrastructure::ledger_client::{LedgerClient, RawTransaction};
use std::sync::Arc;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct LedgerReconciler<C, D> {
    ledger_client: C,
    database: Arc<D>,
}

#[async_trait::async_trait]
impl<C, D> Reconciler for LedgerReconciler<C, D>
where
    C: LedgerClient + Send + Sync + 'static,
    D: TransactionStore + Send + Sync + 'static,
{
    async fn reconcile(&self, account_uuid: &str) -> Result<ReconciledPage, ReconcileError> {
        let account = self.database.find_account_by_handle(account_uuid).await?;

        let page = self.ledger_client.get_transactions(&account.address).await?;
        let raw_transactions = if page.is_ok() {
            page.transactions
        } else {
            tracing::warn!(
                "Ledger returned status {} ({}) for {}, treating as empty",
                page.status,
                page.message,
                account.address
            );
            Vec::new()
        };

        let mut transactions = Vec::with_capacity(raw_transactions.len());
        let mut persisted = 0;
        for raw in &raw_transactions {
            let transaction = convert(&account, raw);

            if !self.database.transaction_exists(&transaction.hash).await? {
                match self.database.save_transaction(transaction.clone()).await {
                    Ok(SaveOutcome::Inserted) => persisted += 1,
                    Ok(SaveOutcome::AlreadyExists) => {
                        tracing::debug!("Transaction {} stored concurrently", transaction.hash)
                    }
                    Err(e) => {
                        tracing::error!("Failed to save transaction {}: {}", transaction.hash, e);
                        return Err(e.into());
                    }
                }
            }

            transactions.push(transaction);
        }

        // Stable, so equal timestamps keep their source order.
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::info!(
            "Reconciled {} transactions for account {} ({} new)",
            transactions.len(),
            account.uuid,
            persisted
        );

        Ok(ReconciledPage {
            account,
            transactions,
            persisted,
        })
    }
}

fn convert(account: &Account, raw: &RawTransaction) -> Transaction {
    Transaction {
        hash: raw.hash.clone(),
        account_id: account.id,
        amount: units::to_display_amount_lossy(&raw.value, NATIVE_DECIMALS),
        token: NATIVE_SYMBOL.to_string(),
        timestamp: units::parse_epoch_lossy(&raw.time_stamp),
        sender: raw.from.clone(),
        receiver: raw.to.clone(),
        direction: Direction::classify(&account.address, &raw.to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DataStorageError, LedgerClientError};
    use crate::domain::models::MockTransactionStore;
    use crate::infrastructure::ledger_client::{LedgerPage, MockLedgerClient, STATUS_OK};
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::sqlite::SqliteStore;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed page per address and counts calls.
    #[derive(Default)]
    struct StaticLedger {
        pages: HashMap<String, LedgerPage>,
        calls: AtomicUsize,
    }

    impl StaticLedger {
        fn with_page(address: &str, transactions: Vec<RawTransaction>) -> Self {
            let mut pages = HashMap::new();
            pages.insert(
                address.to_string(),
                LedgerPage {
                    status: STATUS_OK.to_string(),
                    message: "OK".to_string(),
                    transactions,
                },
            );
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl LedgerClient for Arc<StaticLedger> {
        async fn get_transactions(&self, address: &str) -> Result<LedgerPage, LedgerClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages.get(address).cloned().unwrap_or_default())
        }
    }

    fn raw(hash: &str, from: &str, to: &str, epoch: &str, value: &str) -> RawTransaction {
        RawTransaction {
            hash: hash.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            time_stamp: epoch.to_string(),
            value: value.to_string(),
            ..RawTransaction::default()
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        store.save_account("u1", "0xabc").await.unwrap();
        store
    }

    fn reconciler_for(
        ledger: &Arc<StaticLedger>,
        store: &Arc<InMemoryStore>,
    ) -> LedgerReconciler<Arc<StaticLedger>, InMemoryStore> {
        LedgerReconciler::builder()
            .ledger_client(ledger.clone())
            .database(store.clone())
            .build()
    }

    fn hashes(page: &ReconciledPage) -> Vec<&str> {
        page.transactions.iter().map(|t| t.hash.as_str()).collect()
    }

    #[tokio::test]
    async fn newest_first_with_directions() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("h1", "0xdef", "0xabc", "100", "1000000000000000000"),
                raw("h2", "0xabc", "0xdef", "200", "500000000000000000"),
            ],
        ));

        let page = reconciler_for(&ledger, &store).reconcile("u1").await.unwrap();

        assert_eq!(hashes(&page), vec!["h2", "h1"]);
        assert_eq!(page.count(), 2);
        assert_eq!(page.persisted, 2);
        assert_eq!(page.transactions[0].direction, Direction::Withdrawal);
        assert_eq!(page.transactions[1].direction, Direction::Deposit);
        assert_eq!(page.transactions[1].amount, "1.000000000000000000");
        assert_eq!(page.transactions[0].amount, "0.500000000000000000");
        assert_eq!(page.transactions[0].token, "ETH");
        assert!(store.transaction_exists("h1").await.unwrap());
        assert!(store.transaction_exists("h2").await.unwrap());
    }

    #[tokio::test]
    async fn reconciling_twice_persists_each_hash_once() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("h1", "0xdef", "0xabc", "100", "1"),
                raw("h2", "0xabc", "0xdef", "200", "2"),
            ],
        ));
        let reconciler = reconciler_for(&ledger, &store);

        let first = reconciler.reconcile("u1").await.unwrap();
        let second = reconciler.reconcile("u1").await.unwrap();

        assert_eq!(first.persisted, 2);
        assert_eq!(second.persisted, 0);
        assert_eq!(first.transactions, second.transactions);
        assert_eq!(store.transactions_for_account(1).await.unwrap().len(), 2);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reconciling_twice_against_sqlite_persists_each_hash_once() {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        store.migrate().unwrap();
        let account = store.save_account("u1", "0xabc").await.unwrap();
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("h1", "0xdef", "0xabc", "100", "1000000000000000000"),
                raw("h2", "0xabc", "0xdef", "200", "2"),
                raw("h1", "0xabc", "0x999", "300", "3"),
            ],
        ));
        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger.clone())
            .database(store.clone())
            .build();

        let first = reconciler.reconcile("u1").await.unwrap();
        let second = reconciler.reconcile("u1").await.unwrap();

        assert_eq!(first.persisted, 2);
        assert_eq!(second.persisted, 0);
        assert_eq!(first.transactions, second.transactions);
        assert_eq!(hashes(&first), vec!["h1", "h2", "h1"]);

        let stored = store.transactions_for_account(account.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        let h1 = store.get_transaction("h1").await.unwrap();
        assert_eq!(h1.amount, "1.000000000000000000");
        assert_eq!(h1.direction, Direction::Deposit);
    }

    #[tokio::test]
    async fn duplicate_hash_in_page_stores_the_first_record() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("h1", "0xdef", "0xabc", "100", "1000000000000000000"),
                raw("h1", "0xabc", "0x999", "300", "2000000000000000000"),
            ],
        ));

        let page = reconciler_for(&ledger, &store).reconcile("u1").await.unwrap();

        assert_eq!(page.count(), 2);
        assert_eq!(page.persisted, 1);
        let stored = store.get_transaction("h1").await.unwrap();
        assert_eq!(stored.amount, "1.000000000000000000");
        assert_eq!(stored.direction, Direction::Deposit);
        assert_eq!(store.transactions_for_account(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sender_match_alone_is_still_a_withdrawal() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("self", "0xabc", "0xabc", "100", "1"),
                raw("out", "0xabc", "0xdef", "100", "1"),
                raw("mixed-case", "0xdef", "0xABC", "100", "1"),
            ],
        ));

        let page = reconciler_for(&ledger, &store).reconcile("u1").await.unwrap();
        let directions: Vec<Direction> = page.transactions.iter().map(|t| t.direction).collect();

        assert_eq!(
            directions,
            vec![Direction::Deposit, Direction::Withdrawal, Direction::Withdrawal]
        );
    }

    #[tokio::test]
    async fn equal_timestamps_keep_source_order() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("a", "0xdef", "0xabc", "100", "1"),
                raw("b", "0xdef", "0xabc", "300", "1"),
                raw("c", "0xdef", "0xabc", "100", "1"),
                raw("d", "0xdef", "0xabc", "200", "1"),
                raw("e", "0xdef", "0xabc", "100", "1"),
            ],
        ));

        let page = reconciler_for(&ledger, &store).reconcile("u1").await.unwrap();

        assert_eq!(hashes(&page), vec!["b", "d", "a", "c", "e"]);
        assert!(page
            .transactions
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn malformed_fields_degrade_to_zero_values() {
        let store = seeded_store().await;
        let ledger = Arc::new(StaticLedger::with_page(
            "0xabc",
            vec![
                raw("bad", "0xdef", "0xabc", "not-a-time", "lots"),
                raw("good", "0xdef", "0xabc", "100", "1"),
            ],
        ));

        let page = reconciler_for(&ledger, &store).reconcile("u1").await.unwrap();

        assert_eq!(hashes(&page), vec!["good", "bad"]);
        let bad = &page.transactions[1];
        assert_eq!(bad.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(bad.amount, units::zero_amount());
        assert!(store.transaction_exists("bad").await.unwrap());
    }

    #[tokio::test]
    async fn application_error_status_is_an_empty_page() {
        let store = seeded_store().await;
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_transactions().times(1).returning(|_| {
            Ok(LedgerPage {
                status: "0".to_string(),
                message: "NOTOK".to_string(),
                transactions: vec![raw("h1", "0xdef", "0xabc", "100", "1")],
            })
        });

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(store.clone())
            .build();
        let page = reconciler.reconcile("u1").await.unwrap();

        assert_eq!(page.count(), 0);
        assert!(!store.transaction_exists("h1").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_account_never_reaches_the_ledger() {
        let store = seeded_store().await;
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_transactions().times(0);

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(store)
            .build();

        assert!(matches!(
            reconciler.reconcile("nobody").await,
            Err(ReconcileError::NotFound(handle)) if handle == "nobody"
        ));
    }

    #[tokio::test]
    async fn upstream_failure_persists_nothing() {
        let mut store = MockTransactionStore::new();
        store.expect_find_account_by_handle().returning(|_| {
            Ok(Account {
                id: 1,
                uuid: "u1".to_string(),
                address: "0xabc".to_string(),
            })
        });
        store.expect_transaction_exists().times(0);
        store.expect_save_transaction().times(0);

        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_transactions()
            .returning(|_| Err(LedgerClientError::UpstreamUnavailable("timed out".to_string())));

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(Arc::new(store))
            .build();

        assert!(matches!(
            reconciler.reconcile("u1").await,
            Err(ReconcileError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn upstream_status_and_protocol_errors_are_distinct() {
        for (error, unavailable) in [
            (LedgerClientError::UpstreamStatus(500), true),
            (LedgerClientError::UpstreamProtocol("eof".to_string()), false),
        ] {
            let store = seeded_store().await;
            let mut ledger = MockLedgerClient::new();
            ledger
                .expect_get_transactions()
                .returning(move |_| Err(error.clone()));

            let reconciler = LedgerReconciler::builder()
                .ledger_client(ledger)
                .database(store)
                .build();
            let result = reconciler.reconcile("u1").await;

            if unavailable {
                assert!(matches!(result, Err(ReconcileError::UpstreamUnavailable(_))));
            } else {
                assert!(matches!(result, Err(ReconcileError::UpstreamProtocol(_))));
            }
        }
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_request() {
        let mut store = MockTransactionStore::new();
        store.expect_find_account_by_handle().returning(|_| {
            Ok(Account {
                id: 1,
                uuid: "u1".to_string(),
                address: "0xabc".to_string(),
            })
        });
        store.expect_transaction_exists().returning(|_| Ok(false));
        store
            .expect_save_transaction()
            .times(1)
            .returning(|_| Err(DataStorageError::Storage("disk full".to_string())));

        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_transactions().returning(|_| {
            Ok(LedgerPage {
                status: STATUS_OK.to_string(),
                message: "OK".to_string(),
                transactions: vec![
                    raw("h1", "0xdef", "0xabc", "100", "1"),
                    raw("h2", "0xdef", "0xabc", "200", "1"),
                ],
            })
        });

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(Arc::new(store))
            .build();

        assert!(matches!(
            reconciler.reconcile("u1").await,
            Err(ReconcileError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn lost_insert_race_is_benign() {
        let mut store = MockTransactionStore::new();
        store.expect_find_account_by_handle().returning(|_| {
            Ok(Account {
                id: 1,
                uuid: "u1".to_string(),
                address: "0xabc".to_string(),
            })
        });
        store.expect_transaction_exists().returning(|_| Ok(false));
        store
            .expect_save_transaction()
            .returning(|_| Ok(SaveOutcome::AlreadyExists));

        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_transactions().returning(|_| {
            Ok(LedgerPage {
                status: STATUS_OK.to_string(),
                message: "OK".to_string(),
                transactions: vec![raw("h1", "0xdef", "0xabc", "100", "1")],
            })
        });

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(Arc::new(store))
            .build();
        let page = reconciler.reconcile("u1").await.unwrap();

        assert_eq!(page.count(), 1);
        assert_eq!(page.persisted, 0);
    }

    #[tokio::test]
    async fn account_lookup_storage_error_is_not_a_not_found() {
        let mut store = MockTransactionStore::new();
        store
            .expect_find_account_by_handle()
            .returning(|_| Err(DataStorageError::Storage("locked".to_string())));
        let mut ledger = MockLedgerClient::new();
        ledger.expect_get_transactions().times(0);

        let reconciler = LedgerReconciler::builder()
            .ledger_client(ledger)
            .database(Arc::new(store))
            .build();

        assert!(matches!(
            reconciler.reconcile("u1").await,
            Err(ReconcileError::Storage(_))
        ));
    }
}
