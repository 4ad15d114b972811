use crate::domain::models::{
    Account, Direction, ReconciledPage, Transaction, NATIVE_DECIMALS, NATIVE_SYMBOL,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// List envelope returned by every collection endpoint.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub account_uuid: String,
    pub to_address: String,
    pub from_address: String,
    #[serde(rename = "type")]
    pub kind: Direction,
    pub amount: String,
    pub symbol: String,
    pub decimal: u32,
    pub timestamp: String,
    pub txn_hash: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: i64,
    pub account_uuid: String,
    pub address: String,
}

impl TransactionView {
    pub fn new(account: &Account, transaction: &Transaction) -> Self {
        Self {
            id: transaction.hash.clone(),
            account_uuid: account.uuid.clone(),
            to_address: transaction.receiver.clone(),
            from_address: transaction.sender.clone(),
            kind: transaction.direction,
            amount: transaction.amount.clone(),
            symbol: NATIVE_SYMBOL.to_string(),
            decimal: NATIVE_DECIMALS,
            timestamp: transaction
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            txn_hash: transaction.hash.clone(),
        }
    }
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            account_uuid: account.uuid.clone(),
            address: account.address.clone(),
        }
    }
}

/// Shapes a reconciled page, preserving its order.
pub fn present_transactions(page: &ReconciledPage) -> ListResponse<TransactionView> {
    page.transactions
        .iter()
        .map(|t| TransactionView::new(&page.account, t))
        .collect::<Vec<_>>()
        .into()
}

pub fn present_accounts(accounts: &[Account]) -> ListResponse<AccountView> {
    accounts
        .iter()
        .map(AccountView::from)
        .collect::<Vec<_>>()
        .into()
}
