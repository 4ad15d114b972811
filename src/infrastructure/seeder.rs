use crate::domain::models::TransactionStore;

/// Accounts provisioned on every start, as (uuid, address).
pub const SEED_ACCOUNTS: [(&str, &str); 3] = [
    (
        "9b3af3a7-51f1-49a7-aa3b-c700cf82a835",
        "0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5",
    ),
    (
        "81f5c001-45a5-4922-8fcb-b961ae312ec0",
        "0x4838B106FCe9647Bdf1E7877BF73cE8B0BAD5f97",
    ),
    (
        "bb7b48b4-4481-4a72-8079-74372cdeea92",
        "0xC70ae19B5FeAA5c19f576e621d2bad9771864fe2",
    ),
];

/// Saves each seed account, logging and skipping the ones that fail.
///
/// Returns how many accounts were saved.
pub async fn seed_accounts<D>(database: &D, accounts: &[(&str, &str)]) -> usize
where
    D: TransactionStore + ?Sized,
{
    let mut seeded = 0;
    for (uuid, address) in accounts {
        match database.save_account(uuid, address).await {
            Ok(account) => {
                tracing::info!("Seeded account {} with uuid {}", account.address, account.uuid);
                seeded += 1;
            }
            Err(e) => tracing::error!("Failed to seed account {}: {}", address, e),
        }
    }
    seeded
}
