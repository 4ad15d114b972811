pub mod admission;
pub mod etherscan_client;
pub mod ledger_client;
pub mod memory;
pub mod seeder;
pub mod sqlite;
