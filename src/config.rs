use clap::Args;

pub const DEFAULT_ETHERSCAN_URL: &str = "https://api.etherscan.io/api";

/// Process-wide settings, built once at startup and passed down by reference.
#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Etherscan API key
    #[arg(long, env = "ETHERSCAN_API_KEY", default_value = "", hide_env_values = true)]
    pub etherscan_api_key: String,

    /// Etherscan API endpoint
    #[arg(long, env = "ETHERSCAN_URL", default_value = DEFAULT_ETHERSCAN_URL)]
    pub etherscan_url: String,

    /// Transactions fetched per account request
    #[arg(long, env = "ETHERSCAN_PAGE_SIZE", default_value_t = 10)]
    pub page_size: u32,

    /// Requests admitted per second
    #[arg(long, env = "RATE_LIMIT", default_value_t = 1)]
    pub rate_limit: u32,

    /// Requests admitted in a single burst
    #[arg(long, env = "BURST_LIMIT", default_value_t = 5)]
    pub burst_limit: u32,

    /// Listen port REST API
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite database file, `:memory:` for a transient database
    #[arg(long, env = "DATABASE_PATH", default_value = "transactions.db")]
    pub database: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            etherscan_api_key: String::new(),
            etherscan_url: DEFAULT_ETHERSCAN_URL.to_string(),
            page_size: 10,
            rate_limit: 1,
            burst_limit: 5,
            port: 3000,
            database: "transactions.db".to_string(),
        }
    }
}
