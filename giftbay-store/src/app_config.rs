use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub market: MarketRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Postgres connection string; when absent the service runs on the
    /// in-memory voucher store.
    pub url: Option<String>,
}

/// Marketplace knobs for bucketing and reservation reclamation
#[derive(Debug, Deserialize, Clone)]
pub struct MarketRules {
    /// Width of a recommendation price bucket, in minor currency units
    #[serde(default = "default_bucket_size")]
    pub bucket_size: i64,
    /// Age past which an untouched reservation is reclaimed
    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_seconds: u64,
    /// How often the sweeper scans for stale reservations
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_bucket_size() -> i64 {
    1000
}

fn default_reservation_ttl() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    30
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            bucket_size: default_bucket_size(),
            reservation_ttl_seconds: default_reservation_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of GIFTBAY)
            // Eg. `GIFTBAY__MARKET__BUCKET_SIZE=500` would set `market.bucket_size`
            .add_source(config::Environment::with_prefix("GIFTBAY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
