use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub renewal: RenewalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenewalConfig {
    /// Pause between per-membership renewal writes, to spread the write burst.
    pub throttle_ms: u64,
    /// Window used by the upcoming-renewals report when the caller gives none.
    pub default_days_ahead: i64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 100,
            default_days_ahead: 7,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("renewal.throttle_ms", 100)?
            .set_default("renewal.default_days_ahead", 7)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with GYMLEDGER__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("GYMLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://gymledger.db".to_string(),
                max_connections: 10,
            },
            renewal: RenewalConfig::default(),
        }
    }
}
