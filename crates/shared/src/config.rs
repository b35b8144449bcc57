//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Ledger behavior configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as loaded from files/environment.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Service token expiration in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

fn default_token_expiry() -> u64 {
    3600 // 1 hour
}

/// Ledger behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum billable actions per tenant per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i32,
    /// Cost applied to action keys missing from the pricing table.
    #[serde(default = "default_action_cost")]
    pub default_action_cost: i64,
    /// Credits granted per free-tier cycle.
    #[serde(default = "default_free_grant")]
    pub free_grant_amount: i64,
    /// TTL in seconds for cached credit cost lookups.
    #[serde(default = "default_cost_cache_ttl")]
    pub cost_cache_ttl_secs: u64,
}

fn default_rate_limit() -> i32 {
    100
}

fn default_action_cost() -> i64 {
    1
}

fn default_free_grant() -> i64 {
    500
}

fn default_cost_cache_ttl() -> u64 {
    60
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: default_rate_limit(),
            default_action_cost: default_action_cost(),
            free_grant_amount: default_free_grant(),
            cost_cache_ttl_secs: default_cost_cache_ttl(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KREDO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_config_defaults() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.rate_limit_per_minute, 100);
        assert_eq!(cfg.default_action_cost, 1);
        assert_eq!(cfg.free_grant_amount, 500);
        assert_eq!(cfg.cost_cache_ttl_secs, 60);
    }

    #[test]
    fn test_load_from_env() {
        temp_env::with_vars(
            [
                ("KREDO__DATABASE__URL", Some("postgres://localhost/kredo")),
                ("KREDO__JWT__SECRET", Some("test-secret")),
                ("KREDO__SERVER__PORT", Some("9090")),
                ("KREDO__LEDGER__RATE_LIMIT_PER_MINUTE", Some("42")),
            ],
            || {
                let cfg = AppConfig::load().expect("config should load from env");
                assert_eq!(cfg.database.url, "postgres://localhost/kredo");
                assert_eq!(cfg.server.port, 9090);
                assert_eq!(cfg.ledger.rate_limit_per_minute, 42);
            },
        );
    }
}
