//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use poker_room::db::DatabaseConfig;
use poker_room::table::{TableConfig, TableSpeed};
use std::net::{Ipv4Addr, SocketAddr};

/// Address used when neither `--bind` nor `SERVER_BIND` is given.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 6969);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Where table snapshots and wallets live
    pub storage: StorageMode,
    /// Configuration applied to every table created at startup
    pub table_defaults: TableConfig,
    /// Number of tables to create on startup
    pub num_tables: usize,
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Postgres(DatabaseConfig),
    /// In-process stores; nothing survives a restart.
    Memory,
}

/// Values given on the command line, which win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub num_tables: Option<usize>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `SERVER_BIND`, `STORAGE` (`postgres` or `memory`), `DATABASE_URL`
    /// and the `DB_*` pool settings, the `TABLE_*` defaults and `MAX_TABLES`.
    /// Unset numeric variables fall back to defaults; set but malformed
    /// addresses, speeds and storage modes are errors.
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?,
                Err(_) => DEFAULT_BIND,
            },
        };

        let memory = overrides.memory
            || match std::env::var("STORAGE") {
                Ok(raw) => match raw.to_ascii_lowercase().as_str() {
                    "memory" => true,
                    "postgres" => false,
                    _ => {
                        return Err(ConfigError::Invalid {
                            var: "STORAGE".to_string(),
                            reason: format!("'{raw}' is neither 'postgres' nor 'memory'"),
                        });
                    }
                },
                Err(_) => false,
            };

        let storage = if memory {
            StorageMode::Memory
        } else {
            let mut database = DatabaseConfig::from_env();
            if let Some(url) = overrides.database_url {
                database.database_url = url;
            }
            StorageMode::Postgres(database)
        };

        let defaults = TableConfig::default();
        let speed = match std::env::var("TABLE_SPEED") {
            Ok(raw) => raw.parse::<TableSpeed>().map_err(|e| ConfigError::Invalid {
                var: "TABLE_SPEED".to_string(),
                reason: e.to_string(),
            })?,
            Err(_) => defaults.speed,
        };

        let table_defaults = TableConfig {
            name: defaults.name,
            max_players: parse_env_or("TABLE_MAX_PLAYERS", defaults.max_players),
            small_blind: parse_env_or("TABLE_SMALL_BLIND", defaults.small_blind),
            big_blind: parse_env_or("TABLE_BIG_BLIND", defaults.big_blind),
            min_buy_in_bb: parse_env_or("TABLE_MIN_BUY_IN_BB", defaults.min_buy_in_bb),
            max_buy_in_bb: parse_env_or("TABLE_MAX_BUY_IN_BB", defaults.max_buy_in_bb),
            absolute_chip_cap: parse_env_or("ABSOLUTE_CHIP_CAP", defaults.absolute_chip_cap),
            speed,
        };

        let num_tables = overrides
            .num_tables
            .unwrap_or_else(|| parse_env_or("MAX_TABLES", 1));

        Ok(ServerConfig {
            bind,
            storage,
            table_defaults,
            num_tables,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_TABLES".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        self.table_defaults
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "TABLE_*".to_string(),
                reason: e.to_string(),
            })
    }

    /// Config for the `index`-th startup table (zero based).
    pub fn table_config(&self, index: usize) -> TableConfig {
        TableConfig {
            name: format!("Table {}", index + 1),
            ..self.table_defaults.clone()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
