//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use ffl_bracket::bracket::{DEFAULT_MAX_COMMIT_ATTEMPTS, DEFAULT_START_WEEK, TiebreakerPolicy};
use ffl_bracket::db::DatabaseConfig;
use std::net::{Ipv4Addr, SocketAddr};

/// Port used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_PORT: u16 = 8080;

/// Last week of the NFL regular season plus playoffs a bracket may start in
const LAST_SCORING_WEEK: u32 = 18;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Where brackets are persisted
    pub store: StoreBackend,
    /// Defaults applied to newly created brackets
    pub bracket_defaults: BracketDefaultsConfig,
}

/// Bracket storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store, lost on restart
    Memory,
    /// PostgreSQL JSONB documents
    Postgres(DatabaseConfig),
}

/// Defaults for brackets created through the API
#[derive(Debug, Clone)]
pub struct BracketDefaultsConfig {
    /// Tiebreak order used when a create request carries none
    pub tiebreaker: TiebreakerPolicy,
    /// NFL week that round 1 is played in
    pub start_week: u32,
    /// Load/apply/save attempts before a write gives up on version conflicts
    pub max_commit_attempts: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `store_override` - Optional storage backend name override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics exporter address (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid, or if the Postgres
    /// backend is selected without a database URL.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        store_override: Option<String>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?,
                Err(_) => SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            },
        };

        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?),
                Err(_) => None,
            },
        };

        let store_name = store_override
            .or_else(|| std::env::var("BRACKET_STORE").ok())
            .unwrap_or_else(|| "memory".to_string());

        let store = match store_name.trim().to_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => {
                let database_url = database_url_override
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| ConfigError::MissingRequired {
                        var: "DATABASE_URL".to_string(),
                        hint: "Required when BRACKET_STORE=postgres, e.g. postgres://ffl@localhost/ffl_playoffs".to_string(),
                    })?;
                StoreBackend::Postgres(DatabaseConfig::from_env().with_url(database_url))
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "BRACKET_STORE".to_string(),
                    reason: format!("Unknown backend '{other}', expected 'memory' or 'postgres'"),
                });
            }
        };

        let tiebreaker = match std::env::var("TIEBREAKER_RULES") {
            Ok(names) => {
                TiebreakerPolicy::from_names(&names).map_err(|e| ConfigError::Invalid {
                    var: "TIEBREAKER_RULES".to_string(),
                    reason: e.to_string(),
                })?
            }
            Err(_) => TiebreakerPolicy::default(),
        };

        let bracket_defaults = BracketDefaultsConfig {
            tiebreaker,
            start_week: parse_env_or("PLAYOFF_START_WEEK", DEFAULT_START_WEEK),
            max_commit_attempts: parse_env_or("MAX_COMMIT_ATTEMPTS", DEFAULT_MAX_COMMIT_ATTEMPTS),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            store,
            bracket_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let week = self.bracket_defaults.start_week;
        if week == 0 || week > LAST_SCORING_WEEK {
            return Err(ConfigError::Invalid {
                var: "PLAYOFF_START_WEEK".to_string(),
                reason: format!("Must be between 1 and {LAST_SCORING_WEEK}, got {week}"),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        if self.bracket_defaults.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_COMMIT_ATTEMPTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let StoreBackend::Postgres(database) = &self.store {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

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

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            metrics_bind: None,
            store: StoreBackend::Memory,
            bracket_defaults: BracketDefaultsConfig {
                tiebreaker: TiebreakerPolicy::default(),
                start_week: 15,
                max_commit_attempts: 5,
            },
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Set it".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Set it"));
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_start_week() {
        let mut config = config();
        config.bracket_defaults.start_week = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "PLAYOFF_START_WEEK"
        ));

        config.bracket_defaults.start_week = 19;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_commit_attempts() {
        let mut config = config();
        config.bracket_defaults.max_commit_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "MAX_COMMIT_ATTEMPTS"
        ));
    }

    #[test]
    fn test_config_validation_metrics_port_clash() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "METRICS_BIND"
        ));

        config.metrics_bind = Some("127.0.0.1:9090".parse().unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut config = config();
        config.store = StoreBackend::Postgres(DatabaseConfig {
            min_connections: 20,
            max_connections: 10,
            ..DatabaseConfig::development()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var, .. }) if var == "DB_MIN_CONNECTIONS"
        ));
    }

    #[test]
    fn test_store_override_rejects_unknown_backend() {
        let err = ServerConfig::from_env(None, None, Some("redis".to_string()), None).unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_postgres_override_uses_cli_url() {
        let config = ServerConfig::from_env(
            Some("0.0.0.0:9000".parse().unwrap()),
            Some("postgres://cli@localhost/brackets".to_string()),
            Some("postgres".to_string()),
            Some("127.0.0.1:9091".parse().unwrap()),
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.metrics_bind.map(|addr| addr.port()), Some(9091));
        match config.store {
            StoreBackend::Postgres(database) => {
                assert_eq!(database.database_url, "postgres://cli@localhost/brackets");
            }
            StoreBackend::Memory => panic!("expected postgres backend"),
        }
    }
}
