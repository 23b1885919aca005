//! Configuration loading for the Bookshelf service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BOOKSHELF_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Backend, redact_connection_string};

/// Runtime environment mode. Chosen once at startup and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Name used for profile-specific `.env.{name}` files.
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment {
                value: value.to_string(),
            }),
        }
    }
}

/// What to do when inserting reference authors fails.
///
/// Only consulted in production; development always tolerates seed failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedFailurePolicy {
    Tolerate,
    Fatal,
}

impl FromStr for SeedFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tolerate" => Ok(SeedFailurePolicy::Tolerate),
            "fatal" => Ok(SeedFailurePolicy::Fatal),
            _ => Err(ConfigError::InvalidSeedFailurePolicy {
                value: value.to_string(),
            }),
        }
    }
}

/// Application configuration derived from `BOOKSHELF_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: Environment,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Connection string used in development.
    #[serde(default = "default_connection")]
    pub default_connection: String,
    /// Connection string used in production.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_connection: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default = "default_seed_failure_policy")]
    pub seed_failure_policy: SeedFailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            default_connection: default_connection(),
            production_connection: None,
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            seed_failure_policy: default_seed_failure_policy(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Storage backend implied by the environment mode.
    pub fn backend(&self) -> Backend {
        Backend::for_environment(self.environment)
    }

    /// Selects the connection string for the current environment.
    pub fn connection_string(&self) -> Result<&str, ConfigError> {
        match self.environment {
            Environment::Development => Ok(self.default_connection.as_str()),
            Environment::Production => self
                .production_connection
                .as_deref()
                .ok_or(ConfigError::MissingProductionConnection),
        }
    }

    /// Returns a redacted JSON representation (connection passwords are masked).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.default_connection = redact_connection_string(&config.default_connection);
        config.production_connection = config
            .production_connection
            .as_deref()
            .map(redact_connection_string);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let connection = self.connection_string()?;
        if connection.trim().is_empty() {
            return Err(ConfigError::EmptyConnectionString {
                environment: self.environment,
            });
        }

        let backend = self.backend();
        if !backend.accepts(connection) {
            return Err(ConfigError::BackendMismatch {
                environment: self.environment,
                backend,
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections {
                value: self.db_max_connections,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        Ok(())
    }
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_connection() -> String {
    "sqlite://bookshelf.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_seed_failure_policy() -> SeedFailurePolicy {
    SeedFailurePolicy::Tolerate
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("unknown environment '{value}'; expected development or production")]
    InvalidEnvironment { value: String },
    #[error("unknown seed failure policy '{value}'; expected tolerate or fatal")]
    InvalidSeedFailurePolicy { value: String },
    #[error(
        "production connection string is missing; set BOOKSHELF_PRODUCTION_CONNECTION environment variable"
    )]
    MissingProductionConnection,
    #[error("connection string for {environment} is empty")]
    EmptyConnectionString { environment: Environment },
    #[error("connection string for {environment} does not target the {backend} backend")]
    BackendMismatch {
        environment: Environment,
        backend: Backend,
    },
    #[error("database max connections must be at least 1, got {value}")]
    InvalidMaxConnections { value: u32 },
    #[error("log format must be json or pretty, got {value}")]
    InvalidLogFormat { value: String },
}

/// Loads configuration using layered `.env` files and `BOOKSHELF_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.{environment}`, `.env.{environment}.local`
    /// and finally the process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, environment) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("BOOKSHELF_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let environment = match layered.remove("ENVIRONMENT").filter(|v| !v.is_empty()) {
            Some(value) => value.parse()?,
            None => environment,
        };
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let default_connection = layered
            .remove("DEFAULT_CONNECTION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_connection);
        let production_connection = layered
            .remove("PRODUCTION_CONNECTION")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let seed_failure_policy = match layered
            .remove("SEED_FAILURE_POLICY")
            .filter(|v| !v.is_empty())
        {
            Some(value) => value.parse()?,
            None => default_seed_failure_policy(),
        };

        let config = AppConfig {
            environment,
            api_bind_addr,
            log_level,
            log_format,
            default_connection,
            production_connection,
            db_max_connections,
            db_acquire_timeout_ms,
            seed_failure_policy,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, Environment), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let environment = match env::var("BOOKSHELF_ENVIRONMENT")
            .ok()
            .or_else(|| values.get("ENVIRONMENT").cloned())
            .filter(|v| !v.is_empty())
        {
            Some(value) => value.parse()?,
            None => default_environment(),
        };

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", environment.as_str())),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir
                .join(format!(".env.{}.local", environment.as_str())),
            &mut values,
        )?;

        Ok((values, environment))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("BOOKSHELF_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
