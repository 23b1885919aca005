//! Database connection management for the Bookshelf service.
//!
//! Development runs against SQLite and production against Postgres. The pool
//! is built lazily so that an unreachable server surfaces during provisioning
//! rather than while constructing the handle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlxSqliteConnector,
    Statement,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{AppConfig, Environment};

/// Storage backend selected by environment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Backend::Sqlite,
            Environment::Production => Backend::Postgres,
        }
    }

    /// Whether `connection` is a descriptor for this backend.
    pub fn accepts(self, connection: &str) -> bool {
        let connection = connection.trim_start();
        match self {
            Backend::Sqlite => connection.starts_with("sqlite:"),
            Backend::Postgres => {
                connection.starts_with("postgres://") || connection.starts_with("postgresql://")
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building the database handle.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to create database connection pool: {source}")]
    ConnectionFailed {
        #[from]
        source: DbErr,
    },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Builds a lazily connecting pool for the environment's connection string.
///
/// No connection is opened here; the first query (normally the provisioning
/// probe) establishes it.
pub async fn connect(cfg: &AppConfig) -> Result<DatabaseConnection, DatabaseError> {
    let url = cfg
        .connection_string()
        .map_err(|e| DatabaseError::InvalidConfiguration {
            message: e.to_string(),
        })?;

    if url.trim().is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        });
    }

    let timeout = Duration::from_millis(cfg.db_acquire_timeout_ms);
    if is_in_memory(url) {
        return in_memory_pool(url, timeout);
    }

    let mut opt = ConnectOptions::new(url);
    opt.connect_lazy(true)
        .acquire_timeout(timeout)
        .connect_timeout(timeout)
        .max_connections(cfg.db_max_connections)
        .idle_timeout(Duration::from_secs(600)) // 10 minutes
        .max_lifetime(Duration::from_secs(1800)) // 30 minutes
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    log::debug!(
        "Created {} connection pool for {}",
        cfg.backend(),
        redact_connection_string(url)
    );
    Ok(db)
}

/// Health check for the database connection.
///
/// Executes `SELECT 1`; used both as the startup connectivity probe and by
/// the `/healthz` endpoint.
pub async fn health_check(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt).await?;

    Ok(())
}

/// Masks the password component of a connection string for logging.
pub fn redact_connection_string(connection: &str) -> String {
    match Url::parse(connection) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("****")).is_err() {
                return "[REDACTED]".to_string();
            }
            url.to_string()
        }
        Err(_) => "[REDACTED]".to_string(),
    }
}

/// Single-connection pool for an in-memory SQLite database.
///
/// The database lives only as long as its one connection, so that connection
/// is never reaped for idleness or age.
fn in_memory_pool(url: &str, timeout: Duration) -> Result<DatabaseConnection, DatabaseError> {
    let options =
        SqliteConnectOptions::from_str(url).map_err(|e| DatabaseError::InvalidConfiguration {
            message: e.to_string(),
        })?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(timeout)
        .connect_lazy_with(options);

    log::debug!("Created in-memory sqlite connection pool for {}", url);
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

fn is_in_memory(connection: &str) -> bool {
    connection.starts_with("sqlite:") && connection.contains(":memory:")
}
