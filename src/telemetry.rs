//! Tracing setup.
//!
//! Bootstrap events come from this crate, from `sea_orm_migration` (one line
//! per applied migration) and from sqlx, which logs every statement. SeaORM
//! and sqlx emit through the `log` facade, so a bridge forwards them.

use std::str::FromStr;
use std::sync::OnceLock;

use log::LevelFilter;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::ParseError, fmt, layer::SubscriberExt};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        directives: String,
        source: ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
    #[error("failed to bridge log records into tracing: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Expands a configured log level into filter directives.
///
/// A bare level applies to the service, the HTTP layer and migrations.
/// Statement logging from sqlx and SeaORM stays at `warn` unless the level is
/// `debug` or `trace`. Anything that already looks like a directive list is
/// used as is.
pub fn filter_directives(log_level: &str) -> String {
    let level = match log_level.trim() {
        "" => "info",
        level => level,
    };
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }

    let statements = match level.to_ascii_lowercase().as_str() {
        "debug" | "trace" => level,
        _ => "warn",
    };
    format!(
        "{level},bookshelf={level},tower_http={level},sea_orm_migration={level},sea_orm={statements},sqlx={statements}"
    )
}

/// Most verbose `log` record worth forwarding for `log_level`.
fn bridge_level(log_level: &str) -> LevelFilter {
    LevelFilter::from_str(log_level.trim()).unwrap_or(LevelFilter::Trace)
}

/// Installs the global subscriber once; later calls are no-ops.
///
/// `RUST_LOG` replaces the directives derived from the configuration.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let directives = std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| filter_directives(&config.log_level));
    let filter = match EnvFilter::try_new(&directives) {
        Ok(filter) => filter,
        Err(source) => return Err(TelemetryInitError::Filter { directives, source }),
    };

    let output = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    tracing::subscriber::set_global_default(Registry::default().with(filter).with(output))?;
    let _ = INSTALLED.set(());

    LogTracer::builder()
        .with_max_level(bridge_level(&config.log_level))
        .init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_keeps_statement_logging_quiet() {
        let directives = filter_directives("info");

        assert!(directives.starts_with("info,bookshelf=info"));
        assert!(directives.contains("sea_orm_migration=info"));
        assert!(directives.contains("sqlx=warn"));
        assert!(directives.contains("sea_orm=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_debug_enables_statement_logging() {
        let directives = filter_directives("debug");

        assert!(directives.contains("sqlx=debug"));
        assert!(directives.contains("sea_orm=debug"));
    }

    #[test]
    fn test_directive_lists_pass_through() {
        assert_eq!(
            filter_directives("warn,bookshelf::startup=trace"),
            "warn,bookshelf::startup=trace"
        );
        assert!(filter_directives("  ").starts_with("info,"));
    }

    #[test]
    fn test_bridge_level_follows_config() {
        assert_eq!(bridge_level("warn"), LevelFilter::Warn);
        assert_eq!(bridge_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(bridge_level("info,sqlx=trace"), LevelFilter::Trace);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = AppConfig {
            log_format: "pretty".to_string(),
            ..AppConfig::default()
        };

        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }
}
