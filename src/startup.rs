//! Startup sequencing.
//!
//! Provisions the schema and seeds reference data before the HTTP listener is
//! bound. Provisioning always completes before seeding starts, and seeding is
//! skipped entirely when provisioning did not succeed.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError, Environment, SeedFailurePolicy};
use crate::db::{self, DatabaseError};
use crate::error::ErrorKind;
use crate::provision::{DatabaseSchema, ProvisionError, SchemaBackend, SchemaReady, provision};
use crate::repositories::AuthorRepository;
use crate::seeds::{AuthorSeedStore, SeedError, SeedOutcome, seed_if_empty};

/// A startup failure that must prevent the service from serving traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}

impl StartupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StartupError::Config(_) | StartupError::Database(_) => ErrorKind::Configuration,
            StartupError::Provision(err) => err.kind(),
            StartupError::Seed(err) => err.kind(),
        }
    }
}

/// What startup achieved, including failures that were tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub environment: Environment,
    /// `None` when provisioning failed and the failure was tolerated.
    pub schema: Option<SchemaReady>,
    /// `None` when seeding did not run or its failure was tolerated.
    pub seed: Option<SeedOutcome>,
    pub tolerated: Vec<ErrorKind>,
}

impl StartupReport {
    fn new(environment: Environment) -> Self {
        Self {
            environment,
            schema: None,
            seed: None,
            tolerated: Vec::new(),
        }
    }

    /// Whether the service starts with any tolerated failure.
    pub fn is_degraded(&self) -> bool {
        !self.tolerated.is_empty()
    }
}

/// Runs provisioning then seeding, deciding which failures are fatal.
///
/// - Provisioning failures abort in production. In development they are
///   logged and seeding is skipped.
/// - Seed insert failures abort only in production with
///   [`SeedFailurePolicy::Fatal`].
pub async fn run_startup<S, A>(
    mode: Environment,
    policy: SeedFailurePolicy,
    schema: &S,
    seeds: &A,
) -> Result<StartupReport, StartupError>
where
    S: SchemaBackend + ?Sized,
    A: AuthorSeedStore + ?Sized,
{
    let mut report = StartupReport::new(mode);

    match provision(mode, schema).await {
        Ok(ready) => {
            if !ready.reachable {
                report.tolerated.push(ErrorKind::Connectivity);
            }
            report.schema = Some(ready);
        }
        Err(err) if mode.is_production() => return Err(err.into()),
        Err(err) => {
            warn!(
                kind = %err.kind(),
                error = %err,
                "continuing without a provisioned schema; seeding skipped"
            );
            report.tolerated.push(err.kind());
            return Ok(report);
        }
    }

    match seed_if_empty(seeds).await {
        Ok(outcome) => report.seed = Some(outcome),
        Err(err) if mode.is_production() && policy == SeedFailurePolicy::Fatal => {
            return Err(err.into());
        }
        Err(err) => {
            warn!(kind = %err.kind(), error = %err, "continuing without reference data");
            if err.check_failed() {
                report.tolerated.push(ErrorKind::SeedCheck);
            }
            report.tolerated.push(err.kind());
            report.seed = err.tolerated_outcome();
        }
    }

    Ok(report)
}

/// A provisioned store ready to serve requests.
pub struct Bootstrapped {
    pub db: DatabaseConnection,
    pub report: StartupReport,
}

/// Builds the store for `config` and runs [`run_startup`] against it.
pub async fn bootstrap(config: &AppConfig) -> Result<Bootstrapped, StartupError> {
    let mode = config.environment;
    let backend = config.backend();
    let connection = config.connection_string()?;

    info!(environment = %mode, backend = %backend, "starting database bootstrap");

    let db = db::connect(config).await?;
    let schema = DatabaseSchema::new(&db, backend, connection);
    let authors = AuthorRepository::new(Arc::new(db.clone()));

    let report = run_startup(mode, config.seed_failure_policy, &schema, &authors).await?;

    if report.is_degraded() {
        warn!(
            environment = %mode,
            tolerated = ?report.tolerated,
            "database bootstrap finished with tolerated failures"
        );
    } else {
        info!(environment = %mode, seed = ?report.seed, "database bootstrap complete");
    }

    Ok(Bootstrapped { db, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Backend;
    use crate::provision::ProvisionMethod;
    use crate::seeds::SeedAuthor;
    use async_trait::async_trait;
    use sea_orm::DbErr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSchema {
        probe_ok: bool,
        migrate_ok: bool,
        create_ok: bool,
    }

    #[async_trait]
    impl SchemaBackend for FakeSchema {
        fn backend(&self) -> Backend {
            Backend::Postgres
        }

        fn target(&self) -> &str {
            "postgres://app:****@db/bookshelf"
        }

        async fn probe(&self) -> Result<(), DbErr> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(DbErr::Custom("connection refused".to_string()))
            }
        }

        async fn migrate(&self) -> Result<usize, DbErr> {
            if self.migrate_ok {
                Ok(0)
            } else {
                Err(DbErr::Migration("migration failed".to_string()))
            }
        }

        async fn create_schema(&self) -> Result<(), DbErr> {
            if self.create_ok {
                Ok(())
            } else {
                Err(DbErr::Custom("create failed".to_string()))
            }
        }
    }

    #[derive(Default)]
    struct FakeSeeds {
        populated: bool,
        fail_check: bool,
        fail_insert: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthorSeedStore for FakeSeeds {
        async fn has_authors(&self) -> Result<bool, DbErr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_check {
                return Err(DbErr::Custom("relation \"authors\" is not readable".to_string()));
            }
            Ok(self.populated)
        }

        async fn insert_authors_if_absent(&self, authors: &[SeedAuthor]) -> Result<u64, DbErr> {
            if self.fail_insert {
                Err(DbErr::Custom("insert failed".to_string()))
            } else {
                Ok(authors.len() as u64)
            }
        }
    }

    fn schema(probe_ok: bool, migrate_ok: bool, create_ok: bool) -> FakeSchema {
        FakeSchema {
            probe_ok,
            migrate_ok,
            create_ok,
        }
    }

    #[tokio::test]
    async fn test_healthy_startup_seeds() {
        let seeds = FakeSeeds::default();
        let report = run_startup(
            Environment::Development,
            SeedFailurePolicy::Tolerate,
            &schema(true, true, true),
            &seeds,
        )
        .await
        .unwrap();

        assert_eq!(report.seed, Some(SeedOutcome::Seeded { inserted: 3 }));
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_development_migration_failure_skips_seeder() {
        let seeds = FakeSeeds::default();
        let report = run_startup(
            Environment::Development,
            SeedFailurePolicy::Tolerate,
            &schema(true, false, true),
            &seeds,
        )
        .await
        .unwrap();

        assert!(report.schema.is_none());
        assert!(report.seed.is_none());
        assert_eq!(report.tolerated, vec![ErrorKind::Migration]);
        assert_eq!(seeds.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_production_fallback_allows_seeding() {
        let seeds = FakeSeeds::default();
        let report = run_startup(
            Environment::Production,
            SeedFailurePolicy::Fatal,
            &schema(true, false, true),
            &seeds,
        )
        .await
        .unwrap();

        assert_eq!(report.schema.map(|s| s.method), Some(ProvisionMethod::Created));
        assert_eq!(report.seed, Some(SeedOutcome::Seeded { inserted: 3 }));
        assert_eq!(seeds.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_production_provisioning_failure_is_fatal() {
        let seeds = FakeSeeds::default();
        let err = run_startup(
            Environment::Production,
            SeedFailurePolicy::Tolerate,
            &schema(true, false, false),
            &seeds,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SchemaCreation);
        assert_eq!(seeds.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_alone_does_not_abort() {
        let seeds = FakeSeeds {
            populated: true,
            ..FakeSeeds::default()
        };
        let report = run_startup(
            Environment::Production,
            SeedFailurePolicy::Fatal,
            &schema(false, true, true),
            &seeds,
        )
        .await
        .unwrap();

        assert_eq!(report.tolerated, vec![ErrorKind::Connectivity]);
        assert_eq!(report.seed, Some(SeedOutcome::AlreadyPopulated));
    }

    #[tokio::test]
    async fn test_seed_failure_policy() {
        let failing = || FakeSeeds {
            fail_insert: true,
            ..FakeSeeds::default()
        };

        let report = run_startup(
            Environment::Development,
            SeedFailurePolicy::Fatal,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap();
        assert_eq!(report.tolerated, vec![ErrorKind::SeedInsert]);

        let report = run_startup(
            Environment::Production,
            SeedFailurePolicy::Tolerate,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap();
        assert!(report.seed.is_none());

        let err = run_startup(
            Environment::Production,
            SeedFailurePolicy::Fatal,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SeedInsert);
    }

    #[tokio::test]
    async fn test_unverified_seed_failure_respects_policy() {
        let failing = || FakeSeeds {
            fail_check: true,
            fail_insert: true,
            ..FakeSeeds::default()
        };

        let err = run_startup(
            Environment::Production,
            SeedFailurePolicy::Fatal,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SeedInsert);
        assert!(matches!(err, StartupError::Seed(SeedError::Unverified { .. })));

        let report = run_startup(
            Environment::Production,
            SeedFailurePolicy::Tolerate,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap();
        assert_eq!(report.seed, Some(SeedOutcome::SkippedDueToCheckFailure));
        assert_eq!(
            report.tolerated,
            vec![ErrorKind::SeedCheck, ErrorKind::SeedInsert]
        );

        let report = run_startup(
            Environment::Development,
            SeedFailurePolicy::Fatal,
            &schema(true, true, true),
            &failing(),
        )
        .await
        .unwrap();
        assert_eq!(report.seed, Some(SeedOutcome::SkippedDueToCheckFailure));
    }
}
