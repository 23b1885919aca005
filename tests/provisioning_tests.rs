//! Provisioning and full bootstrap against real SQLite stores.

use anyhow::Result;
use bookshelf::config::{AppConfig, Environment, SeedFailurePolicy};
use bookshelf::db::Backend;
use bookshelf::error::ErrorKind;
use bookshelf::provision::{DatabaseSchema, ProvisionError, ProvisionMethod, SchemaBackend, provision};
use bookshelf::seeds::SeedOutcome;
use bookshelf::startup::{bootstrap, run_startup};
use sea_orm::{ConnectionTrait, Statement};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{author_repo, setup_empty_db, sqlite_index_names, sqlite_table_exists};

const TARGET: &str = "sqlite::memory:";

async fn corrupt_migration_history(db: &sea_orm::DatabaseConnection) -> Result<()> {
    // A version recorded by some other build that this binary does not know about.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "INSERT INTO seaql_migrations (version, applied_at) VALUES ('m2099_01_01_000000_unknown', 0)"
            .to_string(),
    ))
    .await?;
    Ok(())
}

#[tokio::test]
async fn migrate_applies_every_migration_once() -> Result<()> {
    let db = setup_empty_db().await?;
    let schema = DatabaseSchema::new(&db, Backend::Sqlite, TARGET);

    assert_eq!(schema.migrate().await?, 3);
    assert_eq!(schema.migrate().await?, 0);

    for table in ["authors", "books", "reviews"] {
        assert!(sqlite_table_exists(&db, table).await?, "{table} missing");
    }
    Ok(())
}

#[tokio::test]
async fn create_schema_builds_usable_tables() -> Result<()> {
    let db = setup_empty_db().await?;
    let schema = DatabaseSchema::new(&db, Backend::Sqlite, TARGET);

    schema.create_schema().await?;
    schema.create_schema().await?;

    for table in ["authors", "books", "reviews"] {
        assert!(sqlite_table_exists(&db, table).await?, "{table} missing");
    }

    let repo = author_repo(&db);
    let outcome = bookshelf::seeds::seed_if_empty(&repo).await?;
    assert_eq!(outcome, SeedOutcome::Seeded { inserted: 3 });

    // The identity index exists, so a second batch is ignored.
    let models = bookshelf::seeds::SEED_AUTHORS
        .iter()
        .map(|a| a.active_model())
        .collect();
    assert_eq!(repo.insert_if_absent(models).await?, 0);
    Ok(())
}

#[tokio::test]
async fn created_schema_has_the_same_indexes_as_migrated_schema() -> Result<()> {
    let migrated = setup_empty_db().await?;
    DatabaseSchema::new(&migrated, Backend::Sqlite, TARGET)
        .migrate()
        .await?;

    let created = setup_empty_db().await?;
    DatabaseSchema::new(&created, Backend::Sqlite, TARGET)
        .create_schema()
        .await?;

    let expected = vec![
        "idx_authors_identity".to_string(),
        "idx_books_author_id".to_string(),
        "idx_reviews_book_id".to_string(),
    ];
    assert_eq!(sqlite_index_names(&migrated).await?, expected);
    assert_eq!(sqlite_index_names(&created).await?, expected);
    Ok(())
}

#[tokio::test]
async fn development_propagates_broken_migration_history() -> Result<()> {
    let db = setup_empty_db().await?;
    let schema = DatabaseSchema::new(&db, Backend::Sqlite, TARGET);
    schema.migrate().await?;
    corrupt_migration_history(&db).await?;

    let err = provision(Environment::Development, &schema)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Migration { .. }));
    Ok(())
}

#[tokio::test]
async fn production_falls_back_when_history_is_broken() -> Result<()> {
    let db = setup_empty_db().await?;
    let schema = DatabaseSchema::new(&db, Backend::Sqlite, TARGET);
    schema.migrate().await?;
    corrupt_migration_history(&db).await?;

    let repo = author_repo(&db);
    let report = run_startup(
        Environment::Production,
        SeedFailurePolicy::Fatal,
        &schema,
        &repo,
    )
    .await?;

    assert_eq!(
        report.schema.map(|s| s.method),
        Some(ProvisionMethod::Created)
    );
    assert_eq!(report.seed, Some(SeedOutcome::Seeded { inserted: 3 }));
    assert_eq!(repo.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn development_startup_tolerates_broken_history() -> Result<()> {
    let db = setup_empty_db().await?;
    let schema = DatabaseSchema::new(&db, Backend::Sqlite, TARGET);
    schema.migrate().await?;
    corrupt_migration_history(&db).await?;

    let repo = author_repo(&db);
    let report = run_startup(
        Environment::Development,
        SeedFailurePolicy::Tolerate,
        &schema,
        &repo,
    )
    .await?;

    assert!(report.schema.is_none());
    assert!(report.seed.is_none());
    assert_eq!(report.tolerated, vec![ErrorKind::Migration]);
    assert_eq!(repo.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn bootstrap_provisions_and_seeds_file_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bookshelf.db");
    let config = AppConfig {
        default_connection: format!("sqlite://{}?mode=rwc", path.display()),
        ..AppConfig::default()
    };

    let first = bootstrap(&config).await?;
    assert_eq!(
        first.report.schema.map(|s| s.method),
        Some(ProvisionMethod::Migrated { applied: 3 })
    );
    assert_eq!(first.report.seed, Some(SeedOutcome::Seeded { inserted: 3 }));
    first.db.close().await?;

    // A restart against the same file changes nothing.
    let second = bootstrap(&config).await?;
    assert_eq!(
        second.report.schema.map(|s| s.method),
        Some(ProvisionMethod::Migrated { applied: 0 })
    );
    assert_eq!(second.report.seed, Some(SeedOutcome::AlreadyPopulated));
    assert!(!second.report.is_degraded());
    assert_eq!(author_repo(&second.db).count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn bootstrap_rejects_production_without_connection() {
    let config = AppConfig {
        environment: Environment::Production,
        ..AppConfig::default()
    };

    let err = match bootstrap(&config).await {
        Ok(_) => panic!("bootstrap should fail without a production connection"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
