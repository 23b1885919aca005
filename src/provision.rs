//! Schema provisioning.
//!
//! Brings the backing store to the schema the entities expect. Migrations are
//! authoritative; production alone may fall back to creating the tables
//! directly from the entity definitions when migration history is unusable.

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Environment;
use crate::db::{self, Backend};
use crate::error::ErrorKind;
use crate::models::{author, book, review};

/// A store whose schema can be probed, migrated or created.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    fn backend(&self) -> Backend;

    /// Redacted connection target, for logging.
    fn target(&self) -> &str;

    async fn probe(&self) -> Result<(), DbErr>;

    /// Applies pending migrations and returns how many were applied.
    async fn migrate(&self) -> Result<usize, DbErr>;

    /// Creates every table and index if absent, bypassing migration history.
    async fn create_schema(&self) -> Result<(), DbErr>;
}

/// How the schema reached its ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionMethod {
    Migrated { applied: usize },
    Created,
}

/// Proof that the schema is ready for seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaReady {
    pub backend: Backend,
    pub method: ProvisionMethod,
    /// Whether the initial connectivity probe succeeded.
    pub reachable: bool,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("schema migration failed: {source}")]
    Migration { source: DbErr },
    #[error("schema creation failed after migration error ({migration}): {source}")]
    SchemaCreation { migration: DbErr, source: DbErr },
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::Migration { .. } => ErrorKind::Migration,
            ProvisionError::SchemaCreation { .. } => ErrorKind::SchemaCreation,
        }
    }
}

/// Provisions the schema for `mode`.
///
/// The connectivity probe never aborts: SQLite creates its file on first
/// write, so a failed probe may still be followed by a successful migration.
/// Development propagates migration failures as-is; production retries once
/// with direct schema creation.
pub async fn provision<S>(mode: Environment, schema: &S) -> Result<SchemaReady, ProvisionError>
where
    S: SchemaBackend + ?Sized,
{
    let backend = schema.backend();
    info!(
        environment = %mode,
        backend = %backend,
        target = schema.target(),
        "provisioning database schema"
    );

    let reachable = match schema.probe().await {
        Ok(()) => {
            info!(backend = %backend, "database connectivity probe succeeded");
            true
        }
        Err(err) => {
            warn!(
                backend = %backend,
                error = %err,
                "database connectivity probe failed; attempting provisioning anyway"
            );
            false
        }
    };

    let migration_error = match schema.migrate().await {
        Ok(applied) => {
            info!(method = "migrate", applied, "database schema is up to date");
            return Ok(SchemaReady {
                backend,
                method: ProvisionMethod::Migrated { applied },
                reachable,
            });
        }
        Err(source) if !mode.is_production() => {
            error!(method = "migrate", error = %source, "schema migration failed");
            return Err(ProvisionError::Migration { source });
        }
        Err(err) => {
            warn!(
                method = "migrate",
                error = %err,
                "schema migration failed; falling back to direct schema creation"
            );
            err
        }
    };

    match schema.create_schema().await {
        Ok(()) => {
            info!(method = "create", "database schema created");
            Ok(SchemaReady {
                backend,
                method: ProvisionMethod::Created,
                reachable,
            })
        }
        Err(source) => {
            error!(method = "create", error = %source, "schema creation failed");
            Err(ProvisionError::SchemaCreation {
                migration: migration_error,
                source,
            })
        }
    }
}

/// [`SchemaBackend`] over a live SeaORM connection.
pub struct DatabaseSchema<'a> {
    db: &'a DatabaseConnection,
    backend: Backend,
    target: String,
}

impl<'a> DatabaseSchema<'a> {
    pub fn new(db: &'a DatabaseConnection, backend: Backend, connection: &str) -> Self {
        Self {
            db,
            backend,
            target: db::redact_connection_string(connection),
        }
    }

    async fn create_table<E: EntityTrait>(&self, schema: &Schema, entity: E) -> Result<(), DbErr> {
        let mut stmt = schema.create_table_from_entity(entity);
        stmt.if_not_exists();
        self.db
            .execute(self.db.get_database_backend().build(&stmt))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for DatabaseSchema<'_> {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn probe(&self) -> Result<(), DbErr> {
        db::health_check(self.db).await
    }

    async fn migrate(&self) -> Result<usize, DbErr> {
        let pending = Migrator::get_pending_migrations(self.db).await?.len();
        Migrator::up(self.db, None).await?;
        Ok(pending)
    }

    async fn create_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so foreign keys resolve.
        self.create_table(&schema, author::Entity).await?;
        self.create_table(&schema, book::Entity).await?;
        self.create_table(&schema, review::Entity).await?;

        // Same indexes the migrations create.
        let indexes = [
            Index::create()
                .name("idx_authors_identity")
                .table(author::Entity)
                .col(author::Column::FirstName)
                .col(author::Column::LastName)
                .col(author::Column::BirthDate)
                .unique()
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_books_author_id")
                .table(book::Entity)
                .col(book::Column::AuthorId)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_reviews_book_id")
                .table(review::Entity)
                .col(review::Column::BookId)
                .if_not_exists()
                .to_owned(),
        ];
        for index in &indexes {
            self.db.execute(backend.build(index)).await?;
        }

        Ok(())
    }
}
