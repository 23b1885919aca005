//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases, either migrated or completely empty.

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;

use bookshelf::repositories::AuthorRepository;

/// Opens an in-memory SQLite database without any tables.
pub async fn setup_empty_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = setup_empty_db().await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Wraps the connection in an author repository.
#[allow(dead_code)]
pub fn author_repo(db: &DatabaseConnection) -> AuthorRepository {
    AuthorRepository::new(Arc::new(db.clone()))
}

/// Inserts an author row directly for testing.
#[allow(dead_code)]
pub async fn insert_author(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
    birth_date: &str,
) -> Result<()> {
    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!(
            "INSERT INTO authors (first_name, last_name, birth_date) VALUES ('{}', '{}', '{}')",
            first_name, last_name, birth_date
        ),
    );
    db.execute(stmt).await?;
    Ok(())
}

/// Returns whether a table with the given name exists in the SQLite catalog.
#[allow(dead_code)]
pub async fn sqlite_table_exists(db: &DatabaseConnection, table: &str) -> Result<bool> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table.into()],
    );
    Ok(db.query_one(stmt).await?.is_some())
}

/// Names of the explicitly created indexes in the SQLite catalog, sorted.
#[allow(dead_code)]
pub async fn sqlite_index_names(db: &DatabaseConnection) -> Result<Vec<String>> {
    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name"
            .to_string(),
    );
    let mut names = Vec::new();
    for row in db.query_all(stmt).await? {
        names.push(row.try_get::<String>("", "name")?);
    }
    Ok(names)
}
