//! Database migrations for the Bookshelf service.
//!
//! Migrations are the authoritative schema history for both the SQLite
//! development store and the Postgres production store.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_authors;
mod m2025_01_10_000002_create_books;
mod m2025_01_10_000003_create_reviews;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_authors::Migration),
            Box::new(m2025_01_10_000002_create_books::Migration),
            Box::new(m2025_01_10_000003_create_reviews::Migration),
        ]
    }
}
