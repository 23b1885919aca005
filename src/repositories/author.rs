//! Author repository for database operations

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryOrder};
use std::sync::Arc;

use crate::models::author::{self, Entity as Author};

/// Repository for author database operations
#[derive(Debug, Clone)]
pub struct AuthorRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl AuthorRepository {
    /// Creates a new AuthorRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns whether at least one author row exists.
    ///
    /// Issues a single `LIMIT 1` select rather than counting the table.
    pub async fn any_exists(&self) -> Result<bool, DbErr> {
        let first = Author::find().one(&*self.db).await?;
        Ok(first.is_some())
    }

    /// Inserts authors in one statement, skipping rows that collide with the
    /// `(first_name, last_name, birth_date)` identity index.
    ///
    /// Returns the number of rows actually inserted, which is zero when every
    /// author already exists (for example when another instance seeded first).
    pub async fn insert_if_absent(&self, authors: Vec<author::ActiveModel>) -> Result<u64, DbErr> {
        if authors.is_empty() {
            return Ok(0);
        }

        Author::insert_many(authors)
            .on_conflict(
                OnConflict::columns([
                    author::Column::FirstName,
                    author::Column::LastName,
                    author::Column::BirthDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
    }

    /// Finds an author by id
    pub async fn find_by_id(&self, id: i32) -> Result<Option<author::Model>, DbErr> {
        Author::find_by_id(id).one(&*self.db).await
    }

    /// Lists all authors ordered by id
    pub async fn list_all(&self) -> Result<Vec<author::Model>, DbErr> {
        Author::find()
            .order_by_asc(author::Column::Id)
            .all(&*self.db)
            .await
    }

    /// Counts author rows
    pub async fn count(&self) -> Result<u64, DbErr> {
        Author::find().count(&*self.db).await
    }
}
