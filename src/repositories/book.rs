//! Book repository for database operations

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::models::book::{self, Entity as Book};

/// Repository for book database operations
#[derive(Debug, Clone)]
pub struct BookRepository {
    pub db: Arc<DatabaseConnection>,
}

impl BookRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a book by id
    pub async fn find_by_id(&self, id: i32) -> Result<Option<book::Model>, DbErr> {
        Book::find_by_id(id).one(&*self.db).await
    }

    /// Lists the books of one author ordered by id
    pub async fn list_by_author(&self, author_id: i32) -> Result<Vec<book::Model>, DbErr> {
        Book::find()
            .filter(book::Column::AuthorId.eq(author_id))
            .order_by_asc(book::Column::Id)
            .all(&*self.db)
            .await
    }
}
