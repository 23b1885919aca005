//! Review repository for database operations

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::models::review::{self, Entity as Review};

/// Repository for review database operations
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ReviewRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists the reviews of one book, newest first
    pub async fn list_by_book(&self, book_id: i32) -> Result<Vec<review::Model>, DbErr> {
        Review::find()
            .filter(review::Column::BookId.eq(book_id))
            .order_by_desc(review::Column::CreatedAt)
            .order_by_desc(review::Column::Id)
            .all(&*self.db)
            .await
    }
}
