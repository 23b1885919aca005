//! # API Response Types
//!
//! Response bodies for the author, book and review endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{author, book, review};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    #[schema(value_type = String, format = Date, example = "1981-01-01")]
    pub birth_date: NaiveDate,
}

impl From<author::Model> for AuthorResponse {
    fn from(model: author::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            birth_date: model.birth_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    #[schema(value_type = Option<String>, format = Date)]
    pub published_on: Option<NaiveDate>,
}

impl From<book::Model> for BookResponse {
    fn from(model: book::Model) -> Self {
        Self {
            id: model.id,
            author_id: model.author_id,
            title: model.title,
            published_on: model.published_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub book_id: i32,
    pub reviewer: String,
    /// Rating on a 1-5 scale
    pub rating: i32,
    pub body: Option<String>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl From<review::Model> for ReviewResponse {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            book_id: model.book_id,
            reviewer: model.reviewer,
            rating: model.rating,
            body: model.body,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}
