//! Book endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::error::ApiError;
use crate::handlers::types::ReviewResponse;
use crate::repositories::{BookRepository, ReviewRepository};
use crate::server::AppState;

/// Lists the reviews of one book, newest first
#[utoipa::path(
    get,
    path = "/books/{id}/reviews",
    params(
        ("id" = i32, Path, description = "Book id")
    ),
    responses(
        (status = 200, description = "Reviews of the book", body = [ReviewResponse]),
        (status = 404, description = "Book not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "books"
)]
pub async fn list_book_reviews(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let db = Arc::new(state.db.clone());

    BookRepository::new(db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Book {} not found", id)))?;

    let reviews = ReviewRepository::new(db).list_by_book(id).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}
