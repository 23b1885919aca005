//! Author endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::error::ApiError;
use crate::handlers::types::{AuthorResponse, BookResponse};
use crate::repositories::{AuthorRepository, BookRepository};
use crate::server::AppState;

/// Lists every author ordered by id
#[utoipa::path(
    get,
    path = "/authors",
    responses(
        (status = 200, description = "All authors", body = [AuthorResponse]),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "authors"
)]
pub async fn list_authors(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuthorResponse>>, ApiError> {
    let repo = AuthorRepository::new(Arc::new(state.db.clone()));
    let authors = repo.list_all().await?;
    Ok(Json(authors.into_iter().map(AuthorResponse::from).collect()))
}

/// Lists the books written by one author
#[utoipa::path(
    get,
    path = "/authors/{id}/books",
    params(
        ("id" = i32, Path, description = "Author id")
    ),
    responses(
        (status = 200, description = "Books by the author", body = [BookResponse]),
        (status = 404, description = "Author not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "authors"
)]
pub async fn list_author_books(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let db = Arc::new(state.db.clone());

    AuthorRepository::new(db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Author {} not found", id)))?;

    let books = BookRepository::new(db).list_by_author(id).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}
