//! # API Handlers
//!
//! Read-only HTTP endpoints over authors, books and reviews.

use axum::{extract::State, response::Json};

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod authors;
pub mod books;
pub mod types;

pub use authors::{list_author_books, list_authors};
pub use books::list_book_reviews;

use types::HealthResponse;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Reports whether the database answers a trivial query
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "health check failed");
        ApiError::service_unavailable("Database service unavailable")
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
