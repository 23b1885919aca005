//! # Server Configuration
//!
//! Router assembly and the HTTP listener. The listener is only started after
//! startup bootstrap has returned.

use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/authors", get(handlers::list_authors))
        .route("/authors/{id}/books", get(handlers::list_author_books))
        .route("/books/{id}/reviews", get(handlers::list_book_reviews))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState { db };
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        address = %addr,
        environment = %config.environment,
        "server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::authors::list_authors,
        crate::handlers::authors::list_author_books,
        crate::handlers::books::list_book_reviews,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::types::HealthResponse,
            crate::handlers::types::AuthorResponse,
            crate::handlers::types::BookResponse,
            crate::handlers::types::ReviewResponse,
        )
    ),
    info(
        title = "Bookshelf API",
        description = "Read-only API over authors, books and reviews",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
