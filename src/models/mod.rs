//! # Data Models
//!
//! SeaORM entities for the authors, books and reviews tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod author;
pub mod book;
pub mod review;

pub use author::Entity as Author;
pub use book::Entity as Book;
pub use review::Entity as Review;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "bookshelf".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
