//! # Bookshelf Library
//!
//! Authors, books and reviews service. Startup provisions the database schema
//! for the current environment and seeds reference authors before any request
//! is served.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod provision;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod startup;
pub mod telemetry;
pub use migration;
