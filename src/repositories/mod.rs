//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! authors, books and reviews tables.

pub mod author;
pub mod book;
pub mod review;

pub use author::AuthorRepository;
pub use book::BookRepository;
pub use review::ReviewRepository;
