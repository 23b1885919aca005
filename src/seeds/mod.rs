//! Database seeding functionality
//!
//! Reference data inserted at startup so a freshly provisioned store is
//! usable immediately.

pub mod author;

pub use author::{AuthorSeedStore, SEED_AUTHORS, SeedAuthor, SeedError, SeedOutcome, seed_if_empty};
