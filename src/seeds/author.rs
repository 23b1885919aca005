//! Reference author seeding
//!
//! Seeds the authors table with three fixed authors when it is empty. The
//! insert ignores identity conflicts, so replicas starting together against
//! one store still end up with exactly three reference rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{DbErr, Set};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::ErrorKind;
use crate::models::author;
use crate::repositories::AuthorRepository;

/// A fixed reference author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedAuthor {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub birth_date: NaiveDate,
}

impl SeedAuthor {
    pub fn active_model(&self) -> author::ActiveModel {
        author::ActiveModel {
            first_name: Set(self.first_name.to_string()),
            last_name: Set(self.last_name.to_string()),
            birth_date: Set(self.birth_date),
            ..Default::default()
        }
    }
}

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid seed date"),
    }
}

pub const SEED_AUTHORS: [SeedAuthor; 3] = [
    SeedAuthor {
        first_name: "Author 1",
        last_name: "Author 1",
        birth_date: ymd(1981, 1, 1),
    },
    SeedAuthor {
        first_name: "Author 2",
        last_name: "Author 2",
        birth_date: ymd(1982, 2, 2),
    },
    SeedAuthor {
        first_name: "Author 3",
        last_name: "Author 3",
        birth_date: ymd(1983, 3, 3),
    },
];

/// Storage operations the seeder needs.
#[async_trait]
pub trait AuthorSeedStore: Send + Sync {
    async fn has_authors(&self) -> Result<bool, DbErr>;

    /// Inserts `authors` in one batch, skipping any that already exist.
    async fn insert_authors_if_absent(&self, authors: &[SeedAuthor]) -> Result<u64, DbErr>;
}

#[async_trait]
impl AuthorSeedStore for AuthorRepository {
    async fn has_authors(&self) -> Result<bool, DbErr> {
        self.any_exists().await
    }

    async fn insert_authors_if_absent(&self, authors: &[SeedAuthor]) -> Result<u64, DbErr> {
        let models = authors.iter().map(SeedAuthor::active_model).collect();
        self.insert_if_absent(models).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { inserted: u64 },
    AlreadyPopulated,
    /// The existence check and the insert both failed and the failure was
    /// tolerated. Produced from [`SeedError::tolerated_outcome`].
    SkippedDueToCheckFailure,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to insert reference authors: {source}")]
    Insert { source: DbErr },
    #[error("failed to insert reference authors after the existence check failed ({check}): {source}")]
    Unverified { check: DbErr, source: DbErr },
}

impl SeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeedError::Insert { .. } | SeedError::Unverified { .. } => ErrorKind::SeedInsert,
        }
    }

    /// Whether the existence check had already failed before the insert.
    pub fn check_failed(&self) -> bool {
        matches!(self, SeedError::Unverified { .. })
    }

    /// Outcome to report when the caller decides to continue anyway.
    pub fn tolerated_outcome(&self) -> Option<SeedOutcome> {
        match self {
            SeedError::Insert { .. } => None,
            SeedError::Unverified { .. } => Some(SeedOutcome::SkippedDueToCheckFailure),
        }
    }
}

/// Inserts [`SEED_AUTHORS`] unless at least one author already exists.
///
/// A failing existence check is treated as an empty table. Insert failures
/// are always returned; whether they stop startup is the caller's decision.
pub async fn seed_if_empty<S>(store: &S) -> Result<SeedOutcome, SeedError>
where
    S: AuthorSeedStore + ?Sized,
{
    let check_error = match store.has_authors().await {
        Ok(true) => {
            info!(outcome = "already_populated", "authors table already populated; skipping seeding");
            return Ok(SeedOutcome::AlreadyPopulated);
        }
        Ok(false) => None,
        Err(err) => {
            warn!(error = %err, "author existence check failed; treating table as empty");
            Some(err)
        }
    };

    info!(count = SEED_AUTHORS.len(), "seeding reference authors");
    match store.insert_authors_if_absent(&SEED_AUTHORS).await {
        Ok(0) => {
            info!(outcome = "already_populated", "reference authors were inserted concurrently");
            Ok(SeedOutcome::AlreadyPopulated)
        }
        Ok(inserted) => {
            info!(outcome = "seeded", inserted, "database seeding complete");
            Ok(SeedOutcome::Seeded { inserted })
        }
        Err(source) => {
            error!(
                outcome = "failed",
                check_failed = check_error.is_some(),
                error = %source,
                "failed to insert reference authors"
            );
            Err(match check_error {
                Some(check) => SeedError::Unverified { check, source },
                None => SeedError::Insert { source },
            })
        }
    }
}
