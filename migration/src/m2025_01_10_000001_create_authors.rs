//! Migration to create the authors table.
//!
//! The unique identity index over name and birth date backs the
//! conflict-ignoring insert used when seeding reference authors.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Authors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Authors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Authors::FirstName).text().not_null())
                    .col(ColumnDef::new(Authors::LastName).text().not_null())
                    .col(ColumnDef::new(Authors::BirthDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_authors_identity")
                    .table(Authors::Table)
                    .col(Authors::FirstName)
                    .col(Authors::LastName)
                    .col(Authors::BirthDate)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Authors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Authors {
    Table,
    Id,
    FirstName,
    LastName,
    BirthDate,
}
