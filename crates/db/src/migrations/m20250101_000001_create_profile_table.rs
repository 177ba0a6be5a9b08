//! Create profile table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profile::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Profile::Username)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Profile::UsernameLower)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Profile::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Profile::Token).string_len(64).unique_key())
                    .col(ColumnDef::new(Profile::FullName).string_len(256))
                    .col(ColumnDef::new(Profile::Bio).text())
                    .col(ColumnDef::new(Profile::Location).string_len(256))
                    .col(ColumnDef::new(Profile::Sport).string_len(16).not_null())
                    .col(ColumnDef::new(Profile::ProfileImageUrl).string())
                    .col(ColumnDef::new(Profile::CoverImageUrl).string())
                    .col(
                        ColumnDef::new(Profile::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profile::FollowersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profile::FollowingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profile::PostsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profile::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Profile::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: followers_count (for the leaderboard ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_followers_count")
                    .table(Profile::Table)
                    .col(Profile::FollowersCount)
                    .to_owned(),
            )
            .await?;

        // Index: sport (for sport-filtered leaderboard)
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_sport")
                    .table(Profile::Table)
                    .col(Profile::Sport)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Profile {
    Table,
    Id,
    Username,
    UsernameLower,
    PasswordHash,
    Token,
    FullName,
    Bio,
    Location,
    Sport,
    ProfileImageUrl,
    CoverImageUrl,
    IsVerified,
    FollowersCount,
    FollowingCount,
    PostsCount,
    CreatedAt,
    UpdatedAt,
}
