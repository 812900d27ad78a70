use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogPosts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlogPosts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(BlogPosts::UserId).uuid().not_null())
                    .col(ColumnDef::new(BlogPosts::Title).string_len(255).not_null())
                    .col(ColumnDef::new(BlogPosts::Slug).string().not_null().unique_key())
                    .col(ColumnDef::new(BlogPosts::Excerpt).text().null())
                    .col(ColumnDef::new(BlogPosts::Body).text().not_null())
                    .col(
                        ColumnDef::new(BlogPosts::IsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_posts_user_id")
                            .from(BlogPosts::Table, BlogPosts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listings filter on publication and sort by publish date
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_published")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::IsPublished)
                    .col(BlogPosts::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_user_id")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::UserId)
                    .to_owned(),
            )
            .await?;

        // At most one featured post, enforced by the database as well
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_blog_posts_single_featured \
                 ON blog_posts ((true)) WHERE is_featured",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogPosts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum BlogPosts {
    Table,
    Id,
    UserId,
    Title,
    Slug,
    Excerpt,
    Body,
    IsPublished,
    IsFeatured,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
