//! PostgreSQL post repository.
//!
//! Writes that touch the featured flag of other posts run in one
//! transaction holding a transaction-scoped advisory lock, so they apply one
//! after another. Row locks alone cannot serialize them: with no post
//! featured yet there is no row to lock. The partial unique index
//! `idx_blog_posts_single_featured` backs this up in the schema, which is
//! why other posts are cleared before the saved post is written.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Statement, TransactionTrait,
};
use uuid::Uuid;

use quire_core::domain::{Page, PageRequest, Post, PostFilter};
use quire_core::error::RepoError;
use quire_core::ports::{FeaturedEffect, PostRepository};

use super::entity::blog_post_tag;
use super::entity::post::{self, Entity as PostEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err, upsert};

/// Advisory lock key shared by every write that changes featured flags.
const FEATURED_LOCK_KEY: i64 = 0x7175_6972_6566_6561;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Published, non-trashed posts, newest `published_at` first.
fn published() -> Select<PostEntity> {
    PostEntity::find()
        .filter(post::Column::IsPublished.eq(true))
        .filter(post::Column::DeletedAt.is_null())
        .order_by_desc(post::Column::PublishedAt)
        .order_by_desc(post::Column::Id)
}

async fn fetch_page<C: ConnectionTrait>(
    db: &C,
    select: Select<PostEntity>,
    request: PageRequest,
) -> Result<Page<Post>, RepoError> {
    let total = select.clone().count(db).await.map_err(map_db_err)?;
    let items = select
        .offset(request.offset())
        .limit(request.per_page)
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(Page::new(
        items.into_iter().map(Into::into).collect(),
        request,
        total,
    ))
}

async fn lock_featured(txn: &DatabaseTransaction) -> Result<(), RepoError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1)",
        [FEATURED_LOCK_KEY.into()],
    ))
    .await
    .map_err(map_db_err)?;
    Ok(())
}

async fn clear_others(txn: &DatabaseTransaction, saved_id: Uuid) -> Result<(), RepoError> {
    let result = PostEntity::update_many()
        .col_expr(post::Column::IsFeatured, Expr::value(false))
        .filter(post::Column::IsFeatured.eq(true))
        .filter(post::Column::Id.ne(saved_id))
        .exec(txn)
        .await
        .map_err(map_db_err)?;
    tracing::debug!(cleared = result.rows_affected, "Cleared featured flag on other posts");
    Ok(())
}

async fn promote_latest(txn: &DatabaseTransaction, saved_id: Uuid) -> Result<(), RepoError> {
    let latest = published()
        .filter(post::Column::Id.ne(saved_id))
        .one(txn)
        .await
        .map_err(map_db_err)?;

    if let Some(latest) = latest {
        PostEntity::update_many()
            .col_expr(post::Column::IsFeatured, Expr::value(true))
            .filter(post::Column::Id.eq(latest.id))
            .exec(txn)
            .await
            .map_err(map_db_err)?;
        tracing::debug!(post_id = %latest.id, "Promoted latest post to featured");
    }
    Ok(())
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        let mut query = PostEntity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(post::Column::Id.ne(id));
        }

        let count = query.count(&self.db).await.map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn save_post(&self, post: Post, effect: FeaturedEffect) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        if effect != FeaturedEffect::None {
            lock_featured(&txn).await?;
        }

        let saved_id = post.id;
        if effect == FeaturedEffect::ClearOthers {
            clear_others(&txn, saved_id).await?;
        }

        let model = upsert(post::ActiveModel::from(post), &txn)
            .await
            .map_err(map_db_err)?;

        if effect == FeaturedEffect::PromoteLatest {
            promote_latest(&txn, saved_id).await?;
        }

        txn.commit().await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_featured(&self) -> Result<Option<Post>, RepoError> {
        let result = published()
            .filter(post::Column::IsFeatured.eq(true))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list_published(&self, page: PageRequest) -> Result<Page<Post>, RepoError> {
        fetch_page(&self.db, published(), page).await
    }

    async fn recent_published(
        &self,
        limit: u64,
        except: Option<Uuid>,
    ) -> Result<Vec<Post>, RepoError> {
        let mut query = published();
        if let Some(id) = except {
            query = query.filter(post::Column::Id.ne(id));
        }

        let result = query
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list_by_owner(
        &self,
        owner: Uuid,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let mut query = PostEntity::find()
            .filter(post::Column::UserId.eq(owner))
            .filter(post::Column::DeletedAt.is_null());

        query = match filter {
            PostFilter::All => query,
            PostFilter::Published => query.filter(post::Column::IsPublished.eq(true)),
            PostFilter::Draft => query.filter(post::Column::IsPublished.eq(false)),
        };

        fetch_page(&self.db, query.order_by_desc(post::Column::Id), page).await
    }

    async fn list_published_by_tag(
        &self,
        tag_slug: &str,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let tag = TagEntity::find()
            .filter(tag::Column::Slug.eq(tag_slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        let Some(tag) = tag else {
            return Ok(Page::new(Vec::new(), page, 0));
        };

        let tagged = Query::select()
            .column(blog_post_tag::Column::BlogPostId)
            .from(blog_post_tag::Entity)
            .and_where(Expr::col(blog_post_tag::Column::TagId).eq(tag.id))
            .to_owned();

        let query = published().filter(post::Column::Id.in_subquery(tagged));
        fetch_page(&self.db, query, page).await
    }
}
