//! PostgreSQL user and tag repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, Order, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, TransactionTrait,
};
use uuid::Uuid;

use quire_core::domain::{Tag, TagCount, User};
use quire_core::error::RepoError;
use quire_core::ports::{TagRepository, UserRepository};

use super::entity::blog_post_tag::{self, Entity as BlogPostTagEntity};
use super::entity::post;
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = match email.split_once('@') {
            Some((local, domain)) => {
                let first: String = local.chars().take(1).collect();
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        };
        tracing::debug!(user_email = %masked, "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromQueryResult)]
struct TagUsage {
    tag_id: Uuid,
    posts_count: i64,
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_or_create(&self, tag: Tag) -> Result<Tag, RepoError> {
        let slug = tag.slug.clone();
        let active_model: tag::ActiveModel = tag.into();

        // A concurrent insert of the same slug is absorbed by the conflict
        // clause; the re-read below returns whichever row won.
        TagEntity::insert(active_model)
            .on_conflict(OnConflict::column(tag::Column::Slug).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        TagEntity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(Into::into)
            .ok_or(RepoError::NotFound)
    }

    async fn sync_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        BlogPostTagEntity::delete_many()
            .filter(blog_post_tag::Column::BlogPostId.eq(post_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if !tag_ids.is_empty() {
            let links = tag_ids.iter().map(|tag_id| blog_post_tag::ActiveModel {
                blog_post_id: sea_orm::Set(post_id),
                tag_id: sea_orm::Set(*tag_id),
            });
            BlogPostTagEntity::insert_many(links)
                .on_conflict(
                    OnConflict::columns([
                        blog_post_tag::Column::BlogPostId,
                        blog_post_tag::Column::TagId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)
    }

    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, Tag)>, RepoError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let links = BlogPostTagEntity::find()
            .filter(blog_post_tag::Column::BlogPostId.is_in(post_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let tag_ids: Vec<Uuid> = links.iter().map(|l| l.tag_id).collect();
        let tags: HashMap<Uuid, Tag> = TagEntity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|m| (m.id, Tag::from(m)))
            .collect();

        let mut pairs: Vec<(Uuid, Tag)> = links
            .into_iter()
            .filter_map(|l| tags.get(&l.tag_id).map(|t| (l.blog_post_id, t.clone())))
            .collect();
        pairs.sort_by(|a, b| (a.0, &a.1.name).cmp(&(b.0, &b.1.name)));
        Ok(pairs)
    }

    async fn popular(&self, limit: u64) -> Result<Vec<TagCount>, RepoError> {
        let usage = BlogPostTagEntity::find()
            .select_only()
            .column(blog_post_tag::Column::TagId)
            .column_as(
                Expr::col((blog_post_tag::Entity, blog_post_tag::Column::BlogPostId)).count(),
                "posts_count",
            )
            .join(JoinType::InnerJoin, blog_post_tag::Relation::Post.def())
            .join(JoinType::InnerJoin, blog_post_tag::Relation::Tag.def())
            .filter(post::Column::IsPublished.eq(true))
            .filter(post::Column::DeletedAt.is_null())
            .group_by(blog_post_tag::Column::TagId)
            .group_by(tag::Column::Name)
            .order_by(Expr::cust("posts_count"), Order::Desc)
            .order_by_asc(tag::Column::Name)
            .limit(limit)
            .into_model::<TagUsage>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        if usage.is_empty() {
            return Ok(Vec::new());
        }

        let mut tags: HashMap<Uuid, Tag> = TagEntity::find()
            .filter(tag::Column::Id.is_in(usage.iter().map(|u| u.tag_id).collect::<Vec<_>>()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|m| (m.id, Tag::from(m)))
            .collect();

        Ok(usage
            .into_iter()
            .filter_map(|u| {
                tags.remove(&u.tag_id).map(|tag| TagCount {
                    tag,
                    posts_count: u.posts_count.max(0) as u64,
                })
            })
            .collect())
    }
}
