//! PostgreSQL comment repository.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use quire_core::domain::{Comment, Page, PageRequest};
use quire_core::error::RepoError;
use quire_core::ports::CommentRepository;

use super::entity::comment::{self, Entity as CommentEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_top_level_approved(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let query = CommentEntity::find()
            .filter(comment::Column::BlogPostId.eq(post_id))
            .filter(comment::Column::ParentId.is_null())
            .filter(comment::Column::IsApproved.eq(true));

        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let items = query
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .offset(page.offset())
            .limit(page.per_page)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            items.into_iter().map(Into::into).collect(),
            page,
            total,
        ))
    }

    async fn replies_of(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>, RepoError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = CommentEntity::find()
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count_approved(&self, post_id: Uuid) -> Result<u64, RepoError> {
        CommentEntity::find()
            .filter(comment::Column::BlogPostId.eq(post_id))
            .filter(comment::Column::IsApproved.eq(true))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn delete_thread(&self, id: Uuid) -> Result<u64, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let exists = CommentEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?;
        if exists.is_none() {
            return Err(RepoError::NotFound);
        }

        // Walk the reply tree level by level.
        let mut thread = vec![id];
        let mut frontier = vec![id];
        while !frontier.is_empty() {
            frontier = CommentEntity::find()
                .select_only()
                .column(comment::Column::Id)
                .filter(comment::Column::ParentId.is_in(frontier))
                .into_tuple::<Uuid>()
                .all(&txn)
                .await
                .map_err(map_db_err)?;
            thread.extend(frontier.iter().copied());
        }

        let result = CommentEntity::delete_many()
            .filter(comment::Column::Id.is_in(thread))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}
