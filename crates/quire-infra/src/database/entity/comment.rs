//! Comment entity for SeaORM. Replies point at their parent through
//! `parent_id`; deleting a parent cascades to the whole subtree.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub blog_post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_approved: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::BlogPostId",
        to = "super::post::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Parent,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quire_core::domain::Comment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            blog_post_id: model.blog_post_id,
            user_id: model.user_id,
            parent_id: model.parent_id,
            content: model.content,
            is_approved: model.is_approved,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<quire_core::domain::Comment> for ActiveModel {
    fn from(comment: quire_core::domain::Comment) -> Self {
        Self {
            id: Set(comment.id),
            blog_post_id: Set(comment.blog_post_id),
            user_id: Set(comment.user_id),
            parent_id: Set(comment.parent_id),
            content: Set(comment.content),
            is_approved: Set(comment.is_approved),
            created_at: Set(comment.created_at.into()),
            updated_at: Set(comment.updated_at.into()),
        }
    }
}
