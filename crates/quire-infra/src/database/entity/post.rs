//! Blog post entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub excerpt: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::blog_post_tag::Entity")]
    BlogPostTag,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::blog_post_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::blog_post_tag::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quire_core::domain::Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            slug: model.slug,
            excerpt: model.excerpt,
            body: model.body,
            is_published: model.is_published,
            is_featured: model.is_featured,
            published_at: model.published_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            deleted_at: model.deleted_at.map(Into::into),
        }
    }
}

impl From<quire_core::domain::Post> for ActiveModel {
    fn from(post: quire_core::domain::Post) -> Self {
        Self {
            id: Set(post.id),
            user_id: Set(post.user_id),
            title: Set(post.title),
            slug: Set(post.slug),
            excerpt: Set(post.excerpt),
            body: Set(post.body),
            is_published: Set(post.is_published),
            is_featured: Set(post.is_featured),
            published_at: Set(post.published_at.map(Into::into)),
            created_at: Set(post.created_at.into()),
            updated_at: Set(post.updated_at.into()),
            deleted_at: Set(post.deleted_at.map(Into::into)),
        }
    }
}
