//! Tag entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::blog_post_tag::Entity")]
    BlogPostTag,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        super::blog_post_tag::Relation::Post.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::blog_post_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for quire_core::domain::Tag {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<quire_core::domain::Tag> for ActiveModel {
    fn from(tag: quire_core::domain::Tag) -> Self {
        Self {
            id: Set(tag.id),
            name: Set(tag.name),
            slug: Set(tag.slug),
            created_at: Set(tag.created_at.into()),
            updated_at: Set(tag.updated_at.into()),
        }
    }
}
