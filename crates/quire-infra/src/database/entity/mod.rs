//! SeaORM entities. Each converts to and from its domain type.

pub mod blog_post_tag;
pub mod comment;
pub mod post;
pub mod tag;
pub mod user;
