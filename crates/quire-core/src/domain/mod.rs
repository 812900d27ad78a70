//! Domain entities - the core business objects.

mod comment;
mod pagination;
mod post;
mod slug;
mod tag;
mod user;

pub use comment::{
    COMMENT_EDIT_WINDOW_MINUTES, COMMENT_MAX_CHARS, COMMENT_MIN_CHARS, Comment, CommentView,
    validate_comment_content,
};
pub use pagination::{Page, PageRequest};
pub use post::{
    ChangedFields, NewPost, Post, PostChanges, PostDetail, PostFilter, PostSummary, TITLE_MAX_CHARS,
};
pub use slug::slugify;
pub use tag::{Tag, TagCount};
pub use user::{Author, User};
