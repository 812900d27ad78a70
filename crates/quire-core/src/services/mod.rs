//! Services - use cases composed over the ports.

mod comment_service;
mod post_lifecycle;
mod post_service;

pub use comment_service::{COMMENTS_PER_PAGE, CommentService, DEFAULT_COUNT_TTL};
pub use post_lifecycle::{PostLifecycle, RESERVED_SLUGS};
pub use post_service::{POPULAR_TAGS_LIMIT, POSTS_PER_PAGE, PostService, RECENT_POSTS_LIMIT};
