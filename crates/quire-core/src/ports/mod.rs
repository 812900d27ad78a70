//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod clock;
mod markdown;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheError, CacheKey};
pub use clock::{Clock, SystemClock};
pub use markdown::MarkdownRenderer;
pub use repository::{
    BaseRepository, CommentRepository, FeaturedEffect, PostRepository, TagRepository,
    UserRepository,
};
