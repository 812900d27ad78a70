use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Page, PageRequest, Post, PostFilter, Tag, TagCount, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Hard-delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup used to attach authors to listings.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Side effect on other posts' featured flags that must commit together
/// with a post write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeaturedEffect {
    #[default]
    None,
    /// Clear `is_featured` on every other post.
    ClearOthers,
    /// Feature the other published, non-trashed post with the latest
    /// `published_at`, if there is one.
    PromoteLatest,
}

/// Post repository.
///
/// `BaseRepository::find_by_id` returns trashed posts too; `delete` is the
/// permanent delete and cascades to comments and tag links.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Non-trashed post by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Whether any post, trashed or not, other than `except` uses `slug`.
    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError>;

    /// Persist `post` and apply `effect` atomically.
    async fn save_post(&self, post: Post, effect: FeaturedEffect) -> Result<Post, RepoError>;

    /// The featured, published, non-trashed post.
    async fn find_featured(&self) -> Result<Option<Post>, RepoError>;

    /// Published posts, newest `published_at` first, ties by id descending.
    async fn list_published(&self, page: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Latest published posts, optionally skipping one.
    async fn recent_published(
        &self,
        limit: u64,
        except: Option<Uuid>,
    ) -> Result<Vec<Post>, RepoError>;

    /// An owner's non-trashed posts, newest id first.
    async fn list_by_owner(
        &self,
        owner: Uuid,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    /// Published posts carrying the tag with `tag_slug`.
    async fn list_published_by_tag(
        &self,
        tag_slug: &str,
        page: PageRequest,
    ) -> Result<Page<Post>, RepoError>;
}

/// Comment repository.
///
/// `BaseRepository::delete` removes a single row; use `delete_thread` to
/// remove a comment together with its replies.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Approved top-level comments of a post, newest first, ties by id
    /// descending.
    async fn list_top_level_approved(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError>;

    /// Direct replies of the given comments, oldest first.
    async fn replies_of(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>, RepoError>;

    /// Approved comments on a post, replies included. One aggregate query.
    async fn count_approved(&self, post_id: Uuid) -> Result<u64, RepoError>;

    /// Delete a comment and every descendant reply. Returns the number of
    /// rows removed.
    async fn delete_thread(&self, id: Uuid) -> Result<u64, RepoError>;
}

/// Tag repository.
#[async_trait]
pub trait TagRepository: BaseRepository<Tag, Uuid> {
    /// Fetch the tag with `tag.slug`, inserting `tag` if none exists.
    async fn find_or_create(&self, tag: Tag) -> Result<Tag, RepoError>;

    /// Replace a post's tag set.
    async fn sync_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;

    /// Tags of several posts at once, keyed by post id.
    async fn tags_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<(Uuid, Tag)>, RepoError>;

    /// Tags by number of published posts, most used first. Unused tags are
    /// omitted.
    async fn popular(&self, limit: u64) -> Result<Vec<TagCount>, RepoError>;
}
