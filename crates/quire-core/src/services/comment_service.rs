//! Comment threads: two-level listing, approval, the edit window and the
//! approved-comment count.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{
    Author, COMMENT_EDIT_WINDOW_MINUTES, Comment, CommentView, Page, PageRequest, Post,
    validate_comment_content,
};
use crate::error::{DomainError, DomainResult};
use crate::ports::{Cache, CacheKey, Clock, CommentRepository, PostRepository, UserRepository};

/// Top-level comments per page.
pub const COMMENTS_PER_PAGE: u64 = 20;

/// Upper bound on how long a cached count lives if an invalidation is lost.
pub const DEFAULT_COUNT_TTL: Duration = Duration::from_secs(600);

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    count_ttl: Option<Duration>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
            cache,
            clock,
            count_ttl: Some(DEFAULT_COUNT_TTL),
        }
    }

    /// Override the count TTL. `None` keeps counts until invalidated.
    pub fn with_count_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.count_ttl = ttl;
        self
    }

    /// Approved top-level comments of a post, newest first, each with all of
    /// its direct replies and authors attached.
    pub async fn list_approved(&self, post_id: Uuid, page: u64) -> DomainResult<Page<CommentView>> {
        self.live_post(post_id).await?;

        let request = PageRequest::new(page, COMMENTS_PER_PAGE);
        let top_level = self
            .comments
            .list_top_level_approved(post_id, request)
            .await?;

        let parent_ids: Vec<Uuid> = top_level.items.iter().map(|c| c.id).collect();
        let replies = if parent_ids.is_empty() {
            Vec::new()
        } else {
            self.comments.replies_of(&parent_ids).await?
        };

        let authors = self
            .authors_for(top_level.items.iter().chain(replies.iter()))
            .await?;

        let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_id {
                let author = authors.get(&reply.user_id).cloned();
                replies_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(CommentView::new(reply, author));
            }
        }

        Ok(top_level.map(|comment| {
            let author = authors.get(&comment.user_id).cloned();
            let replies = replies_by_parent.remove(&comment.id).unwrap_or_default();
            let mut view = CommentView::new(comment, author);
            view.replies = replies;
            view
        }))
    }

    /// Create an approved top-level comment on a published post.
    pub async fn create(
        &self,
        post_id: Uuid,
        actor: Option<Uuid>,
        content: &str,
    ) -> DomainResult<CommentView> {
        let actor = require_actor(actor)?;
        let post = self.live_post(post_id).await?;
        let content = validate_comment_content(content)?;
        ensure_open_for_comments(&post)?;

        let comment = Comment::top_level(post.id, actor, content, self.clock.now());
        let saved = self.comments.save(comment).await?;
        self.invalidate_count(saved.blog_post_id).await;

        tracing::info!(comment_id = %saved.id, post_id = %saved.blog_post_id, "Comment created");
        self.view_with_author(saved).await
    }

    /// Reply to `parent_id`. The reply always lands on the parent's post;
    /// a caller claiming another post is rejected.
    pub async fn reply(
        &self,
        parent_id: Uuid,
        actor: Option<Uuid>,
        content: &str,
        claimed_post_id: Option<Uuid>,
    ) -> DomainResult<CommentView> {
        let actor = require_actor(actor)?;
        let parent = self.find_comment(parent_id).await?;

        if let Some(claimed) = claimed_post_id {
            if claimed != parent.blog_post_id {
                tracing::warn!(
                    parent_id = %parent.id,
                    claimed_post_id = %claimed,
                    "Rejected cross-post reply"
                );
                return Err(DomainError::Consistency(format!(
                    "comment {} does not belong to post {claimed}",
                    parent.id
                )));
            }
        }

        let post = self.live_post(parent.blog_post_id).await?;
        let content = validate_comment_content(content)?;
        ensure_open_for_comments(&post)?;

        let reply = Comment::reply_to(&parent, actor, content, self.clock.now());
        let saved = self.comments.save(reply).await?;
        self.invalidate_count(saved.blog_post_id).await;

        tracing::info!(comment_id = %saved.id, parent_id = %parent.id, "Reply created");
        let mut view = self.view_with_author(saved).await?;
        view.parent = Some(Box::new(self.view_with_author(parent).await?));
        Ok(view)
    }

    /// Edit content. Only the author, and only within the edit window.
    pub async fn update(
        &self,
        comment_id: Uuid,
        actor: Option<Uuid>,
        content: &str,
    ) -> DomainResult<CommentView> {
        let actor = require_actor(actor)?;
        let mut comment = self.find_comment(comment_id).await?;
        let now = self.clock.now();

        if !comment.is_authored_by(actor) {
            return Err(DomainError::Unauthorized(
                "only the author may edit a comment".to_string(),
            ));
        }
        if !comment.within_edit_window(now) {
            return Err(DomainError::Unauthorized(format!(
                "comments can only be edited within {COMMENT_EDIT_WINDOW_MINUTES} minutes"
            )));
        }

        comment.content = validate_comment_content(content)?;
        comment.updated_at = now;
        let saved = self.comments.save(comment).await?;

        tracing::info!(comment_id = %saved.id, "Comment updated");
        let mut view = self.view_with_author(saved).await?;
        view.replies = self.reply_views(view.comment.id).await?;
        Ok(view)
    }

    /// Hard-delete a comment and its whole reply subtree. Returns how many
    /// comments were removed.
    pub async fn delete(&self, comment_id: Uuid, actor: Option<Uuid>) -> DomainResult<u64> {
        let actor = require_actor(actor)?;
        let comment = self.find_comment(comment_id).await?;

        if !comment.is_authored_by(actor) {
            return Err(DomainError::Unauthorized(
                "only the author may delete a comment".to_string(),
            ));
        }

        let removed = self.comments.delete_thread(comment.id).await?;
        self.invalidate_count(comment.blog_post_id).await;

        tracing::info!(comment_id = %comment.id, removed, "Comment thread deleted");
        Ok(removed)
    }

    /// Mark a comment approved. Any authenticated actor may approve.
    pub async fn approve(&self, comment_id: Uuid, actor: Option<Uuid>) -> DomainResult<CommentView> {
        let actor = require_actor(actor)?;
        let mut comment = self.find_comment(comment_id).await?;

        if !comment.is_approved {
            comment.is_approved = true;
            comment.updated_at = self.clock.now();
            comment = self.comments.save(comment).await?;
            self.invalidate_count(comment.blog_post_id).await;
            tracing::info!(comment_id = %comment.id, approved_by = %actor, "Comment approved");
        }

        let mut view = self.view_with_author(comment).await?;
        view.replies = self.reply_views(view.comment.id).await?;
        Ok(view)
    }

    /// A single comment with author, replies and parent. Unapproved comments
    /// are visible to their author only.
    pub async fn show(&self, comment_id: Uuid, viewer: Option<Uuid>) -> DomainResult<CommentView> {
        let comment = self.find_comment(comment_id).await?;
        if !comment.is_visible_to(viewer) {
            return Err(DomainError::Unauthorized(
                "comment is awaiting approval".to_string(),
            ));
        }

        let parent = match comment.parent_id {
            Some(parent_id) => self.comments.find_by_id(parent_id).await?,
            None => None,
        };

        let mut view = self.view_with_author(comment).await?;
        view.replies = self.reply_views(view.comment.id).await?;
        if let Some(parent) = parent {
            view.parent = Some(Box::new(self.view_with_author(parent).await?));
        }
        Ok(view)
    }

    /// Approved comments on a post, replies included.
    ///
    /// Served from the cache when present; a miss recomputes from the store
    /// with a single aggregate query. Cached values are tagged with the
    /// post's count generation, so a recount that started before an
    /// invalidation can never be served after it.
    pub async fn count_approved(&self, post_id: Uuid) -> DomainResult<u64> {
        let key = CacheKey::ApprovedCommentCount(post_id);
        let generation = self.count_generation(post_id).await;

        if let Some(cached) = self.cache.get(&key).await {
            match parse_tagged_count(&cached) {
                Some((tag, count)) if tag == generation => return Ok(count),
                Some(_) => {
                    tracing::debug!(%key, generation, "Cached count is from an older generation")
                }
                None => tracing::warn!(%key, "Discarding unreadable cached count"),
            }
        }

        let count = self.comments.count_approved(post_id).await?;
        let value = format!("{generation}:{count}");
        if let Err(e) = self.cache.set(&key, &value, self.count_ttl).await {
            tracing::warn!(%key, error = %e, "Failed to cache approved comment count");
        }
        Ok(count)
    }

    /// Drop the cached count of a post, e.g. after the post itself is gone.
    ///
    /// Bumps the generation first, which also fences off any recount that
    /// is still in flight.
    pub async fn invalidate_count(&self, post_id: Uuid) {
        let generation = CacheKey::CountGeneration(post_id);
        if let Err(e) = self.cache.incr(&generation).await {
            tracing::error!(key = %generation, error = %e, "Failed to bump count generation");
        }

        let key = CacheKey::ApprovedCommentCount(post_id);
        if let Err(e) = self.cache.invalidate(&key).await {
            tracing::error!(%key, error = %e, "Failed to invalidate approved comment count");
        }
    }

    async fn count_generation(&self, post_id: Uuid) -> u64 {
        self.cache
            .get(&CacheKey::CountGeneration(post_id))
            .await
            .and_then(|g| g.parse().ok())
            .unwrap_or(0)
    }

    async fn live_post(&self, post_id: Uuid) -> DomainResult<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .filter(|post| !post.is_trashed())
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    async fn find_comment(&self, comment_id: Uuid) -> DomainResult<Comment> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", comment_id))
    }

    async fn authors_for<'a>(
        &self,
        comments: impl Iterator<Item = &'a Comment>,
    ) -> DomainResult<HashMap<Uuid, Author>> {
        let ids: HashSet<Uuid> = comments.map(|c| c.user_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let users = self.users.find_many(&ids).await?;
        Ok(users.iter().map(|u| (u.id, Author::from(u))).collect())
    }

    async fn view_with_author(&self, comment: Comment) -> DomainResult<CommentView> {
        let author = self
            .users
            .find_by_id(comment.user_id)
            .await?
            .map(|user| Author::from(&user));
        Ok(CommentView::new(comment, author))
    }

    async fn reply_views(&self, parent_id: Uuid) -> DomainResult<Vec<CommentView>> {
        let replies = self.comments.replies_of(&[parent_id]).await?;
        let authors = self.authors_for(replies.iter()).await?;
        Ok(replies
            .into_iter()
            .map(|reply| {
                let author = authors.get(&reply.user_id).cloned();
                CommentView::new(reply, author)
            })
            .collect())
    }
}

fn require_actor(actor: Option<Uuid>) -> DomainResult<Uuid> {
    actor.ok_or(DomainError::Unauthenticated)
}

fn ensure_open_for_comments(post: &Post) -> DomainResult<()> {
    if post.is_published {
        Ok(())
    } else {
        Err(DomainError::Unauthorized(
            "comments are only accepted on published posts".to_string(),
        ))
    }
}

/// Split a cached `"{generation}:{count}"` value.
fn parse_tagged_count(value: &str) -> Option<(u64, u64)> {
    let (generation, count) = value.split_once(':')?;
    Some((generation.parse().ok()?, count.parse().ok()?))
}

