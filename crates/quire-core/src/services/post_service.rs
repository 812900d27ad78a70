//! Post use cases. Every write runs the lifecycle hooks explicitly before
//! handing the post and its featured side effect to the repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use super::{CommentService, PostLifecycle};
use crate::domain::{
    Author, NewPost, Page, PageRequest, Post, PostChanges, PostDetail, PostFilter, PostSummary,
    Tag, TagCount,
};
use crate::error::{DomainError, DomainResult};
use crate::ports::{
    Clock, FeaturedEffect, MarkdownRenderer, PostRepository, TagRepository, UserRepository,
};

pub const POSTS_PER_PAGE: u64 = 10;
pub const RECENT_POSTS_LIMIT: u64 = 3;
pub const POPULAR_TAGS_LIMIT: u64 = 10;

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    tags: Arc<dyn TagRepository>,
    users: Arc<dyn UserRepository>,
    comments: Arc<CommentService>,
    markdown: Arc<dyn MarkdownRenderer>,
    clock: Arc<dyn Clock>,
    lifecycle: PostLifecycle,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        tags: Arc<dyn TagRepository>,
        users: Arc<dyn UserRepository>,
        comments: Arc<CommentService>,
        markdown: Arc<dyn MarkdownRenderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lifecycle = PostLifecycle::new(posts.clone(), clock.clone());
        Self {
            posts,
            tags,
            users,
            comments,
            markdown,
            clock,
            lifecycle,
        }
    }

    /// Create a post owned by `owner`.
    ///
    /// Tags are resolved before the post is written, so an error there
    /// leaves nothing behind. Linking them runs after the post commits; if
    /// only that step fails the post exists without tags and the error is
    /// returned.
    pub async fn create(&self, owner: Option<Uuid>, input: NewPost) -> DomainResult<Post> {
        let owner = owner.ok_or(DomainError::Unauthenticated)?;
        input.validate()?;

        let tag_ids = self.resolve_tags(&input.tags).await?;
        let mut post = Post::new(owner, &input, self.clock.now());
        let effect = self.lifecycle.on_creating(&mut post).await?;
        let saved = self.posts.save_post(post, effect).await?;

        if !tag_ids.is_empty() {
            self.link_tags(saved.id, &tag_ids).await?;
        }

        tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post created");
        Ok(saved)
    }

    /// Apply `changes` to a post the actor owns. Tags follow the same
    /// ordering as [`PostService::create`].
    pub async fn update(
        &self,
        actor: Option<Uuid>,
        post_id: Uuid,
        changes: PostChanges,
    ) -> DomainResult<Post> {
        let actor = actor.ok_or(DomainError::Unauthenticated)?;
        let before = self.live_post(post_id).await?;
        ensure_owner(&before, actor)?;
        changes.validate()?;

        let tag_ids = match &changes.tags {
            Some(names) => Some(self.resolve_tags(names).await?),
            None => None,
        };
        let mut post = before.clone();
        post.apply(&changes);
        let effect = self.lifecycle.on_updating(&before, &mut post).await?;
        post.updated_at = self.clock.now();
        let saved = self.posts.save_post(post, effect).await?;

        if let Some(tag_ids) = tag_ids {
            self.link_tags(saved.id, &tag_ids).await?;
        }

        tracing::info!(post_id = %saved.id, "Post updated");
        Ok(saved)
    }

    /// Soft delete. A featured post hands the flag to the latest other
    /// published post.
    pub async fn delete(&self, actor: Option<Uuid>, post_id: Uuid) -> DomainResult<()> {
        let actor = actor.ok_or(DomainError::Unauthenticated)?;
        let mut post = self.live_post(post_id).await?;
        ensure_owner(&post, actor)?;

        let now = self.clock.now();
        post.deleted_at = Some(now);
        post.updated_at = now;
        let effect = if post.is_featured {
            post.is_featured = false;
            FeaturedEffect::PromoteLatest
        } else {
            FeaturedEffect::None
        };
        self.posts.save_post(post, effect).await?;

        tracing::info!(post_id = %post_id, "Post moved to trash");
        Ok(())
    }

    /// Bring a soft-deleted post back. It comes back unfeatured.
    pub async fn restore(&self, actor: Option<Uuid>, post_id: Uuid) -> DomainResult<Post> {
        let actor = actor.ok_or(DomainError::Unauthenticated)?;
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        ensure_owner(&post, actor)?;

        if !post.is_trashed() {
            return Ok(post);
        }

        post.deleted_at = None;
        post.updated_at = self.clock.now();
        let restored = self.posts.save_post(post, FeaturedEffect::None).await?;

        tracing::info!(post_id = %post_id, "Post restored");
        Ok(restored)
    }

    /// Permanent delete, trashed or not. Comments and tag links go with it.
    pub async fn force_delete(&self, actor: Option<Uuid>, post_id: Uuid) -> DomainResult<()> {
        let actor = actor.ok_or(DomainError::Unauthenticated)?;
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        ensure_owner(&post, actor)?;

        if post.is_featured {
            // Reuse the promote path before the row disappears.
            let mut unfeatured = post.clone();
            unfeatured.is_featured = false;
            self.posts
                .save_post(unfeatured, FeaturedEffect::PromoteLatest)
                .await?;
        }

        self.posts.delete(post_id).await?;
        self.comments.invalidate_count(post_id).await;

        tracing::info!(post_id = %post_id, "Post permanently deleted");
        Ok(())
    }

    /// A post page by slug. Drafts are only visible to their owner.
    pub async fn show(&self, slug: &str, viewer: Option<Uuid>) -> DomainResult<PostDetail> {
        let post = self
            .posts
            .find_by_slug(slug)
            .await?
            .filter(|post| post.is_published || viewer.is_some_and(|id| post.is_owned_by(id)))
            .ok_or_else(|| DomainError::not_found("post", slug))?;

        let comments_count = self.comments.count_approved(post.id).await?;
        let rendered_body = self.markdown.to_html(&post.body);
        let rendered_excerpt = post
            .excerpt
            .as_deref()
            .map(|excerpt| self.markdown.to_html(excerpt))
            .unwrap_or_default();

        let summary = self
            .summarize(vec![post])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Internal("post summary went missing".to_string()))?;

        Ok(PostDetail {
            summary,
            rendered_body,
            rendered_excerpt,
            comments_count,
        })
    }

    pub async fn list_published(&self, page: u64) -> DomainResult<Page<PostSummary>> {
        let posts = self
            .posts
            .list_published(PageRequest::new(page, POSTS_PER_PAGE))
            .await?;
        self.summarize_page(posts).await
    }

    pub async fn featured(&self) -> DomainResult<Option<PostSummary>> {
        match self.posts.find_featured().await? {
            Some(post) => Ok(self.summarize(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Latest published posts, skipping `except` (usually the post being read).
    pub async fn recent(&self, limit: u64, except: Option<Uuid>) -> DomainResult<Vec<PostSummary>> {
        let posts = self.posts.recent_published(limit, except).await?;
        self.summarize(posts).await
    }

    pub async fn my_posts(
        &self,
        owner: Option<Uuid>,
        filter: PostFilter,
        page: u64,
    ) -> DomainResult<Page<PostSummary>> {
        let owner = owner.ok_or(DomainError::Unauthenticated)?;
        let posts = self
            .posts
            .list_by_owner(owner, filter, PageRequest::new(page, POSTS_PER_PAGE))
            .await?;
        self.summarize_page(posts).await
    }

    pub async fn by_tag(&self, tag_slug: &str, page: u64) -> DomainResult<Page<PostSummary>> {
        let posts = self
            .posts
            .list_published_by_tag(tag_slug, PageRequest::new(page, POSTS_PER_PAGE))
            .await?;
        self.summarize_page(posts).await
    }

    pub async fn popular_tags(&self, limit: u64) -> DomainResult<Vec<TagCount>> {
        Ok(self.tags.popular(limit).await?)
    }

    /// Ids of the tags named by `names`, creating missing tags by slug.
    async fn resolve_tags(&self, names: &[String]) -> DomainResult<Vec<Uuid>> {
        let mut tag_ids = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();

        for name in names {
            let tag = Tag::new(name);
            if tag.slug.is_empty() || !seen.insert(tag.slug.clone()) {
                continue;
            }
            let tag = self.tags.find_or_create(tag).await?;
            tag_ids.push(tag.id);
        }
        Ok(tag_ids)
    }

    /// Replace the post's tag set.
    async fn link_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> DomainResult<()> {
        self.tags.sync_post_tags(post_id, tag_ids).await?;
        tracing::debug!(post_id = %post_id, tags = tag_ids.len(), "Post tags synced");
        Ok(())
    }

    async fn live_post(&self, post_id: Uuid) -> DomainResult<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .filter(|post| !post.is_trashed())
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    async fn summarize_page(&self, page: Page<Post>) -> DomainResult<Page<PostSummary>> {
        let Page {
            items,
            page,
            per_page,
            total,
        } = page;
        let items = self.summarize(items).await?;
        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Attach authors and tag names, two batched lookups for the whole list.
    async fn summarize(&self, posts: Vec<Post>) -> DomainResult<Vec<PostSummary>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let owner_ids: Vec<Uuid> = posts
            .iter()
            .map(|p| p.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<Uuid, Author> = self
            .users
            .find_many(&owner_ids)
            .await?
            .iter()
            .map(|u| (u.id, Author::from(u)))
            .collect();

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (post_id, tag) in self.tags.tags_for_posts(&post_ids).await? {
            tags.entry(post_id).or_default().push(tag.name);
        }

        Ok(posts
            .into_iter()
            .map(|post| PostSummary {
                author: authors.get(&post.user_id).cloned(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }
}

fn ensure_owner(post: &Post, actor: Uuid) -> DomainResult<()> {
    if post.is_owned_by(actor) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized(
            "only the owner may change this post".to_string(),
        ))
    }
}
