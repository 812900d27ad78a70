//! Pre-persist rules for posts: slugs, publish timestamps and the single
//! featured post.
//!
//! Both hooks mutate the post in place and return the [`FeaturedEffect`] the
//! repository must apply to *other* posts in the same transaction.

use std::sync::Arc;

use uuid::Uuid;

use crate::DomainResult;
use crate::domain::{ChangedFields, Post, slugify};
use crate::ports::{Clock, FeaturedEffect, PostRepository};

/// Slug used when a title contains no letters or digits.
const FALLBACK_SLUG: &str = "post";

/// Path segments under `/posts` that name listings, never a post.
pub const RESERVED_SLUGS: &[&str] = &["mine", "recent"];

pub struct PostLifecycle {
    posts: Arc<dyn PostRepository>,
    clock: Arc<dyn Clock>,
}

impl PostLifecycle {
    pub fn new(posts: Arc<dyn PostRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { posts, clock }
    }

    /// Prepare a post that is about to be inserted.
    pub async fn on_creating(&self, post: &mut Post) -> DomainResult<FeaturedEffect> {
        post.slug = self.unique_slug(&post.title, None).await?;

        if post.is_featured && !post.is_published {
            tracing::debug!(post_id = %post.id, "Dropping featured flag from unpublished post");
            post.is_featured = false;
        }

        post.published_at = post.is_published.then(|| self.clock.now());

        Ok(if post.is_featured {
            FeaturedEffect::ClearOthers
        } else {
            FeaturedEffect::None
        })
    }

    /// Prepare `post`, the edited version of `before`, for an update.
    pub async fn on_updating(&self, before: &Post, post: &mut Post) -> DomainResult<FeaturedEffect> {
        let changed = ChangedFields::between(before, post);
        let now = self.clock.now();
        let mut effect = FeaturedEffect::None;

        // A title edit re-slugs and counts as a re-publish.
        if changed.title {
            post.slug = self.unique_slug(&post.title, Some(post.id)).await?;
            if post.is_published {
                post.published_at = Some(now);
            }
        }

        if changed.is_published {
            if post.is_published {
                post.published_at = Some(now);
            } else {
                post.published_at = None;
                if before.is_featured {
                    post.is_featured = false;
                    effect = FeaturedEffect::PromoteLatest;
                }
            }
        }

        if post.is_featured && !post.is_published {
            post.is_featured = false;
        }

        if changed.is_featured && post.is_featured {
            effect = FeaturedEffect::ClearOthers;
        }

        if effect != FeaturedEffect::None {
            tracing::debug!(post_id = %post.id, ?effect, "Featured flag side effect scheduled");
        }

        Ok(effect)
    }

    /// `slugify(title)`, or the first of `-1`, `-2`, … suffixed variants not
    /// used by any post other than `except`. Reserved slugs always take a
    /// suffix.
    pub async fn unique_slug(&self, title: &str, except: Option<Uuid>) -> DomainResult<String> {
        let base = match slugify(title) {
            slug if slug.is_empty() => FALLBACK_SLUG.to_string(),
            slug => slug,
        };

        let mut candidate = base.clone();
        let mut suffix: u64 = 1;
        while RESERVED_SLUGS.contains(&candidate.as_str())
            || self.posts.slug_exists(&candidate, except).await?
        {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }

        Ok(candidate)
    }
}
