mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use quire_core::DomainError;
use quire_core::domain::{COMMENT_MAX_CHARS, Comment};
use quire_core::ports::{Cache, CacheError, CacheKey, Clock};
use quire_infra::InMemoryCache;
use tokio::sync::Notify;

use common::Harness;

#[tokio::test]
async fn test_listing_shows_approved_top_level_with_replies() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let reader = h.user("Bob").await;
    let post = h.post(owner, "Threads", true, false).await;

    let first = h.comments.create(post.id, Some(reader), "first comment").await.unwrap();
    h.clock.advance(TimeDelta::seconds(5));
    let second = h.comments.create(post.id, Some(owner), "second comment").await.unwrap();
    h.clock.advance(TimeDelta::seconds(5));
    h.comments
        .reply(first.comment.id, Some(owner), "reply one", None)
        .await
        .unwrap();
    h.clock.advance(TimeDelta::seconds(5));
    h.comments
        .reply(first.comment.id, Some(reader), "reply two", Some(post.id))
        .await
        .unwrap();

    let mut pending = Comment::top_level(post.id, reader, "pending".into(), h.clock.now());
    pending.is_approved = false;
    h.comment_repo().save(pending).await.unwrap();

    let page = h.comments.list_approved(post.id, 1).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|v| v.comment.id).collect();
    assert_eq!(ids, vec![second.comment.id, first.comment.id]);
    assert_eq!(page.total, 2);

    let replies: Vec<_> = page.items[1]
        .replies
        .iter()
        .map(|r| r.comment.content.as_str())
        .collect();
    assert_eq!(replies, vec!["reply one", "reply two"]);
    assert_eq!(page.items[1].author.as_ref().unwrap().name, "Bob");

    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 4);
}

#[tokio::test]
async fn test_listing_pages_twenty_at_a_time() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Busy", true, false).await;

    for i in 0..25 {
        h.clock.advance(TimeDelta::seconds(1));
        h.comments
            .create(post.id, Some(owner), &format!("comment {i}"))
            .await
            .unwrap();
    }

    let second_page = h.comments.list_approved(post.id, 2).await.unwrap();
    assert_eq!(second_page.items.len(), 5);
    assert_eq!(second_page.items[4].comment.content, "comment 0");
    assert!(!second_page.has_more());

    let far = h.comments.list_approved(post.id, u64::MAX).await.unwrap();
    assert!(far.items.is_empty());
    assert_eq!(far.total, 25);
}

#[tokio::test]
async fn test_listing_breaks_timestamp_ties_by_id() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Simultaneous", true, false).await;

    // No clock movement: all three share one created_at.
    let mut ids = Vec::new();
    for text in ["one", "two", "three"] {
        let view = h.comments.create(post.id, Some(owner), text).await.unwrap();
        ids.push(view.comment.id);
    }
    ids.sort_unstable_by(|a, b| b.cmp(a));

    let page = h.comments.list_approved(post.id, 1).await.unwrap();
    let listed: Vec<_> = page.items.iter().map(|v| v.comment.id).collect();
    assert_eq!(listed, ids);
    assert!(page.items.iter().all(|v| v.comment.created_at == h.clock.now()));
}

#[tokio::test]
async fn test_comments_require_actor_and_published_post() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let draft = h.post(owner, "Draft", false, false).await;
    let post = h.post(owner, "Live", true, false).await;

    let err = h.comments.create(post.id, None, "hello").await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));

    let err = h.comments.create(draft.id, Some(owner), "hello").await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let err = h
        .comments
        .create(uuid::Uuid::now_v7(), Some(owner), "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_content_length_bounds() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Bounds", true, false).await;

    for (content, ok) in [
        ("ab".to_string(), false),
        ("abc".to_string(), true),
        ("a".repeat(COMMENT_MAX_CHARS), true),
        ("a".repeat(COMMENT_MAX_CHARS + 1), false),
    ] {
        let result = h.comments.create(post.id, Some(owner), &content).await;
        assert_eq!(result.is_ok(), ok, "length {}", content.len());
        if !ok {
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }
}

#[tokio::test]
async fn test_reply_lands_on_parent_post() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Parent", true, false).await;
    let other = h.post(owner, "Other", true, false).await;
    let parent = h.comments.create(post.id, Some(owner), "parent").await.unwrap();

    let reply = h
        .comments
        .reply(parent.comment.id, Some(owner), "child", None)
        .await
        .unwrap();
    assert_eq!(reply.comment.blog_post_id, post.id);
    assert_eq!(reply.comment.parent_id, Some(parent.comment.id));
    assert_eq!(reply.parent.unwrap().comment.id, parent.comment.id);

    let err = h
        .comments
        .reply(parent.comment.id, Some(owner), "misplaced", Some(other.id))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Consistency(_)));
    assert_eq!(h.comments.count_approved(other.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_window() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let author = h.user("Bob").await;
    let post = h.post(owner, "Edits", true, false).await;
    let view = h.comments.create(post.id, Some(author), "original").await.unwrap();
    let id = view.comment.id;

    let err = h.comments.update(id, Some(owner), "hijacked").await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    h.clock.advance(TimeDelta::minutes(10));
    let edited = h.comments.update(id, Some(author), "edited").await.unwrap();
    assert_eq!(edited.comment.content, "edited");

    h.clock.advance(TimeDelta::minutes(10));
    let err = h.comments.update(id, Some(author), "too late").await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn test_delete_removes_thread_and_count() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let reader = h.user("Bob").await;
    let post = h.post(owner, "Delete", true, false).await;

    let root = h.comments.create(post.id, Some(reader), "root").await.unwrap();
    h.comments
        .reply(root.comment.id, Some(owner), "reply one", None)
        .await
        .unwrap();
    h.comments
        .reply(root.comment.id, Some(reader), "reply two", None)
        .await
        .unwrap();
    h.comments.create(post.id, Some(owner), "survivor").await.unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 4);

    let err = h.comments.delete(root.comment.id, Some(owner)).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let removed = h.comments.delete(root.comment.id, Some(reader)).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_approve_and_visibility() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let author = h.user("Bob").await;
    let post = h.post(owner, "Moderation", true, false).await;

    let mut pending = Comment::top_level(post.id, author, "pending".into(), h.clock.now());
    pending.is_approved = false;
    let pending = h.comment_repo().save(pending).await.unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 0);

    let err = h.comments.show(pending.id, Some(owner)).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));
    assert!(h.comments.show(pending.id, Some(author)).await.is_ok());

    let approved = h.comments.approve(pending.id, Some(owner)).await.unwrap();
    assert!(approved.comment.is_approved);
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
    assert!(h.comments.show(pending.id, None).await.is_ok());

    // Approving twice is a no-op.
    h.comments.approve(pending.id, Some(owner)).await.unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_count_is_cached_until_invalidated() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Cached", true, false).await;
    let key = CacheKey::ApprovedCommentCount(post.id);

    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 0);
    assert_eq!(h.cache.get(&key).await.as_deref(), Some("0:0"));

    h.comments.create(post.id, Some(owner), "hello").await.unwrap();
    assert_eq!(h.cache.get(&key).await, None);
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
    assert_eq!(h.cache.get(&key).await.as_deref(), Some("1:1"));

    // A stale entry of the current generation is served until it is
    // invalidated or expires.
    h.cache.set(&key, "1:41", Some(Duration::from_secs(60))).await.unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 41);
    h.comments.invalidate_count(post.id).await;
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);

    // Entries from an older generation are recomputed.
    h.cache.set(&key, "0:41", None).await.unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
}

/// Parks the first `set` after `arm` until `release` is notified.
struct PausingCache {
    inner: Arc<InMemoryCache>,
    armed: AtomicBool,
    arrived: Notify,
    release: Notify,
}

impl PausingCache {
    fn new(inner: Arc<InMemoryCache>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            arrived: Notify::new(),
            release: Notify::new(),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Cache for PausingCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        self.inner.set(key, value, ttl).await
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.inner.invalidate(key).await
    }

    async fn incr(&self, key: &CacheKey) -> Result<u64, CacheError> {
        self.inner.incr(key).await
    }
}

#[tokio::test]
async fn test_recount_finishing_after_a_new_comment_is_not_served() {
    let inner = Arc::new(InMemoryCache::new());
    let cache = Arc::new(PausingCache::new(inner.clone()));
    let h = Harness::with_cache(inner, cache.clone());
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Racy", true, false).await;

    // The reader has counted zero comments and is about to cache that.
    cache.arm();
    let comments = h.comments.clone();
    let post_id = post.id;
    let reader = tokio::spawn(async move { comments.count_approved(post_id).await });
    cache.arrived.notified().await;

    h.comments.create(post.id, Some(owner), "hello").await.unwrap();
    cache.release.notify_one();

    assert_eq!(reader.await.unwrap().unwrap(), 0);
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_post_detail_reports_comment_count() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Detail", true, false).await;

    let root = h.comments.create(post.id, Some(owner), "root").await.unwrap();
    h.comments
        .reply(root.comment.id, Some(owner), "reply", None)
        .await
        .unwrap();

    let detail = h.posts.show(&post.slug, None).await.unwrap();
    assert_eq!(detail.comments_count, 2);
}
