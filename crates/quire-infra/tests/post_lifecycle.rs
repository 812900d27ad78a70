mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use quire_core::DomainError;
use quire_core::domain::{NewPost, PostChanges, PostFilter, Tag, TagCount};
use quire_core::error::RepoError;
use quire_core::ports::{BaseRepository, Clock, FeaturedEffect, PostRepository, TagRepository};
use quire_core::services::PostService;
use quire_infra::PulldownMarkdown;
use uuid::Uuid;

use common::Harness;

#[tokio::test]
async fn test_slugs_get_minimal_numeric_suffix() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let first = h.post(owner, "Hello World", true, false).await;
    let second = h.post(owner, "Hello World", true, false).await;
    let third = h.post(owner, "Hello, World!", false, false).await;

    assert_eq!(first.slug, "hello-world");
    assert_eq!(second.slug, "hello-world-1");
    assert_eq!(third.slug, "hello-world-2");
}

#[tokio::test]
async fn test_trashed_posts_keep_their_slug() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let first = h.post(owner, "Hello World", true, false).await;
    h.posts.delete(Some(owner), first.id).await.unwrap();

    let second = h.post(owner, "Hello World", true, false).await;
    assert_eq!(second.slug, "hello-world-1");
}

#[tokio::test]
async fn test_listing_names_are_never_used_as_slugs() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let mine = h.post(owner, "Mine", true, false).await;
    let recent = h.post(owner, "Recent!", true, false).await;
    let again = h.post(owner, "recent", false, false).await;

    assert_eq!(mine.slug, "mine-1");
    assert_eq!(recent.slug, "recent-1");
    assert_eq!(again.slug, "recent-2");
}

#[tokio::test]
async fn test_title_without_letters_falls_back() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let post = h.post(owner, "!!!", false, false).await;
    assert_eq!(post.slug, "post");
}

#[tokio::test]
async fn test_retitle_reslugs_and_republishes() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "First Title", true, false).await;

    h.clock.advance(TimeDelta::hours(1));
    let updated = h
        .posts
        .update(
            Some(owner),
            post.id,
            PostChanges {
                title: Some("Second Title".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.slug, "second-title");
    assert!(updated.published_at > post.published_at);
}

#[tokio::test]
async fn test_retitle_to_same_slug_keeps_it() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let post = h.post(owner, "Hello World", false, false).await;

    let updated = h
        .posts
        .update(
            Some(owner),
            post.id,
            PostChanges {
                title: Some("Hello, World".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.slug, "hello-world");
    assert!(updated.published_at.is_none());
}

#[tokio::test]
async fn test_publish_timestamps_follow_flag() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let draft = h.post(owner, "Draft", false, false).await;
    assert!(draft.published_at.is_none());

    let published = h
        .posts
        .update(
            Some(owner),
            draft.id,
            PostChanges {
                is_published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(published.published_at, Some(h.clock.now()));

    let unpublished = h
        .posts
        .update(
            Some(owner),
            draft.id,
            PostChanges {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(unpublished.published_at.is_none());
}

#[tokio::test]
async fn test_featuring_clears_other_posts() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let a = h.post(owner, "A", true, true).await;
    let b = h.post(owner, "B", true, true).await;
    assert_eq!(h.featured_ids(&[a.id, b.id]).await, vec![b.id]);

    h.posts
        .update(
            Some(owner),
            a.id,
            PostChanges {
                is_featured: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(h.featured_ids(&[a.id, b.id]).await, vec![a.id]);
    assert_eq!(h.posts.featured().await.unwrap().unwrap().post.id, a.id);
}

#[tokio::test]
async fn test_unpublished_post_cannot_be_featured() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let a = h.post(owner, "A", true, true).await;
    let draft = h.post(owner, "Draft", false, true).await;

    assert!(!draft.is_featured);
    assert_eq!(h.featured_ids(&[a.id, draft.id]).await, vec![a.id]);
}

#[tokio::test]
async fn test_unpublishing_featured_promotes_latest() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let older = h.post(owner, "Older", true, false).await;
    let newer = h.post(owner, "Newer", true, false).await;
    let star = h.post(owner, "Star", true, true).await;

    h.posts
        .update(
            Some(owner),
            star.id,
            PostChanges {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!h.reload(star.id).await.is_featured);
    assert_eq!(
        h.featured_ids(&[older.id, newer.id, star.id]).await,
        vec![newer.id]
    );
}

#[tokio::test]
async fn test_unpublishing_last_featured_leaves_none() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let star = h.post(owner, "Star", true, true).await;

    h.posts
        .update(
            Some(owner),
            star.id,
            PostChanges {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(h.posts.featured().await.unwrap().is_none());
}

#[tokio::test]
async fn test_trashing_featured_promotes_and_restore_comes_back_plain() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let other = h.post(owner, "Other", true, false).await;
    let star = h.post(owner, "Star", true, true).await;

    h.posts.delete(Some(owner), star.id).await.unwrap();
    assert_eq!(h.posts.featured().await.unwrap().unwrap().post.id, other.id);
    assert!(h.reload(star.id).await.is_trashed());

    let restored = h.posts.restore(Some(owner), star.id).await.unwrap();
    assert!(!restored.is_trashed());
    assert!(!restored.is_featured);
    assert_eq!(h.featured_ids(&[other.id, star.id]).await, vec![other.id]);
}

#[tokio::test]
async fn test_force_delete_removes_comments_and_tags() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let reader = h.user("Bob").await;

    let post = h
        .posts
        .create(
            Some(owner),
            NewPost {
                title: "Tagged".to_string(),
                body: Some("body".to_string()),
                is_published: true,
                tags: vec!["Rust".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.comments
        .create(post.id, Some(reader), "first!")
        .await
        .unwrap();
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 1);

    h.posts.force_delete(Some(owner), post.id).await.unwrap();

    assert!(h.post_repo().find_by_id(post.id).await.unwrap().is_none());
    assert_eq!(h.comments.count_approved(post.id).await.unwrap(), 0);
    let tags: &dyn TagRepository = h.store.as_ref();
    assert!(tags.tags_for_posts(&[post.id]).await.unwrap().is_empty());
    assert!(tags.popular(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_only_owner_may_change_post() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let stranger = h.user("Eve").await;
    let post = h.post(owner, "Mine", true, false).await;

    let err = h
        .posts
        .update(Some(stranger), post.id, PostChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let err = h.posts.delete(None, post.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));

    let err = h.posts.force_delete(Some(stranger), post.id).await.unwrap_err();
    assert!(err.is_authorization());
}

#[tokio::test]
async fn test_create_validates_input() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let err = h
        .posts
        .create(
            Some(owner),
            NewPost {
                title: "   ".to_string(),
                body: Some("body".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_show_hides_drafts_from_strangers() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let draft = h.post(owner, "Secret", false, false).await;

    let err = h.posts.show(&draft.slug, None).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let detail = h.posts.show(&draft.slug, Some(owner)).await.unwrap();
    assert!(detail.rendered_body.contains("<h1>Secret</h1>"));
    assert_eq!(detail.summary.author.unwrap().name, "Ada");
}

#[tokio::test]
async fn test_listings() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    let a = h.post(owner, "A", true, false).await;
    let draft = h.post(owner, "Draft", false, false).await;
    let c = h.post(owner, "C", true, false).await;
    let d = h.post(owner, "D", true, false).await;

    let page = h.posts.list_published(1).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, vec![d.id, c.id, a.id]);
    assert_eq!(page.total, 3);

    let recent = h.posts.recent(3, Some(d.id)).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, vec![c.id, a.id]);

    let drafts = h
        .posts
        .my_posts(Some(owner), PostFilter::Draft, 1)
        .await
        .unwrap();
    assert_eq!(drafts.items.len(), 1);
    assert_eq!(drafts.items[0].post.id, draft.id);

    let all = h.posts.my_posts(Some(owner), PostFilter::All, 1).await.unwrap();
    assert_eq!(all.total, 4);
}

#[tokio::test]
async fn test_tags_and_popularity() {
    let h = Harness::new();
    let owner = h.user("Ada").await;

    for (title, tags, published) in [
        ("One", vec!["Rust", "Web"], true),
        ("Two", vec!["rust", "Rust "], true),
        ("Three", vec!["Web"], false),
    ] {
        h.clock.advance(TimeDelta::minutes(1));
        h.posts
            .create(
                Some(owner),
                NewPost {
                    title: title.to_string(),
                    body: Some("body".to_string()),
                    is_published: published,
                    tags: tags.into_iter().map(String::from).collect(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let popular = h.posts.popular_tags(10).await.unwrap();
    let counts: Vec<_> = popular
        .iter()
        .map(|t| (t.tag.slug.as_str(), t.posts_count))
        .collect();
    assert_eq!(counts, vec![("rust", 2), ("web", 1)]);

    let rust = h.posts.by_tag("rust", 1).await.unwrap();
    assert_eq!(rust.total, 2);
    assert!(rust.items.iter().all(|s| s.tags.contains(&"Rust".to_string())));

    assert_eq!(h.posts.by_tag("unknown", 1).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_repository_applies_effect_with_write() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let a = h.post(owner, "A", true, true).await;
    let mut b = h.post(owner, "B", true, false).await;

    b.is_featured = true;
    h.post_repo()
        .save_post(b.clone(), FeaturedEffect::ClearOthers)
        .await
        .unwrap();
    assert_eq!(h.featured_ids(&[a.id, b.id]).await, vec![b.id]);
}

/// Tag store whose every call fails.
struct UnavailableTags;

fn unavailable() -> RepoError {
    RepoError::Connection("tag store unavailable".to_string())
}

#[async_trait]
impl BaseRepository<Tag, Uuid> for UnavailableTags {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Tag>, RepoError> {
        Err(unavailable())
    }

    async fn save(&self, _tag: Tag) -> Result<Tag, RepoError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(unavailable())
    }
}

#[async_trait]
impl TagRepository for UnavailableTags {
    async fn find_or_create(&self, _tag: Tag) -> Result<Tag, RepoError> {
        Err(unavailable())
    }

    async fn sync_post_tags(&self, _post_id: Uuid, _tag_ids: &[Uuid]) -> Result<(), RepoError> {
        Err(unavailable())
    }

    async fn tags_for_posts(&self, _post_ids: &[Uuid]) -> Result<Vec<(Uuid, Tag)>, RepoError> {
        Err(unavailable())
    }

    async fn popular(&self, _limit: u64) -> Result<Vec<TagCount>, RepoError> {
        Err(unavailable())
    }
}

#[tokio::test]
async fn test_failed_tag_lookup_writes_nothing() {
    let h = Harness::new();
    let owner = h.user("Ada").await;
    let posts = PostService::new(
        h.store.clone(),
        Arc::new(UnavailableTags),
        h.store.clone(),
        h.comments.clone(),
        Arc::new(PulldownMarkdown::new()),
        h.clock.clone(),
    );

    let err = posts
        .create(
            Some(owner),
            NewPost {
                title: "Tagged".to_string(),
                body: Some("body".to_string()),
                is_published: true,
                tags: vec!["Rust".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)));
    assert!(!h.post_repo().slug_exists("tagged", None).await.unwrap());

    let existing = h.post(owner, "Untouched", true, false).await;
    let err = posts
        .update(
            Some(owner),
            existing.id,
            PostChanges {
                title: Some("Touched".into()),
                tags: Some(vec!["Rust".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)));
    assert_eq!(h.reload(existing.id).await.title, "Untouched");

    // Posts without tags never touch the tag store on write.
    let plain = posts
        .create(
            Some(owner),
            NewPost {
                title: "Plain".to_string(),
                body: Some("body".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(plain.slug, "plain");
}
