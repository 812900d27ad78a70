#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use quire_core::domain::{NewPost, Post, User};
use quire_core::ports::{Cache, Clock, CommentRepository, PostRepository, UserRepository};
use quire_core::services::{CommentService, PostService};
use quire_infra::{InMemoryCache, InMemoryStore, PulldownMarkdown};

/// Clock the tests move by hand.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Services wired over one in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<InMemoryCache>,
    pub clock: Arc<TestClock>,
    pub comments: Arc<CommentService>,
    pub posts: PostService,
}

impl Harness {
    pub fn new() -> Self {
        let cache = Arc::new(InMemoryCache::new());
        Self::with_cache(cache.clone(), cache)
    }

    /// Wire the services through `front`, which must end up in `cache`.
    pub fn with_cache(cache: Arc<InMemoryCache>, front: Arc<dyn Cache>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(TestClock::new());

        let comments = Arc::new(CommentService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            front,
            clock.clone(),
        ));
        let posts = PostService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            comments.clone(),
            Arc::new(PulldownMarkdown::new()),
            clock.clone(),
        );

        Self {
            store,
            cache,
            clock,
            comments,
            posts,
        }
    }

    pub fn post_repo(&self) -> &dyn PostRepository {
        self.store.as_ref()
    }

    pub fn comment_repo(&self) -> &dyn CommentRepository {
        self.store.as_ref()
    }

    pub async fn user(&self, name: &str) -> Uuid {
        let user = User::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "hash".to_string(),
        );
        let users: &dyn UserRepository = self.store.as_ref();
        users.save(user).await.unwrap().id
    }

    /// Create a post one minute after the previous clock reading so
    /// publish times are strictly ordered.
    pub async fn post(&self, owner: Uuid, title: &str, published: bool, featured: bool) -> Post {
        self.clock.advance(TimeDelta::minutes(1));
        self.posts
            .create(
                Some(owner),
                NewPost {
                    title: title.to_string(),
                    body: Some(format!("# {title}\n\nBody of {title}.")),
                    is_published: published,
                    is_featured: featured,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn reload(&self, post_id: Uuid) -> Post {
        self.post_repo().find_by_id(post_id).await.unwrap().unwrap()
    }

    /// Posts that are featured and publicly visible.
    pub async fn featured_ids(&self, ids: &[Uuid]) -> Vec<Uuid> {
        let mut featured = Vec::new();
        for id in ids {
            if let Some(post) = self.post_repo().find_by_id(*id).await.unwrap() {
                if post.is_featured && post.is_public() {
                    featured.push(post.id);
                }
            }
        }
        featured
    }
}
