//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use quire_core::ports::{
    Cache, CommentRepository, PasswordService, PostRepository, SystemClock, TagRepository,
    TokenService, UserRepository,
};
use quire_core::services::{CommentService, PostService};
use quire_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryStore, JwtTokenService, PulldownMarkdown,
};

use crate::config::{AppConfig, CacheBackend};

/// Repository implementations the services run on.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub backend: &'static str,
}

impl Repositories {
    /// Every port backed by one in-memory store.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            tags: store,
            backend: "memory",
        }
    }

    #[cfg(feature = "postgres")]
    async fn connect(config: &AppConfig) -> Self {
        use quire_infra::database::{
            DatabaseConfig, DatabaseConnections, PostgresCommentRepository,
            PostgresPostRepository, PostgresTagRepository, PostgresUserRepository,
        };

        let Some(settings) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Self::in_memory();
        };

        let db_config = DatabaseConfig {
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            ..DatabaseConfig::new(settings.url.clone())
        };

        match DatabaseConnections::init(&db_config).await {
            Ok(connections) => {
                let db = connections.main;
                Self {
                    users: Arc::new(PostgresUserRepository::new(db.clone())),
                    posts: Arc::new(PostgresPostRepository::new(db.clone())),
                    comments: Arc::new(PostgresCommentRepository::new(db.clone())),
                    tags: Arc::new(PostgresTagRepository::new(db)),
                    backend: "postgres",
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                Self::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(config: &AppConfig) -> Self {
        if config.database.is_some() {
            tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
        }
        Self::in_memory()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub backend: &'static str,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = Repositories::connect(config).await;
        let cache = build_cache(config.cache).await;
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));

        let state = Self::assemble(repos, cache, tokens, config.comment_count_ttl);
        tracing::info!(backend = state.backend, "Application state initialized");
        state
    }

    /// Wire services over the given adapters.
    pub fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        tokens: Arc<dyn TokenService>,
        comment_count_ttl: Option<Duration>,
    ) -> Self {
        let clock = Arc::new(SystemClock);

        let comments = Arc::new(
            CommentService::new(
                repos.comments,
                repos.posts.clone(),
                repos.users.clone(),
                cache,
                clock.clone(),
            )
            .with_count_ttl(comment_count_ttl),
        );

        let posts = Arc::new(PostService::new(
            repos.posts,
            repos.tags,
            repos.users.clone(),
            comments.clone(),
            Arc::new(PulldownMarkdown::new()),
            clock,
        ));

        Self {
            users: repos.users,
            posts,
            comments,
            tokens,
            passwords: Arc::new(Argon2PasswordService::new()),
            backend: repos.backend,
        }
    }
}

async fn build_cache(backend: CacheBackend) -> Arc<dyn Cache> {
    match backend {
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
        CacheBackend::Redis => redis_cache().await,
    }
}

#[cfg(feature = "redis")]
async fn redis_cache() -> Arc<dyn Cache> {
    use quire_infra::{RedisCache, RedisConfig};

    match RedisCache::connect(&RedisConfig::from_env()).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            tracing::error!(error = %e, "Redis unavailable. Using in-memory cache.");
            Arc::new(InMemoryCache::new())
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_cache() -> Arc<dyn Cache> {
    tracing::warn!("CACHE_BACKEND=redis ignored: built without the redis feature");
    Arc::new(InMemoryCache::new())
}
