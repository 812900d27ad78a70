//! Repository implementations: PostgreSQL via SeaORM, and an in-memory store.

mod memory;

pub use memory::InMemoryStore;

#[cfg(feature = "postgres")]
mod connections;
#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
mod postgres_comment;
#[cfg(feature = "postgres")]
mod postgres_post;
#[cfg(feature = "postgres")]
mod postgres_repo;

#[cfg(feature = "postgres")]
pub mod entity;

#[cfg(feature = "postgres")]
pub use connections::{DatabaseConfig, DatabaseConnections};

#[cfg(feature = "postgres")]
pub use postgres_comment::PostgresCommentRepository;
#[cfg(feature = "postgres")]
pub use postgres_post::PostgresPostRepository;
#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresTagRepository, PostgresUserRepository};

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
