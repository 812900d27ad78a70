use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use quire_core::domain::{Comment, PageRequest, Post};
use quire_core::ports::{BaseRepository, CommentRepository, FeaturedEffect, PostRepository};

use crate::database::entity::{comment, post};
use crate::database::{PostgresCommentRepository, PostgresPostRepository};

fn post_model(id: Uuid, slug: &str) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        user_id: Uuid::now_v7(),
        title: "Test Post".to_owned(),
        slug: slug.to_owned(),
        excerpt: None,
        body: "Content".to_owned(),
        is_published: true,
        is_featured: false,
        published_at: Some(now.into()),
        created_at: now.into(),
        updated_at: now.into(),
        deleted_at: None,
    }
}

fn comment_model(post_id: Uuid) -> comment::Model {
    let now = Utc::now();
    comment::Model {
        id: Uuid::now_v7(),
        blog_post_id: post_id,
        user_id: Uuid::now_v7(),
        parent_id: None,
        content: "Nice post".to_owned(),
        is_approved: true,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Every SQL statement the mock saw, in order.
fn executed_sql(db: DatabaseConnection) -> Vec<String> {
    db.into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
        .collect()
}

fn exec_result(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::now_v7();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_model(post_id, "test-post")]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = post.unwrap();
    assert_eq!(post.id, post_id);
    assert_eq!(post.slug, "test-post");
    assert!(post.published_at.is_some());
    assert!(!post.is_trashed());
}

#[tokio::test]
async fn test_find_post_by_slug_miss() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    assert!(repo.find_by_slug("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_slug_exists_counts_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[BTreeMap::from([("num_items", Value::BigInt(Some(1)))])]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    assert!(repo.slug_exists("hello-world", None).await.unwrap());
}

#[tokio::test]
async fn test_count_approved_is_one_aggregate() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[BTreeMap::from([("num_items", Value::BigInt(Some(4)))])]])
        .into_connection();

    let repo = PostgresCommentRepository::new(db);
    assert_eq!(repo.count_approved(Uuid::now_v7()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_save_inserts_when_update_matches_nothing() {
    let model = comment_model(Uuid::now_v7());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<comment::Model>::new(), vec![model.clone()]])
        .into_connection();

    let repo = PostgresCommentRepository::new(db);
    let saved: Comment = repo.save(Comment::from(model.clone())).await.unwrap();

    assert_eq!(saved.id, model.id);
    assert_eq!(saved.content, "Nice post");
}

#[tokio::test]
async fn test_featuring_takes_advisory_lock_before_clearing() {
    let mut model = post_model(Uuid::now_v7(), "hello-world");
    model.is_featured = true;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_result(1), exec_result(1)])
        .append_query_results([vec![model.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let saved = repo
        .save_post(Post::from(model), FeaturedEffect::ClearOthers)
        .await
        .unwrap();
    assert!(saved.is_featured);

    let sql = executed_sql(db);
    let lock = sql
        .iter()
        .position(|s| s.contains("pg_advisory_xact_lock"))
        .unwrap();
    let clear = sql
        .iter()
        .position(|s| s.contains(r#"SET "is_featured" = $1"#))
        .unwrap();
    let upsert = sql
        .iter()
        .position(|s| s.contains("RETURNING"))
        .unwrap();
    assert!(lock < clear && clear < upsert);
    assert!(sql.iter().all(|s| !s.contains("FOR UPDATE")));
}

#[tokio::test]
async fn test_plain_post_save_takes_no_lock() {
    let model = post_model(Uuid::now_v7(), "hello-world");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    repo.save_post(Post::from(model), FeaturedEffect::None)
        .await
        .unwrap();

    let sql = executed_sql(db);
    assert!(sql.iter().all(|s| !s.contains("pg_advisory_xact_lock")));
}

#[tokio::test]
async fn test_top_level_comments_order_newest_then_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[BTreeMap::from([("num_items", Value::BigInt(Some(0)))])]])
        .append_query_results([Vec::<comment::Model>::new()])
        .into_connection();

    let repo = PostgresCommentRepository::new(db.clone());
    let page = repo
        .list_top_level_approved(Uuid::now_v7(), PageRequest::new(1, 20))
        .await
        .unwrap();
    assert!(page.items.is_empty());

    let sql = executed_sql(db);
    assert!(sql.iter().any(|s| s.contains(
        r#"ORDER BY "comments"."created_at" DESC, "comments"."id" DESC"#
    )));
}
