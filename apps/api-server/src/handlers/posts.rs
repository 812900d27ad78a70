//! Post handlers: public listings, the post page, and owner management.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use quire_core::domain::{NewPost, PostChanges, PostFilter};
use quire_core::services::RECENT_POSTS_LIMIT;
use quire_shared::ApiResponse;
use quire_shared::dto::{CreatePostRequest, PostIndexResponse, UpdatePostRequest};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::presenter;
use crate::state::AppState;

/// Upper bound for `limit` query parameters on unpaged listings.
pub const MAX_LIST_LIMIT: u64 = 50;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u64,
}

fn first_page() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct MineQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "first_page")]
    pub page: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u64>,
    pub except: Option<Uuid>,
}

/// GET /api/posts
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let featured = state.posts.featured().await?;
    let posts = state.posts.list_published(query.page).await?;

    Ok(HttpResponse::Ok().json(PostIndexResponse {
        featured: featured.map(presenter::post),
        posts: presenter::page(posts, presenter::post),
    }))
}

/// GET /api/posts/recent
pub async fn recent(
    state: web::Data<AppState>,
    query: web::Query<RecentQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(RECENT_POSTS_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }
    let posts = state.posts.recent(limit, query.except).await?;

    let body: Vec<_> = posts.into_iter().map(presenter::post).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/posts/mine?filter=published|draft
pub async fn mine(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<MineQuery>,
) -> AppResult<HttpResponse> {
    let filter: PostFilter = query.filter.as_deref().unwrap_or_default().parse()?;
    let posts = state
        .posts
        .my_posts(Some(identity.user_id), filter, query.page)
        .await?;

    Ok(HttpResponse::Ok().json(presenter::page(posts, presenter::post)))
}

/// GET /api/posts/{slug}
pub async fn show(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let detail = state.posts.show(&path.into_inner(), viewer.user_id()).await?;
    Ok(HttpResponse::Ok().json(presenter::post_detail(detail)))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let input = NewPost {
        title: req.title,
        excerpt: req.excerpt,
        body: req.body,
        is_published: req.is_published,
        is_featured: req.is_featured,
        tags: req.tags,
    };

    let actor = Some(identity.user_id);
    let post = state.posts.create(actor, input).await?;
    let detail = state.posts.show(&post.slug, actor).await?;

    Ok(HttpResponse::Created().json(presenter::post_detail(detail)))
}

/// PATCH /api/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = PostChanges {
        title: req.title,
        excerpt: req.excerpt,
        body: req.body,
        is_published: req.is_published,
        is_featured: req.is_featured,
        tags: req.tags,
    };

    let actor = Some(identity.user_id);
    let post = state.posts.update(actor, path.into_inner(), changes).await?;
    let detail = state.posts.show(&post.slug, actor).await?;

    Ok(HttpResponse::Ok().json(presenter::post_detail(detail)))
}

/// DELETE /api/posts/{id} - moves the post to the trash
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(Some(identity.user_id), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/restore
pub async fn restore(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let actor = Some(identity.user_id);
    let post = state.posts.restore(actor, path.into_inner()).await?;
    let detail = state.posts.show(&post.slug, actor).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        presenter::post_detail(detail),
        "Post restored",
    )))
}

/// DELETE /api/posts/{id}/force - removes the post and everything hanging off it
pub async fn force_delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .force_delete(Some(identity.user_id), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
