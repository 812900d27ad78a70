//! Comment thread handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quire_shared::ApiResponse;
use quire_shared::dto::{CommentRequest, DeletedResponse, ReplyRequest};

use crate::handlers::posts::PageQuery;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::presenter;
use crate::state::AppState;

/// GET /api/posts/{id}/comments?page=
pub async fn list(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let comments = state
        .comments
        .list_approved(path.into_inner(), query.page)
        .await?;
    Ok(HttpResponse::Ok().json(presenter::page(comments, presenter::comment)))
}

/// POST /api/posts/{id}/comments
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .create(path.into_inner(), Some(identity.user_id), &body.content)
        .await?;
    Ok(HttpResponse::Created().json(presenter::comment(comment)))
}

/// GET /api/comments/{id}
pub async fn show(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .show(path.into_inner(), viewer.user_id())
        .await?;
    Ok(HttpResponse::Ok().json(presenter::comment(comment)))
}

/// POST /api/comments/{id}/reply
pub async fn reply(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<ReplyRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let comment = state
        .comments
        .reply(
            path.into_inner(),
            Some(identity.user_id),
            &req.content,
            req.blog_post_id,
        )
        .await?;
    Ok(HttpResponse::Created().json(presenter::comment(comment)))
}

/// PATCH /api/comments/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .update(path.into_inner(), Some(identity.user_id), &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(presenter::comment(comment)))
}

/// DELETE /api/comments/{id} - removes the comment and its replies
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let deleted = state
        .comments
        .delete(path.into_inner(), Some(identity.user_id))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        DeletedResponse { deleted },
        "Comment deleted",
    )))
}

/// PATCH /api/comments/{id}/approve
pub async fn approve(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let comment = state
        .comments
        .approve(path.into_inner(), Some(identity.user_id))
        .await?;
    Ok(HttpResponse::Ok().json(presenter::comment(comment)))
}
