//! Tag handlers.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use quire_core::services::POPULAR_TAGS_LIMIT;

use crate::handlers::posts::{MAX_LIST_LIMIT, PageQuery};
use crate::middleware::error::{AppError, AppResult};
use crate::presenter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<u64>,
}

/// GET /api/tags/popular
pub async fn popular(
    state: web::Data<AppState>,
    query: web::Query<PopularQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(POPULAR_TAGS_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }

    let tags = state.posts.popular_tags(limit).await?;

    let body: Vec<_> = tags.into_iter().map(presenter::tag_count).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/tags/{slug}/posts
pub async fn posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let posts = state.posts.by_tag(&path.into_inner(), query.page).await?;
    Ok(HttpResponse::Ok().json(presenter::page(posts, presenter::post)))
}
