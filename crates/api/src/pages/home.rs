//! Index and follow-feed pages.

use axum::{
    Json,
    extract::{Query, State},
};
use kotoba_common::{AppResult, PageRequest};
use serde::Serialize;

use super::{PageMeta, PageQuery, PostView, split_page};
use crate::{extractors::WebUser, middleware::AppState};

const INDEX_PAGE_SIZE: u64 = 10;
const FEED_PAGE_SIZE: u64 = 5;

/// Post list page model.
#[derive(Debug, Serialize)]
pub struct PostListPage {
    pub posts: Vec<PostView>,
    pub page: PageMeta,
}

/// Latest posts across the whole site.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostListPage>> {
    let request = PageRequest::from_param(query.page.as_deref(), INDEX_PAGE_SIZE);
    let page = state.post_service.page_all(request).await?;

    let (posts, page) = split_page(page);
    Ok(Json(PostListPage { posts, page }))
}

/// Posts authored by everyone the current user follows.
pub async fn follow_feed(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostListPage>> {
    let request = PageRequest::from_param(query.page.as_deref(), FEED_PAGE_SIZE);
    let page = state.post_service.feed_page(&user.id, request).await?;

    let (posts, page) = split_page(page);
    Ok(Json(PostListPage { posts, page }))
}
