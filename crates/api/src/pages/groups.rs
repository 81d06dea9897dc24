//! Group page.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use kotoba_common::{AppResult, PageRequest};
use serde::Serialize;

use super::{PageMeta, PageQuery, PostView, split_page};
use crate::middleware::AppState;

const GROUP_PAGE_SIZE: u64 = 5;

/// Group page model.
#[derive(Debug, Serialize)]
pub struct GroupPage {
    pub group: GroupInfo,
    pub posts: Vec<PostView>,
    pub page: PageMeta,
}

/// Group header shown on its page.
#[derive(Debug, Serialize)]
pub struct GroupInfo {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Posts tagged with one group, newest first.
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<GroupPage>> {
    let group = state.group_service.get_by_slug(&slug).await?;

    let request = PageRequest::from_param(query.page.as_deref(), GROUP_PAGE_SIZE);
    let page = state.post_service.page_by_group(&group.id, request).await?;

    let (posts, page) = split_page(page);
    Ok(Json(GroupPage {
        group: GroupInfo {
            title: group.title,
            slug: group.slug,
            description: group.description,
        },
        posts,
        page,
    }))
}
