//! Profile page and follow actions.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use kotoba_common::{AppError, AppResult, PageRequest};
use serde::Serialize;

use super::{PageMeta, PageQuery, PostView, split_page};
use crate::{
    extractors::{MaybeAuthUser, WebUser},
    middleware::AppState,
    response::redirect,
};

const PROFILE_PAGE_SIZE: u64 = 5;

/// Profile page model.
#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub profile: ProfileInfo,
    pub posts: Vec<PostView>,
    pub page: PageMeta,
}

/// Profile header with counts.
#[derive(Debug, Serialize)]
pub struct ProfileInfo {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub posts_count: u64,
    pub followers: u64,
    pub following: u64,
    pub is_follow: bool,
}

/// One user's posts plus their follow counts.
pub async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ProfilePage>> {
    let profile = state.account_service.get_by_username(&username).await?;

    let request = PageRequest::from_param(query.page.as_deref(), PROFILE_PAGE_SIZE);
    let page = state.post_service.page_by_author(&profile.id, request).await?;

    let posts_count = state.post_service.count_by_author(&profile.id).await?;
    let followers = state.follow_service.count_followers(&profile.id).await?;
    let following = state.follow_service.count_following(&profile.id).await?;
    let is_follow = state
        .follow_service
        .is_follow(viewer.as_ref(), &profile)
        .await?;

    let (posts, page) = split_page(page);
    Ok(Json(ProfilePage {
        profile: ProfileInfo {
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            posts_count,
            followers,
            following,
            is_follow,
        },
        posts,
        page,
    }))
}

/// Follow a profile, then return to it.
pub async fn follow(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let author = state.account_service.get_by_username(&username).await?;

    // Self-follows and duplicates redirect without touching the store
    match state.follow_service.follow(&user, &author).await {
        Ok(_) | Err(AppError::Validation(_) | AppError::Conflict(_)) => {}
        Err(e) => return Err(e),
    }

    Ok(redirect(&format!("/{username}/")))
}

/// Stop following a profile, then return to it.
pub async fn unfollow(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let author = state.account_service.get_by_username(&username).await?;

    state.follow_service.unfollow(&user, &author).await?;

    Ok(redirect(&format!("/{username}/")))
}
