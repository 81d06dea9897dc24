//! Follow endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use kotoba_common::{AppError, AppResult};
use kotoba_core::FollowDetail;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Follow body, both sides as usernames.
#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub user: String,
    pub author: String,
}

impl From<FollowDetail> for FollowResponse {
    fn from(detail: FollowDetail) -> Self {
        Self {
            user: detail.user.username,
            author: detail.author.username,
        }
    }
}

/// List query params.
#[derive(Debug, Deserialize)]
struct FollowQuery {
    search: Option<String>,
}

/// List follow edges, optionally matched by exact username on either side.
async fn list(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FollowQuery>,
) -> AppResult<ApiResponse<Vec<FollowResponse>>> {
    let follows = state.follow_service.list(query.search.as_deref()).await?;

    Ok(ApiResponse::ok(follows.into_iter().map(Into::into).collect()))
}

/// Create follow request. `user` is always the token bearer.
#[derive(Debug, Deserialize)]
pub struct CreateFollowRequest {
    pub author: Option<String>,
}

/// Follow an author on behalf of the token bearer.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateFollowRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let Some(author_name) = req.author else {
        return Err(AppError::field("author", "This field is required."));
    };

    let author = state
        .account_service
        .find_by_username(&author_name)
        .await?
        .ok_or_else(|| {
            AppError::field(
                "author",
                format!("Object with username={author_name} does not exist."),
            )
        })?;

    state.follow_service.follow(&user, &author).await?;

    Ok(ApiResponse::created(FollowResponse {
        user: user.username,
        author: author.username,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/follow/", get(list).post(create))
}
