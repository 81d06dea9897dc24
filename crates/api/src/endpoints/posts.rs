//! Post endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::get,
};
use kotoba_common::{AppError, AppResult};
use kotoba_core::{CreatePostInput, PostDetail, UpdatePostInput};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PostForm},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Post body. `author` is the username, `group` the group id, `image` the
/// media URL.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl From<PostDetail> for PostResponse {
    fn from(detail: PostDetail) -> Self {
        Self {
            id: detail.post.id,
            author: detail.author.username,
            text: detail.post.text,
            created: detail.post.created_at.to_rfc3339(),
            group: detail.post.group_id,
            image: detail.image_url,
        }
    }
}

/// List query params.
#[derive(Debug, Deserialize)]
struct ListQuery {
    group: Option<String>,
}

/// List posts, optionally narrowed to one group.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let posts = state.post_service.list(query.group.as_deref()).await?;

    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Create a post authored by the token bearer.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    form: PostForm,
) -> AppResult<ApiResponse<PostResponse>> {
    let input = CreatePostInput {
        text: form.text.unwrap_or_default(),
        group_id: form.group.flatten(),
        image: form.image,
    };

    let post = state.post_service.create(&user.id, input).await?;
    let detail = state.post_service.get_detail(&post.id).await?;

    Ok(ApiResponse::created(detail.into()))
}

/// Read a single post.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let detail = state.post_service.get_detail(&id).await?;

    Ok(ApiResponse::ok(detail.into()))
}

async fn apply_update(
    state: &AppState,
    requester_id: &str,
    post_id: &str,
    form: PostForm,
) -> AppResult<ApiResponse<PostResponse>> {
    let input = UpdatePostInput {
        text: form.text,
        group_id: form.group,
        image: form.image,
    };

    let post = state.post_service.update(post_id, requester_id, input).await?;
    let detail = state.post_service.get_detail(&post.id).await?;

    Ok(ApiResponse::ok(detail.into()))
}

/// Replace a post. `PUT` requires the text field.
async fn replace(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: PostForm,
) -> AppResult<ApiResponse<PostResponse>> {
    if form.text.is_none() {
        return Err(AppError::field("text", "This field is required."));
    }

    apply_update(&state, &user.id, &id, form).await
}

/// Partially update a post.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: PostForm,
) -> AppResult<ApiResponse<PostResponse>> {
    apply_update(&state, &user.id, &id, form).await
}

/// Delete a post.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.post_service.delete(&id, &user.id).await?;

    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/", get(list).post(create))
        .route(
            "/posts/{id}/",
            get(show).put(replace).patch(update).delete(remove),
        )
}
