//! Comment endpoints, nested under their post.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use kotoba_common::{AppError, AppResult};
use kotoba_core::CommentDetail;
use kotoba_db::entities::comment;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Comment body. `author` and `post` are read-only, derived from the token
/// and the path.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub author: String,
    pub post: String,
    pub text: String,
    pub created: String,
}

impl CommentResponse {
    fn new(comment: comment::Model, author: String) -> Self {
        Self {
            id: comment.id,
            author,
            post: comment.post_id,
            text: comment.text,
            created: comment.created_at.to_rfc3339(),
        }
    }
}

impl From<CommentDetail> for CommentResponse {
    fn from(detail: CommentDetail) -> Self {
        Self::new(detail.comment, detail.author.username)
    }
}

/// List a post's comments, newest first.
async fn list(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    // Listing comments of a missing post is a 404, not an empty list
    state.post_service.get(&post_id).await?;

    let comments = state.comment_service.list_for_post(&post_id).await?;

    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Comment create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct CommentBody {
    pub text: Option<String>,
}

/// Comment on a post as the token bearer.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .add(&user.id, &post_id, body.text.as_deref().unwrap_or_default())
        .await?;

    Ok(ApiResponse::created(CommentResponse::new(
        comment,
        user.username,
    )))
}

/// Read a single comment.
async fn show(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.get_for_post(&post_id, &comment_id).await?;
    let author = state.account_service.get(&comment.author_id).await?;

    Ok(ApiResponse::ok(CommentResponse::new(comment, author.username)))
}

/// Replace a comment. `PUT` requires the text field.
async fn replace(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> AppResult<ApiResponse<CommentResponse>> {
    if body.text.is_none() {
        return Err(AppError::field("text", "This field is required."));
    }

    let comment = state
        .comment_service
        .update(&post_id, &comment_id, &user.id, body.text)
        .await?;

    Ok(ApiResponse::ok(CommentResponse::new(comment, user.username)))
}

/// Partially update a comment.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .update(&post_id, &comment_id, &user.id, body.text)
        .await?;

    Ok(ApiResponse::ok(CommentResponse::new(comment, user.username)))
}

/// Delete a comment.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Response> {
    state
        .comment_service
        .delete(&post_id, &comment_id, &user.id)
        .await?;

    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/comments/", get(list).post(create))
        .route(
            "/posts/{post_id}/comments/{comment_id}/",
            get(show).put(replace).patch(update).delete(remove),
        )
}
