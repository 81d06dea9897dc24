//! Post detail, creation, and editing pages.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use kotoba_common::{AppError, AppResult, error::field_messages};
use kotoba_core::{CommentDetail, CreatePostInput, UpdatePostInput};
use serde::{Deserialize, Serialize};

use super::PostView;
use crate::{
    extractors::{PostForm, WebUser},
    middleware::AppState,
    response::redirect,
};

/// Post page model.
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: PostView,
    pub author: AuthorInfo,
    pub comments: Vec<CommentView>,
    pub form: CommentFormView,
}

/// Author counts shown beside a post.
#[derive(Debug, Serialize)]
pub struct AuthorInfo {
    pub username: String,
    pub posts_count: u64,
    pub followers: u64,
    pub following: u64,
}

/// One comment on the post page.
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created: String,
}

impl From<CommentDetail> for CommentView {
    fn from(detail: CommentDetail) -> Self {
        Self {
            id: detail.comment.id,
            author: detail.author.username,
            text: detail.comment.text,
            created: detail.comment.created_at.to_rfc3339(),
        }
    }
}

/// Comment form descriptor, always empty: invalid submissions redirect
/// without an error.
#[derive(Debug, Serialize)]
pub struct CommentFormView {
    pub text: String,
    pub errors: serde_json::Value,
}

impl CommentFormView {
    fn empty() -> Self {
        Self {
            text: String::new(),
            errors: serde_json::json!({}),
        }
    }
}

/// Post form model for the new and edit pages, carrying submitted values
/// and a field to messages error map on failure.
#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub text: String,
    pub group: Option<String>,
    pub errors: serde_json::Value,
}

impl PostFormPage {
    fn empty() -> Self {
        Self {
            text: String::new(),
            group: None,
            errors: serde_json::json!({}),
        }
    }
}

/// One post with its comments and author counts.
pub async fn post_detail(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Json<PostPage>> {
    let detail = state.post_service.get_for_author(&username, &post_id).await?;
    let author_id = detail.author.id.clone();
    let author_username = detail.author.username.clone();

    let comments = state.comment_service.list_for_post(&detail.post.id).await?;
    let posts_count = state.post_service.count_by_author(&author_id).await?;
    let followers = state.follow_service.count_followers(&author_id).await?;
    let following = state.follow_service.count_following(&author_id).await?;

    Ok(Json(PostPage {
        post: detail.into(),
        author: AuthorInfo {
            username: author_username,
            posts_count,
            followers,
            following,
        },
        comments: comments.into_iter().map(Into::into).collect(),
        form: CommentFormView::empty(),
    }))
}

/// Empty form for a new post.
pub async fn new_post_form(WebUser(_): WebUser) -> Json<PostFormPage> {
    Json(PostFormPage::empty())
}

/// Create a post from the submitted form, then return to the index.
pub async fn create_post(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    form: PostForm,
) -> AppResult<Response> {
    let text = form.text.unwrap_or_default();
    let group = form.group.flatten();

    let input = CreatePostInput {
        text: text.clone(),
        group_id: group.clone(),
        image: form.image,
    };

    match state.post_service.create(&user.id, input).await {
        Ok(_) => Ok(redirect("/")),
        Err(AppError::Validation(errors)) => Ok(Json(PostFormPage {
            text,
            group,
            errors: field_messages(&errors),
        })
        .into_response()),
        Err(e) => Err(e),
    }
}

/// Form pre-filled with the post being edited. Non-authors are sent back
/// to the post page.
pub async fn edit_post_form(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let detail = state.post_service.get_for_author(&username, &post_id).await?;

    if detail.post.author_id != user.id {
        return Ok(redirect(&format!("/{username}/{post_id}/")));
    }

    Ok(Json(PostFormPage {
        text: detail.post.text,
        group: detail.post.group_id,
        errors: serde_json::json!({}),
    })
    .into_response())
}

/// Persist an edit as the author, then return to the post page.
pub async fn edit_post(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    form: PostForm,
) -> AppResult<Response> {
    let detail = state.post_service.get_for_author(&username, &post_id).await?;

    if detail.post.author_id != user.id {
        return Ok(redirect(&format!("/{username}/{post_id}/")));
    }

    let text = form.text.unwrap_or_default();
    let group = form.group.flatten();

    // The web form always carries every field, so an empty group clears it
    let input = UpdatePostInput {
        text: Some(text.clone()),
        group_id: Some(group.clone()),
        image: form.image,
    };

    match state
        .post_service
        .update(&detail.post.id, &user.id, input)
        .await
    {
        Ok(_) => Ok(redirect(&format!("/{username}/{post_id}/"))),
        Err(AppError::Validation(errors)) => Ok(Json(PostFormPage {
            text,
            group,
            errors: field_messages(&errors),
        })
        .into_response()),
        Err(e) => Err(e),
    }
}

/// Comment form fields.
#[derive(Debug, Deserialize)]
pub struct CommentFormBody {
    #[serde(default)]
    pub text: String,
}

/// Attach a comment to a post, then return to it. Blank text silently
/// creates nothing.
pub async fn add_comment(
    WebUser(user): WebUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentFormBody>,
) -> AppResult<Response> {
    let detail = state.post_service.get_for_author(&username, &post_id).await?;

    match state
        .comment_service
        .add(&user.id, &detail.post.id, &form.text)
        .await
    {
        Ok(_) | Err(AppError::Validation(_)) => {
            Ok(redirect(&format!("/{username}/{post_id}/")))
        }
        Err(e) => Err(e),
    }
}
