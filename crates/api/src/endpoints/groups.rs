//! Group endpoints.

use axum::{Json, Router, extract::State, routing::get};
use kotoba_common::AppResult;
use kotoba_core::CreateGroupInput;
use kotoba_db::entities::group;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Group body.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<group::Model> for GroupResponse {
    fn from(group: group::Model) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

/// List all groups, ordered by title.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<GroupResponse>>> {
    let groups = state.group_service.list().await?;

    Ok(ApiResponse::ok(groups.into_iter().map(Into::into).collect()))
}

/// Create a group. The slug is derived from the title when absent.
async fn create(
    AuthUser(_): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.create(input).await?;

    Ok(ApiResponse::created(group.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/group/", get(list).post(create))
}
