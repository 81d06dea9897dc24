//! Error pages.

use axum::{
    Json,
    extract::OriginalUri,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 404 page model.
#[derive(Debug, Serialize)]
pub struct NotFoundPage {
    pub path: String,
}

/// Fallback handler for paths no route matched.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundPage {
            path: uri.path().to_string(),
        }),
    )
        .into_response()
}
