//! JSON API endpoints.

mod comments;
mod follow;
mod groups;
mod posts;
mod token;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router, nested under `/api/v1` by the server.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(token::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(follow::router())
        .merge(groups::router())
}
