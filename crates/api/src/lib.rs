//! HTTP layer for kotoba.
//!
//! This crate provides both request surfaces:
//!
//! - **Endpoints**: the token-authenticated JSON API under `/api/v1`
//! - **Pages**: web handlers emitting JSON page models
//! - **Extractors**: the authenticated user and post form bodies
//! - **Middleware**: the shared state and credential resolution
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod pages;
pub mod response;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::middleware::AppState;

/// Build the full application router: web pages at the root, the JSON API
/// nested under `/api/v1`, one fallback, and the auth middleware resolving
/// bearer tokens and session cookies alike.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(pages::router())
        .nest("/api/v1", endpoints::router())
        .fallback(pages::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
