//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use kotoba_core::{
    AccountService, CommentService, FollowService, GroupService, PostService, TokenKind,
    TokenService,
};
use kotoba_db::entities::user;

/// Name of the web session cookie.
pub const SESSION_COOKIE: &str = "kotoba_session";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub group_service: GroupService,
    pub follow_service: FollowService,
    pub token_service: TokenService,
}

/// Authentication middleware.
///
/// Resolves a bearer access token or the session cookie into the current
/// user and stores it in request extensions for the extractors. Requests
/// with no usable credential pass through anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user) = resolve_user(&state, req.headers()).await {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Option<user::Model> {
    let claims = bearer_token(headers)
        .and_then(|token| state.token_service.verify(token, TokenKind::Access).ok())
        .or_else(|| {
            session_token(headers)
                .and_then(|token| state.token_service.verify(&token, TokenKind::Session).ok())
        })?;

    match state.account_service.get(&claims.sub).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(user_id = %claims.sub, error = %e, "Token subject no longer resolves");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}
