//! Token endpoints.

use axum::{Json, Router, extract::State, routing::post};
use kotoba_common::AppResult;
use kotoba_core::TokenPair;
use serde::{Deserialize, Serialize};

use crate::middleware::AppState;

/// Token obtain request.
#[derive(Debug, Deserialize)]
pub struct ObtainTokenRequest {
    pub username: String,
    pub password: String,
}

/// Issue an access/refresh pair for valid credentials.
async fn obtain(
    State(state): State<AppState>,
    Json(req): Json<ObtainTokenRequest>,
) -> AppResult<Json<TokenPair>> {
    let user = state
        .account_service
        .authenticate(&req.username, &req.password)
        .await?;

    let pair = state.token_service.issue_pair(&user.id)?;

    Ok(Json(pair))
}

/// Token refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

/// Refreshed access token response.
#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access: String,
}

/// Exchange a refresh token for a fresh access token.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> AppResult<Json<RefreshTokenResponse>> {
    let access = state.token_service.refresh_access(&req.refresh)?;

    Ok(Json(RefreshTokenResponse { access }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token/", post(obtain))
        .route("/token/refresh/", post(refresh))
}
