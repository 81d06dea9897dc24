//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Multipart, OriginalUri, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use kotoba_common::AppError;
use kotoba_db::entities::user;
use serde::Deserialize;

use crate::response::login_redirect;

/// Authenticated user extractor for API handlers.
///
/// Rejects with the `401` error envelope when no valid credential was
/// presented.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized.into_response())
    }
}

/// Authenticated user extractor for web page handlers.
///
/// Anonymous requests are redirected to the login page with the original
/// path in the `next` query parameter.
#[derive(Debug, Clone)]
pub struct WebUser(pub user::Model);

impl<S> FromRequestParts<S> for WebUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<user::Model>().cloned() {
            return Ok(Self(user));
        }

        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path().to_string(), |uri| uri.path().to_string());

        Err(login_redirect(&path))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// Post submission fields, read from either a JSON or a multipart body.
///
/// The outer `Option` on `group` distinguishes a field that was not sent
/// (leave the group untouched) from one sent empty or null (clear it).
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: Option<String>,
    pub group: Option<Option<String>>,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct PostBody {
    text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    group: Option<Option<String>>,
}

/// Keep explicit `null` distinct from an absent key in a patch body.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl PostForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().map(ToString::to_string);
            match name.as_deref() {
                Some("text") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.text = Some(value);
                }
                Some("group") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.group = Some((!value.is_empty()).then_some(value));
                }
                Some("image") => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    // Browsers send an empty part when no file was chosen
                    if !data.is_empty() {
                        form.image = Some(data.to_vec());
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()).into_response())?;

            Self::from_multipart(multipart)
                .await
                .map_err(IntoResponse::into_response)
        } else {
            let Json(body) = Json::<PostBody>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()).into_response())?;

            Ok(Self {
                text: body.text,
                group: body.group,
                image: None,
            })
        }
    }
}
