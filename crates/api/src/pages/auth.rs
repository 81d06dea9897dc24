//! Signup, login, and logout pages.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use kotoba_common::{AppError, AppResult, error::field_messages};
use kotoba_core::SignupInput;
use serde::{Deserialize, Serialize};

use crate::{
    middleware::{AppState, SESSION_COOKIE},
    response::redirect,
};

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Signup form model. Passwords are never echoed back.
#[derive(Debug, Serialize)]
pub struct SignupFormPage {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: serde_json::Value,
}

/// Signup form fields.
#[derive(Debug, Default, Deserialize)]
pub struct SignupFormBody {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Empty signup form.
pub async fn signup_form() -> Json<SignupFormPage> {
    Json(form_page(SignupFormBody::default(), serde_json::json!({})))
}

/// Register a new account, then send the visitor to the login page.
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupFormBody>,
) -> AppResult<Response> {
    let required = required_errors(&form);
    if !required.is_empty() {
        let errors = serde_json::Value::Object(required);
        return Ok(Json(form_page(form, errors)).into_response());
    }

    let input = SignupInput {
        first_name: none_if_empty(&form.first_name),
        last_name: none_if_empty(&form.last_name),
        username: form.username.clone(),
        email: form.email.clone(),
        password1: form.password1.clone(),
        password2: form.password2.clone(),
    };

    match state.account_service.signup(input).await {
        Ok(_) => Ok(redirect("/auth/login/")),
        Err(AppError::Validation(errors)) => {
            Ok(Json(form_page(form, field_messages(&errors))).into_response())
        }
        Err(e) => Err(e),
    }
}

fn form_page(form: SignupFormBody, errors: serde_json::Value) -> SignupFormPage {
    SignupFormPage {
        first_name: form.first_name,
        last_name: form.last_name,
        username: form.username,
        email: form.email,
        errors,
    }
}

fn required_errors(form: &SignupFormBody) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();

    for (field, value) in [
        ("username", &form.username),
        ("email", &form.email),
        ("password1", &form.password1),
        ("password2", &form.password2),
    ] {
        if value.is_empty() {
            map.insert(
                field.to_string(),
                serde_json::json!(["This field is required."]),
            );
        }
    }

    map
}

fn none_if_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Login form model. `errors` holds non-field errors.
#[derive(Debug, Serialize)]
pub struct LoginFormPage {
    pub username: String,
    pub next: String,
    pub errors: Vec<String>,
}

/// `?next=` query parameter on the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginFormBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Empty login form.
pub async fn login_form(Query(query): Query<LoginQuery>) -> Json<LoginFormPage> {
    Json(LoginFormPage {
        username: String::new(),
        next: safe_next(query.next),
        errors: vec![],
    })
}

/// Authenticate and set the session cookie, then follow `next`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginFormBody>,
) -> AppResult<Response> {
    let next = safe_next(form.next.clone().or(query.next));

    let user = match state
        .account_service
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AppError::Unauthorized) => {
            return Ok(Json(LoginFormPage {
                username: form.username,
                next,
                errors: vec![BAD_CREDENTIALS.to_string()],
            })
            .into_response());
        }
        Err(e) => return Err(e),
    };

    let token = state.token_service.issue_session(&user.id)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), redirect(&next)).into_response())
}

/// Clear the session cookie and return to the index.
pub async fn logout(jar: CookieJar) -> Response {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();

    (jar.remove(cookie), redirect("/")).into_response()
}

/// Only site-local paths may be used as a return target.
fn safe_next(next: Option<String>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/".to_string(),
    }
}
