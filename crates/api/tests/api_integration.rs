//! HTTP-level integration tests.
//!
//! Each test builds the full router over mock database connections and
//! drives it with `tower::ServiceExt::oneshot`, so routing, middleware,
//! extractors and response shapes are exercised together.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use kotoba_api::middleware::AppState;
use kotoba_common::LocalStorage;
use kotoba_common::config::AuthConfig;
use kotoba_core::{
    AccountService, CommentService, FollowService, GroupService, MediaService, PostService,
    TokenKind, TokenService,
};
use kotoba_db::entities::{follow, post, user};
use kotoba_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use tower::ServiceExt;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn create_auth_config() -> AuthConfig {
    AuthConfig {
        secret: "integration-test-secret".to_string(),
        access_ttl_secs: 300,
        refresh_ttl_secs: 86400,
        session_ttl_secs: 1_209_600,
    }
}

fn empty_conn() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$stub".to_string(),
        first_name: None,
        last_name: None,
        created_at: Utc::now().into(),
    }
}

fn create_test_post(id: &str, author_id: &str, text: &str) -> post::Model {
    post::Model {
        id: id.to_string(),
        author_id: author_id.to_string(),
        group_id: None,
        text: text.to_string(),
        image_key: None,
        created_at: Utc::now().into(),
    }
}

fn count_result(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
    maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
}

fn create_test_state(
    user_db: Arc<DatabaseConnection>,
    post_db: Arc<DatabaseConnection>,
    group_db: Arc<DatabaseConnection>,
    follow_db: Arc<DatabaseConnection>,
) -> AppState {
    let user_repo = UserRepository::new(user_db);
    let post_repo = PostRepository::new(post_db);
    let group_repo = GroupRepository::new(group_db);
    let follow_repo = FollowRepository::new(follow_db);
    let comment_repo = CommentRepository::new(empty_conn());

    let media = MediaService::new(Arc::new(LocalStorage::new(
        std::env::temp_dir().join("kotoba-api-test"),
        "/media/".to_string(),
    )));

    AppState {
        account_service: AccountService::new(user_repo.clone()),
        post_service: PostService::new(
            post_repo.clone(),
            user_repo.clone(),
            group_repo.clone(),
            follow_repo.clone(),
            media,
        ),
        comment_service: CommentService::new(comment_repo, post_repo, user_repo.clone()),
        group_service: GroupService::new(group_repo),
        follow_service: FollowService::new(follow_repo, user_repo),
        token_service: TokenService::new(&create_auth_config()),
    }
}

fn create_app(state: AppState) -> Router {
    kotoba_api::app(state, MAX_BODY_BYTES)
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_path_returns_not_found_page() {
    let app = create_app(create_test_state(
        empty_conn(),
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/does/not/exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["path"], "/does/not/exist");
}

#[tokio::test]
async fn test_api_posts_list_empty() {
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        empty_conn(),
        post_db,
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_create_post_requires_token() {
    let app = create_app(create_test_state(
        empty_conn(),
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text": "hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_api_token_rejects_unknown_user() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        user_db,
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/token/")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"username": "ghost", "password": "nope"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_api_token_refresh_issues_access_token() {
    let state = create_test_state(empty_conn(), empty_conn(), empty_conn(), empty_conn());
    let refresh = state.token_service.issue_pair("user1").unwrap().refresh;
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/token/refresh/")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "refresh": refresh }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;

    let verifier = TokenService::new(&create_auth_config());
    let claims = verifier
        .verify(body["access"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    assert_eq!(claims.sub, "user1");
}

#[tokio::test]
async fn test_api_follow_list_with_bearer_token() {
    // One lookup resolves the token subject, then the empty follow list
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![create_test_user("user1", "garry")]])
            .into_connection(),
    );
    let follow_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<follow::Model>::new()])
            .into_connection(),
    );

    let state = create_test_state(user_db, empty_conn(), empty_conn(), follow_db);
    let access = state
        .token_service
        .issue("user1", TokenKind::Access)
        .unwrap();
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/follow/")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_rejects_session_token_as_bearer() {
    let state = create_test_state(empty_conn(), empty_conn(), empty_conn(), empty_conn());
    let session = state.token_service.issue_session("user1").unwrap();
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/follow/")
                .header(header::AUTHORIZATION, format!("Bearer {session}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_update_rejects_non_author() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![create_test_user("user1", "garry")]])
            .into_connection(),
    );
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![create_test_post(
                "post1",
                "user2",
                "Someone else's post",
            )]])
            .into_connection(),
    );

    let state = create_test_state(user_db, post_db, empty_conn(), empty_conn());
    let access = state
        .token_service
        .issue("user1", TokenKind::Access)
        .unwrap();
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/post1/")
                .method("PUT")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text": "mine now"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_api_comments_list_missing_post_is_not_found() {
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        empty_conn(),
        post_db,
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/posts/missing/comments/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_index_page_lists_posts() {
    let post_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_result(1)]])
            .append_query_results([vec![create_test_post("post1", "user1", "First post")]])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![create_test_user("user1", "garry")]])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        user_db,
        post_db,
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["posts"][0]["author"], "garry");
    assert_eq!(body["posts"][0]["text"], "First post");
    assert!(body["posts"][0]["group"].is_null());
    assert_eq!(body["page"]["number"], 1);
    assert_eq!(body["page"]["per_page"], 10);
    assert_eq!(body["page"]["total_items"], 1);
    assert_eq!(body["page"]["has_next"], false);
}

#[tokio::test]
async fn test_group_page_unknown_slug_is_not_found() {
    let group_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<kotoba_db::entities::group::Model>::new()])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        empty_conn(),
        empty_conn(),
        group_db,
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/group/rust/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_new_post_page_redirects_anonymous_to_login() {
    let app = create_app(create_test_state(
        empty_conn(),
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(Request::builder().uri("/new/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth/login/?next=/new/"
    );
}

#[tokio::test]
async fn test_login_with_bad_credentials_rerenders_form() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection(),
    );

    let app = create_app(create_test_state(
        user_db,
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/login/")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=ghost&password=nope"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["username"], "ghost");
    assert_eq!(
        body["errors"][0],
        "Please enter a correct username and password. \
         Note that both fields may be case-sensitive."
    );
}

#[tokio::test]
async fn test_signup_missing_fields_rerenders_with_errors() {
    let app = create_app(create_test_state(
        empty_conn(),
        empty_conn(),
        empty_conn(),
        empty_conn(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/signup/")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=garry"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["username"], "garry");
    assert_eq!(body["errors"]["email"][0], "This field is required.");
    assert_eq!(body["errors"]["password1"][0], "This field is required.");
}
