//! Web page handlers.
//!
//! Handlers emit JSON page models in place of rendered templates: the post
//! list, pagination state, form state, and the per-page extras a template
//! would receive.

mod auth;
mod errors;
mod groups;
mod home;
mod posts;
mod profile;

use axum::{
    Router,
    routing::{get, post},
};
use kotoba_common::Page;
use kotoba_core::PostDetail;
use serde::{Deserialize, Serialize};

use crate::middleware::AppState;

pub use errors::not_found;

/// Create the web router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/follow/", get(home::follow_feed))
        .route("/new/", get(posts::new_post_form).post(posts::create_post))
        .route("/group/{slug}/", get(groups::group_posts))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/{username}/", get(profile::profile))
        .route("/{username}/follow/", post(profile::follow))
        .route("/{username}/unfollow/", post(profile::unfollow))
        .route("/{username}/{post_id}/", get(posts::post_detail))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post),
        )
        .route("/{username}/{post_id}/comment/", post(posts::add_comment))
}

/// `?page=` query parameter, kept raw so clamping rules apply.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// One post as shown in page models.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

/// Group reference embedded in a post view.
#[derive(Debug, Serialize)]
pub struct GroupRef {
    pub title: String,
    pub slug: String,
}

impl From<PostDetail> for PostView {
    fn from(detail: PostDetail) -> Self {
        Self {
            id: detail.post.id,
            author: detail.author.username,
            text: detail.post.text,
            created: detail.post.created_at.to_rfc3339(),
            group: detail.group.map(|group| GroupRef {
                title: group.title,
                slug: group.slug,
            }),
            image: detail.image_url,
        }
    }
}

/// Pagination state of a page model.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Split a page of post details into views plus pagination state.
fn split_page(page: Page<PostDetail>) -> (Vec<PostView>, PageMeta) {
    let meta = PageMeta {
        number: page.number,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
        has_next: page.has_next(),
        has_previous: page.has_previous(),
    };

    (page.items.into_iter().map(Into::into).collect(), meta)
}
