//! Group service.

use kotoba_common::{AppError, AppResult, IdGenerator};
use kotoba_db::{entities::group, repositories::GroupRepository};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Maximum slug length, matching the column width.
const MAX_SLUG_LENGTH: usize = 10;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").unwrap());

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    id_gen: IdGenerator,
}

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(
        length(min = 1, max = 10),
        regex(
            path = *SLUG_RE,
            message = "Enter a valid slug consisting of lowercase letters, numbers, underscores or hyphens."
        )
    )]
    pub slug: Option<String>,

    pub description: Option<String>,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub fn new(group_repo: GroupRepository) -> Self {
        Self {
            group_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new group, deriving a slug from the title when none is given.
    pub async fn create(&self, input: CreateGroupInput) -> AppResult<group::Model> {
        input.validate()?;

        let slug = match input.slug {
            Some(slug) => slug,
            None => derive_slug(&input.title).ok_or_else(|| {
                AppError::field("slug", "A slug could not be derived from the title.")
            })?,
        };

        if self.group_repo.find_by_slug(&slug).await?.is_some() {
            return Err(AppError::field(
                "slug",
                "Group with this slug already exists.",
            ));
        }

        let model = group::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            slug: Set(slug),
            description: Set(input.description.unwrap_or_default()),
            ..Default::default()
        };

        let created = self.group_repo.create(model).await?;

        tracing::info!(group_id = %created.id, slug = %created.slug, "Group created");

        Ok(created)
    }

    /// List all groups ordered by title.
    pub async fn list(&self) -> AppResult<Vec<group::Model>> {
        self.group_repo.list_all().await
    }

    /// Get a group by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_slug(slug).await
    }

    /// Get a group by ID.
    pub async fn get(&self, id: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_id(id).await
    }
}

/// Derive a slug from a title: lowercase, runs of non-alphanumeric
/// characters collapsed to a single hyphen, trimmed to the column width.
///
/// Titles with no ASCII alphanumerics yield `None` and the caller must
/// require an explicit slug.
fn derive_slug(title: &str) -> Option<String> {
    let mut slug = String::new();
    let mut last_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if !slug.is_empty() && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }

    let cut: String = slug.chars().take(MAX_SLUG_LENGTH).collect();
    let cut = cut.trim_end_matches('-');

    if cut.is_empty() {
        None
    } else {
        Some(cut.to_string())
    }
}
