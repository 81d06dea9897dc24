//! Follow service.

use std::collections::HashMap;

use kotoba_common::{AppError, AppResult, IdGenerator};
use kotoba_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};
use sea_orm::Set;

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// A follow edge joined with both users.
#[derive(Debug, Clone)]
pub struct FollowDetail {
    pub follow: follow::Model,
    pub user: user::Model,
    pub author: user::Model,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow an author.
    ///
    /// Self-follows and duplicate edges are rejected up front; a concurrent
    /// duplicate still surfaces as the same conflict via the unique index.
    pub async fn follow(&self, user: &user::Model, author: &user::Model) -> AppResult<follow::Model> {
        if user.id == author.id {
            return Err(AppError::field("author", "You cannot follow yourself."));
        }

        if self.follow_repo.is_following(&user.id, &author.id).await? {
            return Err(AppError::Conflict(
                "You are already following this author.".to_string(),
            ));
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            author_id: Set(author.id.clone()),
            ..Default::default()
        };

        let created = self.follow_repo.create(model).await?;

        tracing::info!(
            user_id = %created.user_id,
            author_id = %created.author_id,
            "Follow created"
        );

        Ok(created)
    }

    /// Stop following an author.
    pub async fn unfollow(&self, user: &user::Model, author: &user::Model) -> AppResult<()> {
        let removed = self
            .follow_repo
            .delete_by_pair(&user.id, &author.id)
            .await?;

        if !removed {
            return Err(AppError::NotFound(
                "You are not following this author.".to_string(),
            ));
        }

        tracing::info!(
            user_id = %user.id,
            author_id = %author.id,
            "Follow removed"
        );

        Ok(())
    }

    /// Whether the viewer follows the profile user.
    ///
    /// Always `false` for anonymous viewers and for users viewing their own
    /// profile.
    pub async fn is_follow(
        &self,
        viewer: Option<&user::Model>,
        profile: &user::Model,
    ) -> AppResult<bool> {
        match viewer {
            Some(v) if v.id != profile.id => self.follow_repo.is_following(&v.id, &profile.id).await,
            _ => Ok(false),
        }
    }

    /// Number of users following this author.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(user_id).await
    }

    /// Number of authors this user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }

    /// List follow edges, optionally narrowed to those involving the user
    /// with exactly the given username. An unknown username yields an empty
    /// list rather than an error.
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<FollowDetail>> {
        let follows = match search {
            Some(username) => match self.user_repo.find_by_username(username).await? {
                Some(user) => self.follow_repo.list_involving(&user.id).await?,
                None => return Ok(vec![]),
            },
            None => self.follow_repo.list_all().await?,
        };

        self.hydrate(follows).await
    }

    /// Join follow edges with the users on both sides in one batched lookup.
    async fn hydrate(&self, follows: Vec<follow::Model>) -> AppResult<Vec<FollowDetail>> {
        let mut ids: Vec<String> = follows
            .iter()
            .flat_map(|f| [f.user_id.clone(), f.author_id.clone()])
            .collect();
        ids.sort();
        ids.dedup();

        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        follows
            .into_iter()
            .map(|f| {
                let user = users.get(&f.user_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("User missing for follow {}", f.id))
                })?;
                let author = users.get(&f.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("Author missing for follow {}", f.id))
                })?;
                Ok(FollowDetail {
                    follow: f,
                    user,
                    author,
                })
            })
            .collect()
    }
}
