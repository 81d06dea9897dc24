//! Comment service.

use std::collections::HashMap;

use kotoba_common::{AppError, AppResult, IdGenerator};
use kotoba_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};
use sea_orm::Set;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// A comment joined with its author.
#[derive(Debug, Clone)]
pub struct CommentDetail {
    pub comment: comment::Model,
    pub author: user::Model,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a comment to a post.
    pub async fn add(
        &self,
        author_id: &str,
        post_id: &str,
        text: &str,
    ) -> AppResult<comment::Model> {
        // The post must exist before anything is written
        let post = self.post_repo.get_by_id(post_id).await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::field("text", "This field is required."));
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author_id.to_string()),
            text: Set(text.to_string()),
            ..Default::default()
        };

        let created = self.comment_repo.create(model).await?;

        tracing::info!(
            comment_id = %created.id,
            post_id = %created.post_id,
            "Comment added"
        );

        Ok(created)
    }

    /// Get a comment addressed under a post.
    ///
    /// A comment that exists but hangs off a different post 404s, so nested
    /// routes never expose other posts' comments.
    pub async fn get_for_post(&self, post_id: &str, comment_id: &str) -> AppResult<comment::Model> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.post_id != post_id {
            return Err(AppError::NotFound(format!("Comment not found: {comment_id}")));
        }

        Ok(comment)
    }

    /// Update a comment's text. Only the author may edit it.
    pub async fn update(
        &self,
        post_id: &str,
        comment_id: &str,
        requester_id: &str,
        text: Option<String>,
    ) -> AppResult<comment::Model> {
        let comment = self.get_for_post(post_id, comment_id).await?;

        if comment.author_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        let mut active: comment::ActiveModel = comment.into();

        if let Some(text) = text {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::field("text", "This field is required."));
            }
            active.text = Set(text.to_string());
        }

        self.comment_repo.update(active).await
    }

    /// Delete a comment. Only the author may delete it.
    pub async fn delete(
        &self,
        post_id: &str,
        comment_id: &str,
        requester_id: &str,
    ) -> AppResult<()> {
        let comment = self.get_for_post(post_id, comment_id).await?;

        if comment.author_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id).await
    }

    /// List a post's comments with their authors, newest first.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<CommentDetail>> {
        let comments = self.comment_repo.list_by_post(post_id).await?;

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("Author missing for comment {}", comment.id))
                })?;
                Ok(CommentDetail { comment, author })
            })
            .collect()
    }
}
