//! Post service.

use std::collections::HashMap;

use kotoba_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use kotoba_db::{
    entities::{group, post, user},
    repositories::{FollowRepository, GroupRepository, PostRepository, UserRepository},
};
use sea_orm::Set;

use crate::MediaService;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    follow_repo: FollowRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

/// Input for creating a post.
#[derive(Debug)]
pub struct CreatePostInput {
    pub text: String,
    pub group_id: Option<String>,
    /// Raw bytes of an uploaded image, if any.
    pub image: Option<Vec<u8>>,
}

/// Input for updating a post. `None` fields are left unchanged; the outer
/// `Option` on `group_id` distinguishes "untouched" from "cleared".
#[derive(Debug, Default)]
pub struct UpdatePostInput {
    pub text: Option<String>,
    pub group_id: Option<Option<String>>,
    pub image: Option<Vec<u8>>,
}

/// A post joined with its author, group, and image URL.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: post::Model,
    pub author: user::Model,
    pub group: Option<group::Model>,
    pub image_url: Option<String>,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        follow_repo: FollowRepository,
        media: MediaService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            follow_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post by the given author.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(AppError::field("text", "This field is required."));
        }

        if let Some(ref group_id) = input.group_id {
            self.check_group(group_id).await?;
        }

        // The image must validate and land in storage before the row exists
        let image_key = match input.image {
            Some(data) => Some(self.media.store_image(&data).await?),
            None => None,
        };

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            group_id: Set(input.group_id),
            text: Set(text.to_string()),
            image_key: Set(image_key),
            ..Default::default()
        };

        let created = self.post_repo.create(model).await?;

        tracing::info!(post_id = %created.id, author_id = %created.author_id, "Post created");

        Ok(created)
    }

    /// Update a post. Only the author may edit it.
    pub async fn update(
        &self,
        post_id: &str,
        requester_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only edit your own posts".to_string(),
            ));
        }

        let mut active: post::ActiveModel = post.into();

        if let Some(text) = input.text {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::field("text", "This field is required."));
            }
            active.text = Set(text.to_string());
        }

        match input.group_id {
            Some(Some(group_id)) => {
                self.check_group(&group_id).await?;
                active.group_id = Set(Some(group_id));
            }
            Some(None) => active.group_id = Set(None),
            None => {}
        }

        if let Some(data) = input.image {
            let key = self.media.store_image(&data).await?;
            active.image_key = Set(Some(key));
        }

        self.post_repo.update(active).await
    }

    /// Delete a post. Only the author may delete it.
    pub async fn delete(&self, post_id: &str, requester_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        self.post_repo.delete(post_id).await?;

        tracing::info!(post_id = %post_id, "Post deleted");

        Ok(())
    }

    /// Get a post by ID.
    pub async fn get(&self, post_id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(post_id).await
    }

    /// Get a post joined with its author, group, and image URL.
    pub async fn get_detail(&self, post_id: &str) -> AppResult<PostDetail> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let author = self.user_repo.get_by_id(&post.author_id).await?;
        let group = match post.group_id {
            Some(ref group_id) => self.group_repo.find_by_id(group_id).await?,
            None => None,
        };
        let image_url = post.image_key.as_ref().map(|k| self.media.url(k));

        Ok(PostDetail {
            post,
            author,
            group,
            image_url,
        })
    }

    /// Get a post addressed as `/{username}/{post_id}/`.
    ///
    /// Unknown usernames and posts 404, and so does a post that exists but
    /// belongs to a different author.
    pub async fn get_for_author(&self, username: &str, post_id: &str) -> AppResult<PostDetail> {
        let author = self.user_repo.get_by_username(username).await?;
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != author.id {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        let group = match post.group_id {
            Some(ref group_id) => self.group_repo.find_by_id(group_id).await?,
            None => None,
        };
        let image_url = post.image_key.as_ref().map(|k| self.media.url(k));

        Ok(PostDetail {
            post,
            author,
            group,
            image_url,
        })
    }

    /// Page through all posts, newest first.
    pub async fn page_all(&self, page: PageRequest) -> AppResult<Page<PostDetail>> {
        let posts = self.post_repo.page_all(page).await?;
        self.hydrate_page(posts).await
    }

    /// Page through a group's posts, newest first.
    pub async fn page_by_group(
        &self,
        group_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<PostDetail>> {
        let posts = self.post_repo.page_by_group(group_id, page).await?;
        self.hydrate_page(posts).await
    }

    /// Page through an author's posts, newest first.
    pub async fn page_by_author(
        &self,
        author_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<PostDetail>> {
        let posts = self.post_repo.page_by_author(author_id, page).await?;
        self.hydrate_page(posts).await
    }

    /// Page through posts by every author the user follows.
    pub async fn feed_page(&self, user_id: &str, page: PageRequest) -> AppResult<Page<PostDetail>> {
        let author_ids = self.follow_repo.followed_author_ids(user_id).await?;
        let posts = self.post_repo.page_by_authors(&author_ids, page).await?;
        self.hydrate_page(posts).await
    }

    /// List posts without paging, optionally narrowed to one group.
    pub async fn list(&self, group_id: Option<&str>) -> AppResult<Vec<PostDetail>> {
        let posts = match group_id {
            Some(group_id) => self.post_repo.list_by_group(group_id).await?,
            None => self.post_repo.list_all().await?,
        };
        self.hydrate(posts).await
    }

    /// Number of posts the author has written.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        self.post_repo.count_by_author(author_id).await
    }

    async fn check_group(&self, group_id: &str) -> AppResult<()> {
        if self.group_repo.find_by_id(group_id).await?.is_none() {
            return Err(AppError::field(
                "group",
                "Select a valid choice. That choice is not one of the available choices.",
            ));
        }
        Ok(())
    }

    async fn hydrate_page(&self, page: Page<post::Model>) -> AppResult<Page<PostDetail>> {
        let Page {
            items,
            number,
            per_page,
            total_items,
            total_pages,
        } = page;

        Ok(Page {
            items: self.hydrate(items).await?,
            number,
            per_page,
            total_items,
            total_pages,
        })
    }

    /// Join posts with their authors and groups in two batched lookups.
    async fn hydrate(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostDetail>> {
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let mut group_ids: Vec<String> = posts.iter().filter_map(|p| p.group_id.clone()).collect();
        group_ids.sort();
        group_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let groups: HashMap<String, group::Model> = self
            .group_repo
            .find_by_ids(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

        posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("Author missing for post {}", post.id))
                })?;
                let group = post.group_id.as_ref().and_then(|id| groups.get(id)).cloned();
                let image_url = post.image_key.as_ref().map(|k| self.media.url(k));

                Ok(PostDetail {
                    post,
                    author,
                    group,
                    image_url,
                })
            })
            .collect()
    }
}
