//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use kotoba_common::{AppError, AppResult, Page, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ItemsAndPagesNumber,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count posts by an author.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all posts by ID, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<post::Model>> {
        Post::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List posts filtered by group, newest first.
    pub async fn list_by_group(&self, group_id: &str) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::GroupId.eq(group_id))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one page of all posts, newest first.
    pub async fn page_all(&self, page: PageRequest) -> AppResult<Page<post::Model>> {
        self.fetch_page(Self::ordered(Post::find()), page).await
    }

    /// Get one page of a group's posts, newest first.
    pub async fn page_by_group(
        &self,
        group_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<post::Model>> {
        let query = Self::ordered(Post::find().filter(post::Column::GroupId.eq(group_id)));
        self.fetch_page(query, page).await
    }

    /// Get one page of an author's posts, newest first.
    pub async fn page_by_author(
        &self,
        author_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<post::Model>> {
        let query = Self::ordered(Post::find().filter(post::Column::AuthorId.eq(author_id)));
        self.fetch_page(query, page).await
    }

    /// Get one page of posts by any of the given authors, newest first.
    ///
    /// This backs the follow feed: callers pass the IDs of every followed
    /// author. An empty ID list short-circuits to an empty page.
    pub async fn page_by_authors(
        &self,
        author_ids: &[String],
        page: PageRequest,
    ) -> AppResult<Page<post::Model>> {
        if author_ids.is_empty() {
            return Ok(Page::empty(page.per_page));
        }

        let query =
            Self::ordered(Post::find().filter(post::Column::AuthorId.is_in(author_ids.to_vec())));
        self.fetch_page(query, page).await
    }

    fn ordered(query: Select<Post>) -> Select<Post> {
        query
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
    }

    /// Run a paged query: count first, clamp the requested number, then
    /// fetch the resolved page.
    async fn fetch_page(
        &self,
        query: Select<Post>,
        page: PageRequest,
    ) -> AppResult<Page<post::Model>> {
        let paginator = query.paginate(self.db.as_ref(), page.per_page);

        let ItemsAndPagesNumber {
            number_of_items,
            number_of_pages,
        } = paginator
            .num_items_and_pages()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let total_pages = number_of_pages.max(1);
        let number = page.resolve(total_pages);

        let items = paginator
            .fetch_page(number - 1)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page {
            items,
            number,
            per_page: page.per_page,
            total_items: number_of_items,
            total_pages,
        })
    }
}
