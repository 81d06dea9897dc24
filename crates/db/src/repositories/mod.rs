//! Database repositories.
//!
//! Each repository wraps a shared [`sea_orm::DatabaseConnection`] and exposes
//! the queries one entity needs. Handlers never touch the connection directly.

pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use group::GroupRepository;
pub use post::PostRepository;
pub use user::UserRepository;
