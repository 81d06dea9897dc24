//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod comment;
pub mod follow;
pub mod group;
pub mod media;
pub mod post;
pub mod token;

pub use account::{AccountService, SignupInput};
pub use comment::{CommentDetail, CommentService};
pub use follow::{FollowDetail, FollowService};
pub use group::{CreateGroupInput, GroupService};
pub use media::{detect_image_format, ImageFormat, MediaService};
pub use post::{CreatePostInput, PostDetail, PostService, UpdatePostInput};
pub use token::{Claims, TokenKind, TokenPair, TokenService};
