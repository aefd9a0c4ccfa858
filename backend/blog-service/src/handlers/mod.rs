//! HTTP handlers for blog-service
//!
//! - Posts: list (limit/offset), create, read, replace, patch, delete
//! - Comments: the same, nested under a post
//! - Groups: read-only
//! - Follows: the caller's own edges
//! - Health: store liveness
pub mod comments;
pub mod follows;
pub mod groups;
pub mod health;
pub mod posts;
pub mod schema;

pub use comments::{
    create_comment, delete_comment, get_comment, list_comments, patch_comment, replace_comment,
};
pub use follows::{create_follow, delete_follow, get_follow, list_follows, reject_follow_update};
pub use groups::{get_group, list_groups, reject_group_write};
pub use health::health_check;
pub use posts::{create_post, delete_post, get_post, list_posts, patch_post, replace_post};
