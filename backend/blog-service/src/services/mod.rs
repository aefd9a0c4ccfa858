//! Business logic layer for blog-service
//!
//! - Post service: listing (limit/offset), create, update, delete
//! - Comment service: comments scoped to their post
//! - Group service: read-only groups
//! - Follow service: the actor's own follow edges
//!
//! Every operation takes the acting identity explicitly, asks the
//! authorization engine first, and only then touches a store.
pub mod comments;
pub mod follows;
pub mod groups;
pub mod posts;

pub use comments::{CommentDraft, CommentService};
pub use follows::{FollowDraft, FollowService};
pub use groups::GroupService;
pub use posts::{ImageSource, PostDraft, PostService};

use crate::error::Result;
use crate::models::{Actor, UserRef};
use crate::store::Stores;

/// How a body is applied to an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: required fields must be present
    Full,
    /// PATCH: absent fields are left untouched
    Partial,
}

/// Record an authenticated actor in the user directory and return it.
///
/// Callers must have authorized the actor already.
pub(crate) async fn remember_actor<'a>(stores: &Stores, actor: &'a Actor) -> Result<&'a UserRef> {
    let user = crate::authz::require_user(actor)?;
    stores.users.upsert_user(user).await?;
    Ok(user)
}

/// Strip surrounding whitespace so blank text fails the length check.
pub(crate) fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string())
}
