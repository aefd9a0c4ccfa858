//! Domain models for blog-service
//!
//! - `UserRef`: a user known to the identity provider (id + unique username)
//! - `Group`: read-only community a post may be tagged to
//! - `Post` / `Comment`: authored content
//! - `Follow`: directed edge follower -> followed
//!
//! Wire representations live in `crate::handlers::schema`; these types are
//! what the stores and services exchange.
mod actor;

pub use actor::Actor;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as referenced by content and relationships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Fields an administrator supplies when seeding a group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Stored image name, e.g. `posts/<uuid>.png`
    pub image: Option<String>,
    pub author: UserRef,
    pub group: Option<i64>,
}

/// Decoded image payload ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<ImageBlob>,
}

/// Changes applied by an update. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub group: Option<Option<i64>>,
    pub image: Option<Option<ImageBlob>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post: i64,
    pub author: UserRef,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    /// The follower
    pub user: UserRef,
    /// The followed user
    pub following: UserRef,
}

/// One window of a limit/offset listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }
}

/// Result of listing posts: either everything, or a single page.
#[derive(Debug, Clone)]
pub enum PostListing {
    All(Vec<Post>),
    Paged(Page<Post>),
}
