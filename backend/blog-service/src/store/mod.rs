//! Storage contracts for blog-service
//!
//! - `UserDirectory`: users referenced by content and follows
//! - `ContentStore`: groups, posts and comments
//! - `RelationshipStore`: the directed follow graph
//!
//! Two backends implement every trait: `PgStore` (PostgreSQL, the source of
//! truth in deployments) and `MemoryStore` (single process, used in
//! development and tests). Ownership is never re-checked here; callers run the
//! authorization engine first. Integrity rules (follow uniqueness, no
//! self-follow, comment -> post, post -> group) are enforced here.
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, Follow, Group, NewGroup, NewPost, Post, PostChanges, UserRef,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("follow edge already exists")]
    DuplicateEdge,

    #[error("a user cannot follow themselves")]
    SelfFollow,

    #[error("{0} references a missing record")]
    InvalidReference(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Record (or refresh the username of) a user seen through the identity provider.
    async fn upsert_user(&self, user: &UserRef) -> StoreResult<()>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRef>>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    async fn get_group(&self, id: i64) -> StoreResult<Group>;

    /// Fails with `InvalidReference("group")` when `post.group` does not exist.
    async fn create_post(&self, author: &UserRef, post: NewPost) -> StoreResult<Post>;

    async fn get_post(&self, id: i64) -> StoreResult<Post>;

    /// Newest first. `limit = None` returns every post. An offset past the end
    /// yields an empty window, never an error. Returns the window and the total count.
    async fn list_posts(&self, limit: Option<usize>, offset: usize)
        -> StoreResult<(Vec<Post>, usize)>;

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Post>;

    /// Removes the post and every comment under it.
    async fn delete_post(&self, id: i64) -> StoreResult<()>;

    /// Fails with `NotFound("post")` when the post does not exist.
    async fn create_comment(&self, author: &UserRef, post_id: i64, text: String)
        -> StoreResult<Comment>;

    /// Comment `id` under post `post_id`; a comment of another post is `NotFound`.
    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Comment>;

    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;

    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Comment>;

    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Atomic insert-if-absent. Fails with `SelfFollow` when
    /// `follower == following` and `DuplicateEdge` when the pair exists,
    /// including when a concurrent create wins the race.
    async fn create_follow(&self, follower: &UserRef, following: &UserRef) -> StoreResult<Follow>;

    /// Edges whose follower is `follower`, optionally filtered by a
    /// case-insensitive substring of the followed username.
    async fn list_follows_of(&self, follower: Uuid, search: Option<&str>)
        -> StoreResult<Vec<Follow>>;

    /// Edge `id` if owned by `owner`, otherwise `NotFound`.
    async fn get_follow(&self, id: i64, owner: Uuid) -> StoreResult<Follow>;

    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool>;

    /// Fails with `NotFound` when no edge `id` is owned by `owner`.
    async fn delete_follow(&self, id: i64, owner: Uuid) -> StoreResult<()>;
}

/// Everything the services need, behind shared trait objects.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserDirectory>,
    pub content: Arc<dyn ContentStore>,
    pub relationships: Arc<dyn RelationshipStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }

    fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserDirectory + ContentStore + RelationshipStore + 'static,
    {
        Self {
            users: backend.clone(),
            content: backend.clone(),
            relationships: backend,
        }
    }
}

/// Slice `[offset, offset + limit)` out of an already ordered listing.
pub(crate) fn window<T: Clone>(items: &[T], limit: Option<usize>, offset: usize) -> Vec<T> {
    let start = offset.min(items.len());
    let end = match limit {
        Some(limit) => start.saturating_add(limit).min(items.len()),
        None => items.len(),
    };
    items[start..end].to_vec()
}

