//! In-process store backing development runs and the test-suite.
//!
//! All tables live behind one `RwLock`; the follow uniqueness check and the
//! insert happen under the same write guard, which is this backend's
//! equivalent of the `UNIQUE (user_id, following_id)` constraint.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{window, ContentStore, RelationshipStore, StoreError, StoreResult, UserDirectory};
use crate::models::{
    Comment, Follow, Group, ImageBlob, NewGroup, NewPost, Post, PostChanges, UserRef,
};

#[derive(Debug)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    image: Option<ImageBlob>,
    author_id: Uuid,
    group_id: Option<i64>,
}

#[derive(Debug)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    text: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct FollowRow {
    id: i64,
    user_id: Uuid,
    following_id: Uuid,
}

/// Placeholder for a username taken over by another identity.
fn stale_username(id: Uuid) -> String {
    format!("stale-{}", id)
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, UserRef>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
    follows: BTreeMap<i64, FollowRow>,
    follow_pairs: HashSet<(Uuid, Uuid)>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_user(&mut self, user: &UserRef) {
        if !self.users.contains_key(&user.id) {
            self.release_username(user);
            self.users.insert(user.id, user.clone());
        }
    }

    /// Rename any other id still holding `user.username` to `stale-<id>`.
    fn release_username(&mut self, user: &UserRef) {
        for (id, held) in self.users.iter_mut() {
            if *id != user.id && held.username == user.username {
                held.username = stale_username(*id);
            }
        }
    }

    fn user(&self, id: Uuid) -> StoreResult<UserRef> {
        self.users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::Internal(format!("user {} missing from directory", id)))
    }

    fn post(&self, row: &PostRow) -> StoreResult<Post> {
        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            pub_date: row.pub_date,
            image: row.image.as_ref().map(|blob| blob.name.clone()),
            author: self.user(row.author_id)?,
            group: row.group_id,
        })
    }

    fn comment(&self, row: &CommentRow) -> StoreResult<Comment> {
        Ok(Comment {
            id: row.id,
            post: row.post_id,
            author: self.user(row.author_id)?,
            text: row.text.clone(),
            created: row.created,
        })
    }

    fn follow(&self, row: &FollowRow) -> StoreResult<Follow> {
        Ok(Follow {
            id: row.id,
            user: self.user(row.user_id)?,
            following: self.user(row.following_id)?,
        })
    }

    fn check_group(&self, group: Option<i64>) -> StoreResult<()> {
        match group {
            Some(id) if !self.groups.contains_key(&id) => Err(StoreError::InvalidReference("group")),
            _ => Ok(()),
        }
    }

    fn comment_row(&self, post_id: i64, id: i64) -> StoreResult<&CommentRow> {
        self.comments
            .get(&id)
            .filter(|row| row.post_id == post_id)
            .ok_or(StoreError::NotFound("comment"))
    }

    fn owned_follow(&self, id: i64, owner: Uuid) -> StoreResult<FollowRow> {
        self.follows
            .get(&id)
            .filter(|row| row.user_id == owner)
            .copied()
            .ok_or(StoreError::NotFound("follow"))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn upsert_user(&self, user: &UserRef) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.release_username(user);
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRef>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(StoreError::Internal(format!(
                "group slug '{}' already exists",
                group.slug
            )));
        }
        let id = tables.next_id();
        let group = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().cloned().collect())
    }

    async fn get_group(&self, id: i64) -> StoreResult<Group> {
        let tables = self.tables.read().await;
        tables
            .groups
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("group"))
    }

    async fn create_post(&self, author: &UserRef, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.check_group(post.group)?;
        tables.ensure_user(author);

        let id = tables.next_id();
        let row = PostRow {
            id,
            text: post.text,
            pub_date: Utc::now(),
            image: post.image,
            author_id: author.id,
            group_id: post.group,
        };
        let created = tables.post(&row)?;
        tables.posts.insert(id, row);
        Ok(created)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Post> {
        let tables = self.tables.read().await;
        let row = tables.posts.get(&id).ok_or(StoreError::NotFound("post"))?;
        tables.post(row)
    }

    async fn list_posts(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<(Vec<Post>, usize)> {
        let tables = self.tables.read().await;
        let ids: Vec<i64> = tables.posts.keys().rev().copied().collect();
        let total = ids.len();

        let posts = window(&ids, limit, offset)
            .into_iter()
            .filter_map(|id| tables.posts.get(&id))
            .map(|row| tables.post(row))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((posts, total))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&id) {
            return Err(StoreError::NotFound("post"));
        }
        if let Some(group) = changes.group {
            tables.check_group(group)?;
        }

        let row = tables
            .posts
            .get_mut(&id)
            .ok_or(StoreError::NotFound("post"))?;
        if let Some(text) = changes.text {
            row.text = text;
        }
        if let Some(group) = changes.group {
            row.group_id = group;
        }
        if let Some(image) = changes.image {
            row.image = image;
        }

        let row = tables.posts.get(&id).ok_or(StoreError::NotFound("post"))?;
        tables.post(row)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .posts
            .remove(&id)
            .ok_or(StoreError::NotFound("post"))?;
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(())
    }

    async fn create_comment(
        &self,
        author: &UserRef,
        post_id: i64,
        text: String,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(StoreError::NotFound("post"));
        }
        tables.ensure_user(author);

        let id = tables.next_id();
        let row = CommentRow {
            id,
            post_id,
            author_id: author.id,
            text,
            created: Utc::now(),
        };
        let created = tables.comment(&row)?;
        tables.comments.insert(id, row);
        Ok(created)
    }

    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Comment> {
        let tables = self.tables.read().await;
        let row = tables.comment_row(post_id, id)?;
        tables.comment(row)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&CommentRow> = tables
            .comments
            .values()
            .filter(|row| row.post_id == post_id)
            .collect();
        rows.sort_by_key(|row| (row.created, row.id));
        rows.into_iter().map(|row| tables.comment(row)).collect()
    }

    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        tables.comment_row(post_id, id)?;
        if let Some(row) = tables.comments.get_mut(&id) {
            row.text = text;
        }
        let row = tables.comment_row(post_id, id)?;
        tables.comment(row)
    }

    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.comment_row(post_id, id)?;
        tables.comments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn create_follow(&self, follower: &UserRef, following: &UserRef) -> StoreResult<Follow> {
        if follower.id == following.id {
            return Err(StoreError::SelfFollow);
        }

        let mut tables = self.tables.write().await;
        if !tables.follow_pairs.insert((follower.id, following.id)) {
            return Err(StoreError::DuplicateEdge);
        }
        tables.ensure_user(follower);
        tables.ensure_user(following);

        let row = FollowRow {
            id: tables.next_id(),
            user_id: follower.id,
            following_id: following.id,
        };
        tables.follows.insert(row.id, row);
        tables.follow(&row)
    }

    async fn list_follows_of(
        &self,
        follower: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Follow>> {
        let tables = self.tables.read().await;
        let needle = search.map(str::to_lowercase);

        let mut follows = Vec::new();
        for row in tables.follows.values().filter(|row| row.user_id == follower) {
            let follow = tables.follow(row)?;
            let matches = needle
                .as_deref()
                .map_or(true, |n| follow.following.username.to_lowercase().contains(n));
            if matches {
                follows.push(follow);
            }
        }
        Ok(follows)
    }

    async fn get_follow(&self, id: i64, owner: Uuid) -> StoreResult<Follow> {
        let tables = self.tables.read().await;
        let row = tables.owned_follow(id, owner)?;
        tables.follow(&row)
    }

    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.follow_pairs.contains(&(follower, following)))
    }

    async fn delete_follow(&self, id: i64, owner: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables.owned_follow(id, owner)?;
        tables.follows.remove(&row.id);
        tables.follow_pairs.remove(&(row.user_id, row.following_id));
        Ok(())
    }
}
