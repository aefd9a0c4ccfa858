use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{is_violation, PgStore, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use crate::models::{Comment, Group, NewGroup, NewPost, Post, PostChanges, UserRef};
use crate::store::{ContentStore, StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct PostRecord {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    image_name: Option<String>,
    author_id: Uuid,
    author_username: String,
    group_id: Option<i64>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Post {
            id: record.id,
            text: record.text,
            pub_date: record.pub_date,
            image: record.image_name,
            author: UserRef {
                id: record.author_id,
                username: record.author_username,
            },
            group: record.group_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRecord {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    author_username: String,
    text: String,
    created: DateTime<Utc>,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Comment {
            id: record.id,
            post: record.post_id,
            author: UserRef {
                id: record.author_id,
                username: record.author_username,
            },
            text: record.text,
            created: record.created,
        }
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_violation(&err, UNIQUE_VIOLATION) {
                StoreError::Internal(format!("group slug '{}' already exists", group.slug))
            } else {
                err.into()
            }
        })
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn get_group(&self, id: i64) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("group"))
    }

    async fn create_post(&self, author: &UserRef, post: NewPost) -> StoreResult<Post> {
        self.ensure_user_exists(author).await?;

        let (image_name, image_type, image_data) = match post.image {
            Some(blob) => (Some(blob.name), Some(blob.content_type), Some(blob.data)),
            None => (None, None, None),
        };

        let record = sqlx::query_as::<_, PostRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO posts (text, image_name, image_content_type, image_data, author_id, group_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, text, pub_date, image_name, author_id, group_id
            )
            SELECT i.id, i.text, i.pub_date, i.image_name, i.author_id,
                   u.username AS author_username, i.group_id
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(&post.text)
        .bind(image_name)
        .bind(image_type)
        .bind(image_data)
        .bind(author.id)
        .bind(post.group)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_violation(&err, FOREIGN_KEY_VIOLATION) {
                StoreError::InvalidReference("group")
            } else {
                err.into()
            }
        })?;

        Ok(record.into())
    }

    async fn get_post(&self, id: i64) -> StoreResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT p.id, p.text, p.pub_date, p.image_name, p.author_id,
                   u.username AS author_username, p.group_id
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("post"))?;

        Ok(record.into())
    }

    async fn list_posts(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> StoreResult<(Vec<Post>, usize)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        // LIMIT NULL is LIMIT ALL.
        let records = sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT p.id, p.text, p.pub_date, p.image_name, p.author_id,
                   u.username AS author_username, p.group_id
            FROM posts p
            JOIN users u ON u.id = p.author_id
            ORDER BY p.pub_date DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok((
            records.into_iter().map(Post::from).collect(),
            total as usize,
        ))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Post> {
        let set_group = changes.group.is_some();
        let group = changes.group.flatten();
        let set_image = changes.image.is_some();
        let (image_name, image_type, image_data) = match changes.image.flatten() {
            Some(blob) => (Some(blob.name), Some(blob.content_type), Some(blob.data)),
            None => (None, None, None),
        };

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE posts SET
                text = COALESCE($2, text),
                group_id = CASE WHEN $3 THEN $4 ELSE group_id END,
                image_name = CASE WHEN $5 THEN $6 ELSE image_name END,
                image_content_type = CASE WHEN $5 THEN $7 ELSE image_content_type END,
                image_data = CASE WHEN $5 THEN $8 ELSE image_data END
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(changes.text)
        .bind(set_group)
        .bind(group)
        .bind(set_image)
        .bind(image_name)
        .bind(image_type)
        .bind(image_data)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            if is_violation(&err, FOREIGN_KEY_VIOLATION) {
                StoreError::InvalidReference("group")
            } else {
                err.into()
            }
        })?;

        match updated {
            Some(id) => self.get_post(id).await,
            None => Err(StoreError::NotFound("post")),
        }
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        // comments go with the post (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("post"));
        }
        Ok(())
    }

    async fn create_comment(
        &self,
        author: &UserRef,
        post_id: i64,
        text: String,
    ) -> StoreResult<Comment> {
        self.ensure_user_exists(author).await?;

        let record = sqlx::query_as::<_, CommentRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, text, created
            )
            SELECT i.id, i.post_id, i.author_id, u.username AS author_username, i.text, i.created
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(post_id)
        .bind(author.id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_violation(&err, FOREIGN_KEY_VIOLATION) {
                StoreError::NotFound("post")
            } else {
                err.into()
            }
        })?;

        Ok(record.into())
    }

    async fn get_comment(&self, post_id: i64, id: i64) -> StoreResult<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1 AND c.post_id = $2
            "#,
        )
        .bind(id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("comment"))?;

        Ok(record.into())
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Comment::from).collect())
    }

    async fn update_comment(&self, post_id: i64, id: i64, text: String) -> StoreResult<Comment> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE comments
            SET text = $3
            WHERE id = $1 AND post_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.get_comment(post_id, id).await,
            None => Err(StoreError::NotFound("comment")),
        }
    }

    async fn delete_comment(&self, post_id: i64, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2")
            .bind(id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("comment"));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
