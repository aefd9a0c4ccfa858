use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{is_violation, like_pattern, PgStore, CHECK_VIOLATION, UNIQUE_VIOLATION};
use crate::models::{Follow, UserRef};
use crate::store::{RelationshipStore, StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct FollowRecord {
    id: i64,
    user_id: Uuid,
    user_username: String,
    following_id: Uuid,
    following_username: String,
}

impl From<FollowRecord> for Follow {
    fn from(record: FollowRecord) -> Self {
        Follow {
            id: record.id,
            user: UserRef {
                id: record.user_id,
                username: record.user_username,
            },
            following: UserRef {
                id: record.following_id,
                username: record.following_username,
            },
        }
    }
}

const FOLLOW_COLUMNS: &str = r#"
    fo.id,
    fo.user_id, f.username AS user_username,
    fo.following_id, t.username AS following_username
"#;

#[async_trait]
impl RelationshipStore for PgStore {
    async fn create_follow(&self, follower: &UserRef, following: &UserRef) -> StoreResult<Follow> {
        if follower.id == following.id {
            return Err(StoreError::SelfFollow);
        }

        self.ensure_user_exists(follower).await?;
        self.ensure_user_exists(following).await?;

        // Single statement insert-if-absent: of N concurrent inserts for the
        // same pair exactly one returns a row.
        let query = format!(
            r#"
            WITH fo AS (
                INSERT INTO follows (user_id, following_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, following_id) DO NOTHING
                RETURNING id, user_id, following_id
            )
            SELECT {FOLLOW_COLUMNS}
            FROM fo
            JOIN users f ON f.id = fo.user_id
            JOIN users t ON t.id = fo.following_id
            "#
        );

        let record = sqlx::query_as::<_, FollowRecord>(&query)
            .bind(follower.id)
            .bind(following.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if is_violation(&err, CHECK_VIOLATION) {
                    StoreError::SelfFollow
                } else if is_violation(&err, UNIQUE_VIOLATION) {
                    StoreError::DuplicateEdge
                } else {
                    err.into()
                }
            })?
            .ok_or(StoreError::DuplicateEdge)?;

        debug!(
            "Created follow in PostgreSQL: {} -> {}",
            follower.id, following.id
        );
        Ok(record.into())
    }

    async fn list_follows_of(
        &self,
        follower: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Follow>> {
        let query = format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM follows fo
            JOIN users f ON f.id = fo.user_id
            JOIN users t ON t.id = fo.following_id
            WHERE fo.user_id = $1
              AND ($2::text IS NULL OR t.username ILIKE $2)
            ORDER BY fo.id
            "#
        );

        let records = sqlx::query_as::<_, FollowRecord>(&query)
            .bind(follower)
            .bind(search.map(like_pattern))
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Follow::from).collect())
    }

    async fn get_follow(&self, id: i64, owner: Uuid) -> StoreResult<Follow> {
        let query = format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM follows fo
            JOIN users f ON f.id = fo.user_id
            JOIN users t ON t.id = fo.following_id
            WHERE fo.id = $1 AND fo.user_id = $2
            "#
        );

        let record = sqlx::query_as::<_, FollowRecord>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("follow"))?;

        Ok(record.into())
    }

    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND following_id = $2)",
        )
        .bind(follower)
        .bind(following)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn delete_follow(&self, id: i64, owner: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM follows WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("follow"));
        }

        debug!(follow_id = id, user_id = %owner, "Deleted follow in PostgreSQL");
        Ok(())
    }
}
