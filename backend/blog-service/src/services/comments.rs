/// Comment service - comments always live under the post named in the path
use tracing::info;
use validator::Validate;

use super::{clean_text, remember_actor, UpdateMode};
use crate::authz::{authorize, require_user, Action, Resource};
use crate::error::{AppError, Result};
use crate::models::{Actor, Comment};
use crate::store::Stores;

/// Client-supplied comment fields. There is no `post` field:
/// the post comes from the URL.
#[derive(Debug, Clone, Default, Validate)]
pub struct CommentDraft {
    #[validate(length(min = 1))]
    pub text: Option<String>,
}

impl CommentDraft {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    fn checked(mut self) -> Result<Self> {
        self.text = clean_text(self.text);
        self.validate()?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct CommentService {
    stores: Stores,
}

impl CommentService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Comments of `post_id`, oldest first.
    pub async fn list_comments(&self, actor: &Actor, post_id: i64) -> Result<Vec<Comment>> {
        authorize(actor, Action::List, &Resource::Comment { author: None })?;
        Ok(self.stores.content.list_comments(post_id).await?)
    }

    pub async fn get_comment(&self, actor: &Actor, post_id: i64, id: i64) -> Result<Comment> {
        let comment = self.stores.content.get_comment(post_id, id).await?;
        authorize(
            actor,
            Action::Retrieve,
            &Resource::Comment {
                author: Some(comment.author.id),
            },
        )?;
        Ok(comment)
    }

    pub async fn create_comment(
        &self,
        actor: &Actor,
        post_id: i64,
        draft: CommentDraft,
    ) -> Result<Comment> {
        authorize(actor, Action::Create, &Resource::Comment { author: None })?;
        let text = draft
            .checked()?
            .text
            .ok_or_else(|| AppError::missing_field("text"))?;

        let author = remember_actor(&self.stores, actor).await?;
        let comment = self
            .stores
            .content
            .create_comment(author, post_id, text)
            .await?;

        info!(
            comment_id = comment.id,
            post_id,
            user_id = %author.id,
            "Comment created"
        );
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        actor: &Actor,
        post_id: i64,
        id: i64,
        draft: CommentDraft,
        mode: UpdateMode,
    ) -> Result<Comment> {
        require_user(actor)?;
        let current = self.stores.content.get_comment(post_id, id).await?;
        authorize(
            actor,
            Action::Update,
            &Resource::Comment {
                author: Some(current.author.id),
            },
        )?;

        let draft = draft.checked()?;
        let text = match (draft.text, mode) {
            (Some(text), _) => text,
            (None, UpdateMode::Full) => return Err(AppError::missing_field("text")),
            (None, UpdateMode::Partial) => return Ok(current),
        };

        let comment = self.stores.content.update_comment(post_id, id, text).await?;
        info!(comment_id = id, post_id, user_id = ?actor.id(), "Comment updated");
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor: &Actor, post_id: i64, id: i64) -> Result<()> {
        require_user(actor)?;
        let current = self.stores.content.get_comment(post_id, id).await?;
        authorize(
            actor,
            Action::Delete,
            &Resource::Comment {
                author: Some(current.author.id),
            },
        )?;

        self.stores.content.delete_comment(post_id, id).await?;
        info!(comment_id = id, post_id, user_id = ?actor.id(), "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, UserRef};
    use uuid::Uuid;

    async fn post_by(stores: &Stores, author: &Actor) -> i64 {
        let user: &UserRef = author.as_user().unwrap();
        stores
            .content
            .create_post(
                user,
                NewPost {
                    text: "post".into(),
                    group: None,
                    image: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn comment_lands_on_path_post() {
        let stores = Stores::memory();
        let service = CommentService::new(stores.clone());
        let alice = Actor::user(Uuid::new_v4(), "alice");
        let post_id = post_by(&stores, &alice).await;

        let comment = service
            .create_comment(&alice, post_id, CommentDraft::with_text("hello"))
            .await
            .unwrap();
        assert_eq!(comment.post, post_id);
        assert_eq!(comment.author.username, "alice");

        let err = service
            .create_comment(&alice, post_id + 1000, CommentDraft::with_text("lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_author_edits_and_patch_without_text_is_noop() {
        let stores = Stores::memory();
        let service = CommentService::new(stores.clone());
        let alice = Actor::user(Uuid::new_v4(), "alice");
        let bob = Actor::user(Uuid::new_v4(), "bob");
        let post_id = post_by(&stores, &alice).await;
        let comment = service
            .create_comment(&bob, post_id, CommentDraft::with_text("bob's"))
            .await
            .unwrap();

        let err = service
            .update_comment(
                &alice,
                post_id,
                comment.id,
                CommentDraft::with_text("hijack"),
                UpdateMode::Partial,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let same = service
            .update_comment(
                &bob,
                post_id,
                comment.id,
                CommentDraft::default(),
                UpdateMode::Partial,
            )
            .await
            .unwrap();
        assert_eq!(same, comment);

        let err = service
            .update_comment(
                &bob,
                post_id,
                comment.id,
                CommentDraft::default(),
                UpdateMode::Full,
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "missing-field");

        let err = service
            .delete_comment(&Actor::Anonymous, post_id, comment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        service.delete_comment(&bob, post_id, comment.id).await.unwrap();
        assert!(service
            .list_comments(&Actor::Anonymous, post_id)
            .await
            .unwrap()
            .is_empty());
    }
}
