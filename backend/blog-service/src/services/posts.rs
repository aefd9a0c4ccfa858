/// Post service - listing, creation and author-only modification
use mime::Mime;
use tracing::info;
use validator::Validate;

use super::{clean_text, remember_actor, UpdateMode};
use crate::authz::{authorize, require_user, Action, Resource};
use crate::config::PaginationConfig;
use crate::error::{AppError, Result};
use crate::image;
use crate::models::{Actor, ImageBlob, NewPost, Page, Post, PostChanges, PostListing};
use crate::store::Stores;

/// Where a post image comes from before it is decoded.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// `data:image/<ext>;base64,<payload>` from a JSON body
    DataUri(String),
    /// File part of a multipart body
    Upload {
        content_type: Option<Mime>,
        data: Vec<u8>,
    },
}

impl ImageSource {
    fn decode(self) -> Result<ImageBlob> {
        match self {
            ImageSource::DataUri(uri) => image::decode_data_uri(&uri),
            ImageSource::Upload { content_type, data } => {
                image::from_upload(content_type.as_ref(), data)
            }
        }
    }
}

/// Client-supplied post fields. The author is never part of the body.
///
/// `group` and `image` distinguish "absent" (`None`) from "cleared"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, Validate)]
pub struct PostDraft {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub group: Option<Option<i64>>,
    pub image: Option<Option<ImageSource>>,
}

impl PostDraft {
    fn checked(mut self) -> Result<Self> {
        self.text = clean_text(self.text);
        self.validate()?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct PostService {
    stores: Stores,
    pagination: PaginationConfig,
}

impl PostService {
    pub fn new(stores: Stores, pagination: PaginationConfig) -> Self {
        Self { stores, pagination }
    }

    /// List posts, newest first.
    ///
    /// Without a usable `limit` and without a configured default page size
    /// every post is returned. Otherwise one page is returned, with `limit`
    /// capped at the configured maximum.
    pub async fn list_posts(
        &self,
        actor: &Actor,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<PostListing> {
        authorize(actor, Action::List, &Resource::Post { author: None })?;

        let limit = limit
            .filter(|l| *l > 0)
            .or(self.pagination.default_page_size)
            .map(|l| l.min(self.pagination.max_page_size));

        match limit {
            None => {
                let (posts, _) = self.stores.content.list_posts(None, 0).await?;
                Ok(PostListing::All(posts))
            }
            Some(limit) => {
                let offset = offset.unwrap_or(0);
                let (results, count) = self.stores.content.list_posts(Some(limit), offset).await?;
                Ok(PostListing::Paged(Page {
                    count,
                    limit,
                    offset,
                    results,
                }))
            }
        }
    }

    pub async fn get_post(&self, actor: &Actor, id: i64) -> Result<Post> {
        let post = self.stores.content.get_post(id).await?;
        authorize(
            actor,
            Action::Retrieve,
            &Resource::Post {
                author: Some(post.author.id),
            },
        )?;
        Ok(post)
    }

    /// Create a post authored by `actor`.
    pub async fn create_post(&self, actor: &Actor, draft: PostDraft) -> Result<Post> {
        authorize(actor, Action::Create, &Resource::Post { author: None })?;
        let draft = draft.checked()?;

        let text = draft.text.ok_or_else(|| AppError::missing_field("text"))?;
        let image = draft.image.flatten().map(ImageSource::decode).transpose()?;

        let author = remember_actor(&self.stores, actor).await?;
        let post = self
            .stores
            .content
            .create_post(
                author,
                NewPost {
                    text,
                    group: draft.group.flatten(),
                    image,
                },
            )
            .await?;

        info!(post_id = post.id, user_id = %author.id, "Post created");
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &Actor,
        id: i64,
        draft: PostDraft,
        mode: UpdateMode,
    ) -> Result<Post> {
        require_user(actor)?;
        let current = self.stores.content.get_post(id).await?;
        authorize(
            actor,
            Action::Update,
            &Resource::Post {
                author: Some(current.author.id),
            },
        )?;

        let draft = draft.checked()?;
        if mode == UpdateMode::Full && draft.text.is_none() {
            return Err(AppError::missing_field("text"));
        }

        let image = match draft.image {
            Some(Some(source)) => Some(Some(source.decode()?)),
            Some(None) => Some(None),
            None => None,
        };

        let post = self
            .stores
            .content
            .update_post(
                id,
                PostChanges {
                    text: draft.text,
                    group: draft.group,
                    image,
                },
            )
            .await?;

        info!(post_id = id, user_id = ?actor.id(), "Post updated");
        Ok(post)
    }

    /// Delete a post; its comments go with it.
    pub async fn delete_post(&self, actor: &Actor, id: i64) -> Result<()> {
        require_user(actor)?;
        let current = self.stores.content.get_post(id).await?;
        authorize(
            actor,
            Action::Delete,
            &Resource::Post {
                author: Some(current.author.id),
            },
        )?;

        self.stores.content.delete_post(id).await?;
        info!(post_id = id, user_id = ?actor.id(), "Post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn service(default_page_size: Option<usize>) -> PostService {
        PostService::new(
            Stores::memory(),
            PaginationConfig {
                default_page_size,
                max_page_size: 3,
            },
        )
    }

    fn draft(text: &str) -> PostDraft {
        PostDraft {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    async fn seed(service: &PostService, actor: &Actor, n: usize) {
        for i in 0..n {
            service.create_post(actor, draft(&format!("post {i}"))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unpaginated_without_limit_or_default() {
        let service = service(None);
        let alice = Actor::user(Uuid::new_v4(), "alice");
        seed(&service, &alice, 5).await;

        match service.list_posts(&Actor::Anonymous, None, Some(2)).await.unwrap() {
            PostListing::All(posts) => assert_eq!(posts.len(), 5),
            PostListing::Paged(_) => panic!("expected an unpaginated listing"),
        }
    }

    #[tokio::test]
    async fn limit_is_capped_and_offset_past_end_is_empty() {
        let service = service(Some(2));
        let alice = Actor::user(Uuid::new_v4(), "alice");
        seed(&service, &alice, 5).await;

        let PostListing::Paged(page) = service.list_posts(&alice, None, None).await.unwrap() else {
            panic!("expected a page");
        };
        assert_eq!((page.count, page.limit, page.results.len()), (5, 2, 2));
        assert!(page.has_next());

        let PostListing::Paged(page) = service.list_posts(&alice, Some(50), Some(0)).await.unwrap()
        else {
            panic!("expected a page");
        };
        assert_eq!(page.limit, 3);

        let PostListing::Paged(page) = service.list_posts(&alice, Some(2), Some(99)).await.unwrap()
        else {
            panic!("expected a page");
        };
        assert!(page.results.is_empty());
        assert_eq!(page.count, 5);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn anonymous_writes_are_unauthenticated_before_lookup() {
        let service = service(None);

        let err = service.create_post(&Actor::Anonymous, draft("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));

        // Even for a post that does not exist.
        let err = service
            .update_post(&Actor::Anonymous, 42, draft("x"), UpdateMode::Partial)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn non_author_cannot_modify() {
        let service = service(None);
        let alice = Actor::user(Uuid::new_v4(), "alice");
        let bob = Actor::user(Uuid::new_v4(), "bob");
        let post = service.create_post(&alice, draft("mine")).await.unwrap();

        let err = service
            .update_post(&bob, post.id, draft("theirs"), UpdateMode::Partial)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = service.delete_post(&bob, post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let updated = service
            .update_post(&alice, post.id, draft("edited"), UpdateMode::Partial)
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
        assert_eq!(updated.author, post.author);
    }

    #[tokio::test]
    async fn text_rules_for_create_put_and_patch() {
        let service = service(None);
        let alice = Actor::user(Uuid::new_v4(), "alice");

        let err = service.create_post(&alice, draft("   ")).await.unwrap_err();
        assert_eq!(err.reason(), "missing-field");
        let err = service.create_post(&alice, PostDraft::default()).await.unwrap_err();
        assert_eq!(err.reason(), "missing-field");

        let post = service.create_post(&alice, draft("keep")).await.unwrap();

        let err = service
            .update_post(&alice, post.id, PostDraft::default(), UpdateMode::Full)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "missing-field");

        let unchanged = service
            .update_post(&alice, post.id, PostDraft::default(), UpdateMode::Partial)
            .await
            .unwrap();
        assert_eq!(unchanged.text, "keep");
    }
}
