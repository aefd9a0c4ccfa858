/// Follow service - a user's own outgoing follow edges
use tracing::{info, warn};
use validator::Validate;

use super::remember_actor;
use crate::authz::{authorize, require_user, Action, FollowTarget, Resource};
use crate::error::{AppError, Result, ValidationReason};
use crate::models::{Actor, Follow};
use crate::store::{StoreError, Stores};

/// Body of a follow request: the username to follow.
#[derive(Debug, Clone, Default, Validate)]
pub struct FollowDraft {
    #[validate(required, length(min = 1))]
    pub following: Option<String>,
}

impl FollowDraft {
    pub fn of(username: impl Into<String>) -> Self {
        Self {
            following: Some(username.into()),
        }
    }
}

#[derive(Clone)]
pub struct FollowService {
    stores: Stores,
}

impl FollowService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// The actor's edges, optionally filtered by a substring of the followed
    /// username. Other users' edges are never visible.
    pub async fn list_follows(&self, actor: &Actor, search: Option<&str>) -> Result<Vec<Follow>> {
        authorize(actor, Action::List, &Resource::Follow(FollowTarget::Collection))?;
        let user = require_user(actor)?;

        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self
            .stores
            .relationships
            .list_follows_of(user.id, search)
            .await?)
    }

    /// One of the actor's own edges; a foreign edge is reported as missing.
    pub async fn get_follow(&self, actor: &Actor, id: i64) -> Result<Follow> {
        let user = require_user(actor)?;
        let follow = self.stores.relationships.get_follow(id, user.id).await?;
        authorize(
            actor,
            Action::Retrieve,
            &Resource::Follow(FollowTarget::Edge {
                owner: follow.user.id,
            }),
        )?;
        Ok(follow)
    }

    /// Follow another user by username.
    ///
    /// Self-follow and duplicate pairs are rejected up front by the
    /// authorization engine; the store insert is still atomic, so two racing
    /// requests for the same pair end with one edge and one `duplicate-follow`.
    pub async fn create_follow(&self, actor: &Actor, draft: FollowDraft) -> Result<Follow> {
        require_user(actor)?;
        draft.validate()?;
        let username = draft
            .following
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| AppError::missing_field("following"))?;

        let user = remember_actor(&self.stores, actor).await?;
        let target = self
            .stores
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::invalid_reference("following"))?;

        let already_following = self
            .stores
            .relationships
            .is_following(user.id, target.id)
            .await?;
        authorize(
            actor,
            Action::Create,
            &Resource::Follow(FollowTarget::Proposed {
                following: target.id,
                already_following,
            }),
        )?;

        let follow = match self.stores.relationships.create_follow(user, &target).await {
            Ok(follow) => follow,
            Err(StoreError::DuplicateEdge) => {
                warn!(
                    user_id = %user.id,
                    following_id = %target.id,
                    "Concurrent follow lost the insert race"
                );
                return Err(AppError::validation(ValidationReason::DuplicateFollow));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            follow_id = follow.id,
            user_id = %user.id,
            following_id = %target.id,
            "Follow created"
        );
        Ok(follow)
    }

    /// Follow edges have no update operation.
    pub fn update_follow(&self, actor: &Actor) -> Result<()> {
        authorize(actor, Action::Update, &Resource::Follow(FollowTarget::Collection))
    }

    pub async fn delete_follow(&self, actor: &Actor, id: i64) -> Result<()> {
        let user = require_user(actor)?;
        let follow = self.stores.relationships.get_follow(id, user.id).await?;
        authorize(
            actor,
            Action::Delete,
            &Resource::Follow(FollowTarget::Edge {
                owner: follow.user.id,
            }),
        )?;

        self.stores.relationships.delete_follow(id, user.id).await?;
        info!(follow_id = id, user_id = %user.id, "Follow deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn known(stores: &Stores, name: &str) -> Actor {
        let actor = Actor::user(Uuid::new_v4(), name);
        stores.users.upsert_user(actor.as_user().unwrap()).await.unwrap();
        actor
    }

    #[tokio::test]
    async fn follow_by_username_and_reject_repeats() {
        let stores = Stores::memory();
        let service = FollowService::new(stores.clone());
        let alice = known(&stores, "alice").await;
        known(&stores, "bob").await;

        let follow = service.create_follow(&alice, FollowDraft::of("bob")).await.unwrap();
        assert_eq!(follow.user.username, "alice");
        assert_eq!(follow.following.username, "bob");

        let err = service
            .create_follow(&alice, FollowDraft::of("bob"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "duplicate-follow");

        let err = service
            .create_follow(&alice, FollowDraft::of("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "self-follow");
    }

    #[tokio::test]
    async fn body_problems_are_validation_errors() {
        let stores = Stores::memory();
        let service = FollowService::new(stores.clone());
        let alice = known(&stores, "alice").await;

        let err = service
            .create_follow(&alice, FollowDraft::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "missing-field");

        let err = service
            .create_follow(&alice, FollowDraft::of("nobody"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "invalid-reference");

        let err = service
            .create_follow(&Actor::Anonymous, FollowDraft::of("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn edges_of_others_are_invisible() {
        let stores = Stores::memory();
        let service = FollowService::new(stores.clone());
        let alice = known(&stores, "alice").await;
        let bob = known(&stores, "bob").await;
        known(&stores, "carol").await;

        let mine = service.create_follow(&alice, FollowDraft::of("carol")).await.unwrap();
        service.create_follow(&bob, FollowDraft::of("carol")).await.unwrap();

        let listed = service.list_follows(&alice, None).await.unwrap();
        assert_eq!(listed, vec![mine.clone()]);

        let err = service.get_follow(&bob, mine.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = service.delete_follow(&bob, mine.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(matches!(
            service.update_follow(&alice).unwrap_err(),
            AppError::MethodNotAllowed
        ));

        service.delete_follow(&alice, mine.id).await.unwrap();
        assert!(service.list_follows(&alice, None).await.unwrap().is_empty());
    }
}
