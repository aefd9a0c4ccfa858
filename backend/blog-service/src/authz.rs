//! Authorization engine for blog-service
//!
//! A pure decision over (actor, action, resource snapshot). Rules are
//! evaluated top to bottom and the first matching rule decides:
//!
//! 1. reads on groups, posts and comments are public
//! 2. creating a post or comment requires an authenticated actor
//! 3. updating or deleting a post or comment is reserved to its author
//! 4. every follow operation requires an authenticated actor and only ever
//!    touches the actor's own outgoing edges
//! 5. groups are read-only
//!
//! Nothing here touches a store. Callers load the ownership snapshot, ask for
//! a decision, and only then mutate.
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, ValidationReason};
use crate::models::{Actor, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_read(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// What the action targets, with just enough ownership data to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Group,
    /// `author` is `None` for the collection (list / create).
    Post { author: Option<Uuid> },
    Comment { author: Option<Uuid> },
    Follow(FollowTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowTarget {
    /// The actor's own edge set
    Collection,
    /// An existing edge owned by `owner`
    Edge { owner: Uuid },
    /// An edge the actor asks to create
    Proposed {
        following: Uuid,
        already_following: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden,
    Validation(ValidationReason),
    MethodNotAllowed,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => AppError::Unauthenticated,
            Denial::Forbidden => AppError::Forbidden,
            Denial::Validation(reason) => AppError::Validation(reason),
            Denial::MethodNotAllowed => AppError::MethodNotAllowed,
        }
    }
}

fn deny(denial: Denial) -> Decision {
    Decision::Deny(denial)
}

/// Evaluate the rule list for one request.
pub fn decide(actor: &Actor, action: Action, resource: &Resource) -> Decision {
    match resource {
        // 1 + 5. groups: public reads, no writes
        Resource::Group if action.is_read() => Decision::Allow,
        Resource::Group => deny(Denial::MethodNotAllowed),

        Resource::Post { author } | Resource::Comment { author } => match action {
            // 1. public reads
            Action::List | Action::Retrieve => Decision::Allow,

            // 2. authenticated create
            Action::Create if actor.is_authenticated() => Decision::Allow,
            Action::Create => deny(Denial::Unauthenticated),

            // 3. author-only modification
            Action::Update | Action::Delete => match (actor.id(), author) {
                (None, _) => deny(Denial::Unauthenticated),
                (Some(actor_id), Some(author_id)) if actor_id == *author_id => Decision::Allow,
                _ => deny(Denial::Forbidden),
            },
        },

        // 4. follows
        Resource::Follow(target) => match actor.id() {
            None => deny(Denial::Unauthenticated),
            Some(actor_id) => decide_follow(actor_id, action, target),
        },
    }
}

fn decide_follow(actor_id: Uuid, action: Action, target: &FollowTarget) -> Decision {
    match (action, target) {
        (Action::Update, _) => deny(Denial::MethodNotAllowed),
        (Action::List, FollowTarget::Collection) => Decision::Allow,
        (
            Action::Create,
            FollowTarget::Proposed {
                following,
                already_following,
            },
        ) => {
            if *following == actor_id {
                deny(Denial::Validation(ValidationReason::SelfFollow))
            } else if *already_following {
                deny(Denial::Validation(ValidationReason::DuplicateFollow))
            } else {
                Decision::Allow
            }
        }
        (Action::Retrieve | Action::Delete, FollowTarget::Edge { owner }) if *owner == actor_id => {
            Decision::Allow
        }
        _ => deny(Denial::Forbidden),
    }
}

/// Boolean form of [`decide`].
pub fn can_perform(actor: &Actor, action: Action, resource: &Resource) -> bool {
    decide(actor, action, resource) == Decision::Allow
}

/// [`decide`] as a `Result`, for use with `?` in the services.
pub fn authorize(actor: &Actor, action: Action, resource: &Resource) -> Result<(), AppError> {
    match decide(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => {
            debug!(
                actor = ?actor.id(),
                ?action,
                ?resource,
                ?denial,
                "Authorization denied"
            );
            Err(denial.into())
        }
    }
}

/// The authenticated user behind `actor`, or `Unauthenticated`.
pub fn require_user(actor: &Actor) -> Result<&UserRef, AppError> {
    actor.as_user().ok_or(AppError::Unauthenticated)
}
