use uuid::Uuid;

use super::UserRef;

/// The identity issuing a request, resolved once per request by the identity
/// middleware and passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(UserRef),
}

impl Actor {
    pub fn user(id: Uuid, username: impl Into<String>) -> Self {
        Actor::User(UserRef {
            id,
            username: username.into(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Actor::User(user) => Some(user.id),
            Actor::Anonymous => None,
        }
    }

    pub fn as_user(&self) -> Option<&UserRef> {
        match self {
            Actor::User(user) => Some(user),
            Actor::Anonymous => None,
        }
    }
}
