/// Group service - groups are read-only over the API
use crate::authz::{authorize, Action, Resource};
use crate::error::Result;
use crate::models::{Actor, Group};
use crate::store::Stores;

#[derive(Clone)]
pub struct GroupService {
    stores: Stores,
}

impl GroupService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn list_groups(&self, actor: &Actor) -> Result<Vec<Group>> {
        authorize(actor, Action::List, &Resource::Group)?;
        Ok(self.stores.content.list_groups().await?)
    }

    pub async fn get_group(&self, actor: &Actor, id: i64) -> Result<Group> {
        authorize(actor, Action::Retrieve, &Resource::Group)?;
        Ok(self.stores.content.get_group(id).await?)
    }

    /// Any write on a group; always denied by the engine.
    pub fn write_group(&self, actor: &Actor, action: Action) -> Result<()> {
        authorize(actor, action, &Resource::Group)
    }
}
