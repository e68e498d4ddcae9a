use super::error::{Error, Record};
use async_trait::async_trait;
use entity::{users::Model, Id};
use std::collections::HashMap;
use tokio::sync::RwLock;

use log::*;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user_model: Model) -> Result<Model, Error>;

    async fn find_by_id(&self, id: Id) -> Result<Model, Error>;
}

#[derive(Default)]
struct UserTable {
    by_id: HashMap<Id, Model>,
    last_id: Id,
}

#[derive(Default)]
pub struct InMemoryUsers {
    table: RwLock<UserTable>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, user_model: Model) -> Result<Model, Error> {
        debug!("New User Model to be inserted: {user_model:?}");

        let mut table = self.table.write().await;
        table.last_id += 1;

        let user = Model {
            id: table.last_id,
            ..user_model
        };
        table.by_id.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Id) -> Result<Model, Error> {
        self.table
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(Record::User))
    }
}
