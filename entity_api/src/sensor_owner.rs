use super::error::Error;
use async_trait::async_trait;
use entity::{sensor_owners::Model, Id};
use tokio::sync::RwLock;

#[async_trait]
pub trait SensorOwnerRepository: Send + Sync {
    async fn create(&self, sensor_owner_model: Model) -> Result<Model, Error>;

    /// Returns every binding of the user, in the order they were created.
    async fn find_by_user_id(&self, user_id: Id) -> Result<Vec<Model>, Error>;
}

#[derive(Default)]
pub struct InMemorySensorOwners {
    bindings: RwLock<Vec<Model>>,
}

#[async_trait]
impl SensorOwnerRepository for InMemorySensorOwners {
    async fn create(&self, sensor_owner_model: Model) -> Result<Model, Error> {
        let mut bindings = self.bindings.write().await;
        // Binding the same sensor twice is a no-op
        if !bindings.contains(&sensor_owner_model) {
            bindings.push(sensor_owner_model);
        }
        Ok(sensor_owner_model)
    }

    async fn find_by_user_id(&self, user_id: Id) -> Result<Vec<Model>, Error> {
        Ok(self
            .bindings
            .read()
            .await
            .iter()
            .filter(|binding| binding.user_id == user_id)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_by_user_id_only_returns_that_users_bindings() -> Result<(), Error> {
        let sensor_owners = InMemorySensorOwners::default();

        for (user_id, sensor_id) in [(1, 10), (2, 20), (1, 11), (1, 10)] {
            sensor_owners.create(Model { user_id, sensor_id }).await?;
        }

        let sensor_ids: Vec<Id> = sensor_owners
            .find_by_user_id(1)
            .await?
            .iter()
            .map(|binding| binding.sensor_id)
            .collect();

        assert_eq!(sensor_ids, vec![10, 11]);
        Ok(())
    }
}
