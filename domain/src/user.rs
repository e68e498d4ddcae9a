use crate::error::{Error, Violation};
use crate::{sensor_owners, sensors, users, Id, Storage};
use log::*;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
}

pub async fn register(storage: &Storage, new_user: NewUser) -> Result<users::Model, Error> {
    if new_user.name.trim().is_empty() {
        return Err(Error::invalid(Violation::UserName));
    }

    let user = storage
        .users
        .create(users::Model {
            id: 0,
            name: new_user.name,
        })
        .await?;

    info!("Registered user {}", user.id);
    Ok(user)
}

pub async fn find_by_id(storage: &Storage, user_id: Id) -> Result<users::Model, Error> {
    Ok(storage.users.find_by_id(user_id).await?)
}

/// Makes `user_id` an owner of `sensor_id`. Both must already exist.
pub async fn attach_sensor(
    storage: &Storage,
    user_id: Id,
    sensor_id: Id,
) -> Result<sensor_owners::Model, Error> {
    let user = find_by_id(storage, user_id).await?;
    let sensor = storage.sensors.find_by_id(sensor_id).await?;

    let binding = storage
        .sensor_owners
        .create(sensor_owners::Model {
            user_id: user.id,
            sensor_id: sensor.id,
        })
        .await?;

    debug!("Sensor {} attached to user {}", sensor.id, user.id);
    Ok(binding)
}

/// Every sensor owned by the user, in the order they were attached.
pub async fn find_sensors(storage: &Storage, user_id: Id) -> Result<Vec<sensors::Model>, Error> {
    let user = find_by_id(storage, user_id).await?;

    let bindings = storage.sensor_owners.find_by_user_id(user.id).await?;
    let mut sensors = Vec::with_capacity(bindings.len());
    for binding in bindings {
        sensors.push(storage.sensors.find_by_id(binding.sensor_id).await?);
    }

    Ok(sensors)
}
