use super::error::{Error, Record};
use async_trait::async_trait;
use chrono::Utc;
use entity::{sensors::Model, Id};
use std::collections::HashMap;
use tokio::sync::RwLock;

use log::*;

#[async_trait]
pub trait SensorRepository: Send + Sync {
    /// Stores a new sensor, assigning its id and registration time.
    async fn create(&self, sensor_model: Model) -> Result<Model, Error>;

    /// Replaces the stored state of an existing sensor.
    async fn update(&self, sensor_model: Model) -> Result<Model, Error>;

    async fn find_all(&self) -> Result<Vec<Model>, Error>;

    async fn find_by_id(&self, id: Id) -> Result<Model, Error>;

    async fn find_by_serial_number(&self, serial_number: &str) -> Result<Model, Error>;
}

#[derive(Default)]
struct SensorTable {
    by_id: HashMap<Id, Model>,
    by_serial_number: HashMap<String, Id>,
    last_id: Id,
}

#[derive(Default)]
pub struct InMemorySensors {
    table: RwLock<SensorTable>,
}

#[async_trait]
impl SensorRepository for InMemorySensors {
    async fn create(&self, sensor_model: Model) -> Result<Model, Error> {
        debug!("New Sensor Model to be inserted: {sensor_model:?}");

        let mut table = self.table.write().await;
        table.last_id += 1;

        let now = Utc::now();
        let sensor = Model {
            id: table.last_id,
            registered_at: now,
            ..sensor_model
        };

        table
            .by_serial_number
            .insert(sensor.serial_number.clone(), sensor.id);
        table.by_id.insert(sensor.id, sensor.clone());

        Ok(sensor)
    }

    async fn update(&self, sensor_model: Model) -> Result<Model, Error> {
        let mut table = self.table.write().await;

        match table.by_id.get_mut(&sensor_model.id) {
            Some(existing) => {
                debug!("Existing Sensor model to be Updated: {existing:?}");
                // Identity fields never change after registration
                *existing = Model {
                    id: existing.id,
                    serial_number: existing.serial_number.clone(),
                    registered_at: existing.registered_at,
                    ..sensor_model
                };
                Ok(existing.clone())
            }
            None => {
                error!("Sensor with id {} not found", sensor_model.id);
                Err(Error::not_found(Record::Sensor))
            }
        }
    }

    async fn find_all(&self) -> Result<Vec<Model>, Error> {
        let table = self.table.read().await;
        let mut sensors: Vec<Model> = table.by_id.values().cloned().collect();
        sensors.sort_by_key(|sensor| sensor.id);
        Ok(sensors)
    }

    async fn find_by_id(&self, id: Id) -> Result<Model, Error> {
        self.table
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(Record::Sensor))
    }

    async fn find_by_serial_number(&self, serial_number: &str) -> Result<Model, Error> {
        let table = self.table.read().await;
        table
            .by_serial_number
            .get(serial_number)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or_else(|| Error::not_found(Record::Sensor))
    }
}
