use crate::error::{Error, Resource, Violation};
use crate::{sensor_type::SensorType, sensors, Id, Storage};
use chrono::{DateTime, Utc};
use log::*;
use serde::Deserialize;

/// Length of every sensor serial number.
pub const SERIAL_NUMBER_LENGTH: usize = 10;

/// Registration request for a sensor, before any of its fields are validated.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSensor {
    pub serial_number: String,
    pub sensor_type: String,
    pub description: String,
    pub is_active: bool,
}

pub fn is_valid_serial_number(serial_number: &str) -> bool {
    serial_number.len() == SERIAL_NUMBER_LENGTH
        && serial_number.bytes().all(|b| b.is_ascii_digit())
}

/// Registers a sensor, or refreshes the description and active flag of the sensor that
/// already uses the same serial number.
pub async fn register(storage: &Storage, new_sensor: NewSensor) -> Result<sensors::Model, Error> {
    if !is_valid_serial_number(&new_sensor.serial_number) {
        warn!(
            "Rejecting sensor with malformed serial number {:?}",
            new_sensor.serial_number
        );
        return Err(Error::invalid(Violation::SensorSerialNumber));
    }

    let sensor_type: SensorType = new_sensor.sensor_type.parse().map_err(|e| Error {
        source: Some(Box::new(e)),
        ..Error::invalid(Violation::SensorType)
    })?;

    match find_by_serial_number(storage, &new_sensor.serial_number).await {
        Ok(existing) => {
            debug!("Sensor {} already registered", existing.serial_number);
            let sensor = storage
                .sensors
                .update(sensors::Model {
                    description: new_sensor.description,
                    is_active: new_sensor.is_active,
                    ..existing
                })
                .await?;
            return Ok(sensor);
        }
        Err(e) if e.is_not_found(Resource::Sensor) => {}
        Err(e) => return Err(e),
    }

    let sensor = storage
        .sensors
        .create(sensors::Model {
            id: 0,
            serial_number: new_sensor.serial_number,
            sensor_type,
            current_state: 0,
            description: new_sensor.description,
            is_active: new_sensor.is_active,
            registered_at: Utc::now(),
            last_activity: DateTime::<Utc>::default(),
        })
        .await?;

    info!("Registered sensor {} ({})", sensor.id, sensor.serial_number);
    Ok(sensor)
}

pub async fn find_all(storage: &Storage) -> Result<Vec<sensors::Model>, Error> {
    Ok(storage.sensors.find_all().await?)
}

pub async fn find_by_id(storage: &Storage, sensor_id: Id) -> Result<sensors::Model, Error> {
    Ok(storage.sensors.find_by_id(sensor_id).await?)
}

pub async fn find_by_serial_number(
    storage: &Storage,
    serial_number: &str,
) -> Result<sensors::Model, Error> {
    Ok(storage.sensors.find_by_serial_number(serial_number).await?)
}
