use crate::error::{Error, Violation};
use crate::{events, sensors, EventRegistry, Id, Storage};
use chrono::{DateTime, Utc};
use log::*;
use serde::Deserialize;
use subscription::ErrorKind as SubscriptionErrorKind;

/// An event as reported by a sensor, before it is tied to a registered sensor.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportedEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub sensor_serial_number: String,
    pub payload: i64,
}

/// Stores a reported event, records it as the sensor's current state and broadcasts it to
/// the sensor's subscribers.
///
/// A sensor nobody is subscribed to is not an error. A storage failure aborts before anything
/// is broadcast.
pub async fn receive(
    storage: &Storage,
    registry: &EventRegistry,
    reported: ReportedEvent,
) -> Result<events::Model, Error> {
    let timestamp = reported
        .timestamp
        .ok_or_else(|| Error::invalid(Violation::EventTimestamp))?;

    let sensor = storage
        .sensors
        .find_by_serial_number(&reported.sensor_serial_number)
        .await?;

    let event = storage
        .events
        .create(events::Model {
            timestamp,
            sensor_serial_number: sensor.serial_number.clone(),
            sensor_id: sensor.id,
            payload: reported.payload,
        })
        .await?;

    storage
        .sensors
        .update(sensors::Model {
            current_state: event.payload,
            last_activity: event.timestamp,
            ..sensor
        })
        .await?;

    broadcast(registry, &event).await?;

    Ok(event)
}

async fn broadcast(registry: &EventRegistry, event: &events::Model) -> Result<(), Error> {
    let handle = match registry.broadcast_handle(event.sensor_id).await {
        Ok(handle) => handle,
        Err(e) if e.error_kind == SubscriptionErrorKind::SensorNotFound => {
            trace!("No subscribers for sensor {}", event.sensor_id);
            return Ok(());
        }
        Err(e) => {
            warn!("Cannot broadcast event of sensor {}: {e}", event.sensor_id);
            return Err(e.into());
        }
    };

    handle.send(event.clone()).await?;
    Ok(())
}

pub async fn find_last_by_sensor_id(
    storage: &Storage,
    sensor_id: Id,
) -> Result<events::Model, Error> {
    Ok(storage.events.find_last_by_sensor_id(sensor_id).await?)
}

/// Events of the sensor with `start <= timestamp <= end`, oldest first.
pub async fn find_history(
    storage: &Storage,
    sensor_id: Id,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<events::Model>, Error> {
    if start > end {
        return Err(Error::invalid(Violation::EventTimestamp));
    }

    let sensor = storage.sensors.find_by_id(sensor_id).await?;
    Ok(storage
        .events
        .find_by_sensor_id_between(sensor.id, start, end)
        .await?)
}
