//! Following a sensor's events.
//!
//! The registry itself accepts any sensor id; these functions check the sensor exists first.
use crate::error::{Error, Resource};
use crate::{events, EventRegistry, Id, Storage};
use log::*;
use subscription::{ErrorKind as SubscriptionErrorKind, Subscription, SubscriptionId};

pub type EventSubscription = Subscription<events::Model>;

pub async fn subscribe(
    storage: &Storage,
    registry: &EventRegistry,
    sensor_id: Id,
) -> Result<EventSubscription, Error> {
    let sensor = storage.sensors.find_by_id(sensor_id).await?;

    let subscription = registry.subscribe(sensor.id).await?;
    debug!(
        "Subscription {} created for sensor {}",
        subscription.id, sensor.id
    );

    Ok(subscription)
}

pub async fn unsubscribe(
    registry: &EventRegistry,
    sensor_id: Id,
    subscription_id: SubscriptionId,
) -> Result<(), Error> {
    Ok(registry.unsubscribe(sensor_id, subscription_id).await?)
}

/// Puts the sensor's last known event in the new subscription's mailbox, if it has one.
///
/// A live event that got there first is newer, so the welcome is skipped in that case.
pub async fn welcome(storage: &Storage, subscription: &EventSubscription) -> Result<(), Error> {
    let last = match storage
        .events
        .find_last_by_sensor_id(subscription.sensor_id)
        .await
    {
        Ok(last) => last,
        Err(e) => {
            let e = Error::from(e);
            if e.is_not_found(Resource::Event) {
                return Ok(());
            }
            return Err(e);
        }
    };

    match subscription.writer.try_deliver(last) {
        Ok(()) => Ok(()),
        Err(e) if e.error_kind == SubscriptionErrorKind::MailboxFull => {
            debug!(
                "Skipping welcome for subscription {}: a live event is already waiting",
                subscription.id
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{self, ReportedEvent};
    use crate::sensor::{self, NewSensor};
    use crate::sensors;
    use chrono::Utc;
    use subscription::mailbox::TryRecvError;

    async fn register_sensor(storage: &Storage, serial_number: &str) -> sensors::Model {
        sensor::register(
            storage,
            NewSensor {
                serial_number: serial_number.to_string(),
                sensor_type: "cc".to_string(),
                description: String::new(),
                is_active: true,
            },
        )
        .await
        .unwrap()
    }

    fn reported(serial_number: &str, payload: i64) -> ReportedEvent {
        ReportedEvent {
            timestamp: Some(Utc::now()),
            sensor_serial_number: serial_number.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn subscribe_to_unknown_sensor_is_not_found() {
        let storage = Storage::in_memory();
        let registry = EventRegistry::new();

        let err = subscribe(&storage, &registry, 12).await.unwrap_err();

        assert!(err.is_not_found(Resource::Sensor));
        assert_eq!(registry.subscriber_count(12).await, 0);
    }

    #[tokio::test]
    async fn welcome_delivers_last_known_event() -> Result<(), Error> {
        let storage = Storage::in_memory();
        let registry = EventRegistry::new();
        let sensor = register_sensor(&storage, "5555555555").await;
        event::receive(&storage, &registry, reported("5555555555", 1)).await?;
        let last = event::receive(&storage, &registry, reported("5555555555", 2)).await?;

        let mut subscription = subscribe(&storage, &registry, sensor.id).await?;
        welcome(&storage, &subscription).await?;

        assert_eq!(subscription.reader.recv().await, Some(last));
        Ok(())
    }

    #[tokio::test]
    async fn welcome_without_history_delivers_nothing() -> Result<(), Error> {
        let storage = Storage::in_memory();
        let registry = EventRegistry::new();
        let sensor = register_sensor(&storage, "6666666666").await;

        let mut subscription = subscribe(&storage, &registry, sensor.id).await?;
        welcome(&storage, &subscription).await?;

        assert!(matches!(
            subscription.reader.try_recv(),
            Err(TryRecvError::Empty)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn welcome_yields_to_a_waiting_live_event() -> Result<(), Error> {
        let storage = Storage::in_memory();
        let registry = EventRegistry::new();
        let sensor = register_sensor(&storage, "7777777777").await;
        let stored = event::receive(&storage, &registry, reported("7777777777", 1)).await?;

        let mut subscription = subscribe(&storage, &registry, sensor.id).await?;
        let live = events::Model {
            payload: 2,
            ..stored
        };
        subscription.writer.try_deliver(live.clone())?;

        welcome(&storage, &subscription).await?;

        assert_eq!(subscription.reader.recv().await, Some(live));
        assert!(matches!(
            subscription.reader.try_recv(),
            Err(TryRecvError::Empty)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_not_found() -> Result<(), Error> {
        let storage = Storage::in_memory();
        let registry = EventRegistry::new();
        let sensor = register_sensor(&storage, "8888888888").await;
        let subscription = subscribe(&storage, &registry, sensor.id).await?;

        unsubscribe(&registry, sensor.id, subscription.id).await?;
        let err = unsubscribe(&registry, sensor.id, subscription.id)
            .await
            .unwrap_err();

        assert!(err.is_not_found(Resource::Subscription));
        Ok(())
    }
}
