use super::error::{Error, Record};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::{events::Model, Id};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use log::*;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event_model: Model) -> Result<Model, Error>;

    /// Returns the event with the latest timestamp reported by the sensor.
    async fn find_last_by_sensor_id(&self, sensor_id: Id) -> Result<Model, Error>;

    /// Returns every event of the sensor with `start <= timestamp <= end`, oldest first.
    async fn find_by_sensor_id_between(
        &self,
        sensor_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Model>, Error>;
}

// Events are keyed by (timestamp, arrival sequence) so equal timestamps keep insertion order
type Timeline = BTreeMap<(DateTime<Utc>, u64), Model>;

#[derive(Default)]
struct EventTable {
    by_sensor_id: HashMap<Id, Timeline>,
    sequence: u64,
}

#[derive(Default)]
pub struct InMemoryEvents {
    table: RwLock<EventTable>,
}

#[async_trait]
impl EventRepository for InMemoryEvents {
    async fn create(&self, event_model: Model) -> Result<Model, Error> {
        trace!("New Event Model to be inserted: {event_model:?}");

        let mut table = self.table.write().await;
        table.sequence += 1;
        let key = (event_model.timestamp, table.sequence);

        table
            .by_sensor_id
            .entry(event_model.sensor_id)
            .or_default()
            .insert(key, event_model.clone());

        Ok(event_model)
    }

    async fn find_last_by_sensor_id(&self, sensor_id: Id) -> Result<Model, Error> {
        self.table
            .read()
            .await
            .by_sensor_id
            .get(&sensor_id)
            .and_then(|timeline| timeline.values().next_back())
            .cloned()
            .ok_or_else(|| Error::not_found(Record::Event))
    }

    async fn find_by_sensor_id_between(
        &self,
        sensor_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Model>, Error> {
        if start > end {
            return Ok(Vec::new());
        }

        let table = self.table.read().await;
        // A sensor that never reported simply has an empty history
        let events = match table.by_sensor_id.get(&sensor_id) {
            Some(timeline) => timeline
                .range((start, u64::MIN)..=(end, u64::MAX))
                .map(|(_, event)| event.clone())
                .collect(),
            None => Vec::new(),
        };

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityApiErrorKind;
    use chrono::Duration;

    fn event_model(sensor_id: Id, timestamp: DateTime<Utc>, payload: i64) -> Model {
        Model {
            timestamp,
            sensor_serial_number: "1234567890".to_owned(),
            sensor_id,
            payload,
        }
    }

    #[tokio::test]
    async fn find_last_by_sensor_id_returns_latest_timestamp() -> Result<(), Error> {
        let events = InMemoryEvents::default();
        let now = Utc::now();

        events.create(event_model(1, now, 10)).await?;
        events
            .create(event_model(1, now - Duration::seconds(5), 20))
            .await?;
        events.create(event_model(2, now + Duration::seconds(5), 30)).await?;

        let last = events.find_last_by_sensor_id(1).await?;

        assert_eq!(last.payload, 10);
        Ok(())
    }

    #[tokio::test]
    async fn find_last_by_sensor_id_returns_not_found_without_events() {
        let events = InMemoryEvents::default();

        let result = events.find_last_by_sensor_id(7).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordNotFound(Record::Event)
        );
    }

    #[tokio::test]
    async fn find_by_sensor_id_between_is_inclusive_and_ordered() -> Result<(), Error> {
        let events = InMemoryEvents::default();
        let start = Utc::now();

        for offset in [3, 0, 1, 5, 2] {
            events
                .create(event_model(1, start + Duration::seconds(offset), offset))
                .await?;
        }

        let history = events
            .find_by_sensor_id_between(1, start, start + Duration::seconds(3))
            .await?;

        let payloads: Vec<i64> = history.iter().map(|event| event.payload).collect();
        assert_eq!(payloads, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn events_with_equal_timestamps_are_all_kept() -> Result<(), Error> {
        let events = InMemoryEvents::default();
        let now = Utc::now();

        events.create(event_model(1, now, 1)).await?;
        events.create(event_model(1, now, 1)).await?;

        let history = events.find_by_sensor_id_between(1, now, now).await?;

        assert_eq!(history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn history_of_unknown_sensor_is_empty() -> Result<(), Error> {
        let events = InMemoryEvents::default();
        let now = Utc::now();

        let history = events
            .find_by_sensor_id_between(99, now - Duration::hours(1), now)
            .await?;

        assert!(history.is_empty());
        Ok(())
    }
}
