//! Storage collaborators for sensors, events, users and sensor ownership.
//!
//! Each record type is accessed through an async repository trait so the domain layer never
//! depends on a concrete backend. The in-memory implementations in this crate are what the
//! service runs with; a SQL backend only has to implement the same traits.

use std::sync::Arc;

pub use entity::{events, sensor_owners, sensor_type, sensors, users, Id};

pub mod error;
pub mod event;
pub mod sensor;
pub mod sensor_owner;
pub mod user;

pub use event::EventRepository;
pub use sensor::SensorRepository;
pub use sensor_owner::SensorOwnerRepository;
pub use user::UserRepository;

/// Handle to every repository the domain layer talks to. Cheap to clone.
#[derive(Clone)]
pub struct Storage {
    pub sensors: Arc<dyn SensorRepository>,
    pub events: Arc<dyn EventRepository>,
    pub users: Arc<dyn UserRepository>,
    pub sensor_owners: Arc<dyn SensorOwnerRepository>,
}

impl Storage {
    pub fn new(
        sensors: Arc<dyn SensorRepository>,
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
        sensor_owners: Arc<dyn SensorOwnerRepository>,
    ) -> Self {
        Self {
            sensors,
            events,
            users,
            sensor_owners,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(sensor::InMemorySensors::default()),
            Arc::new(event::InMemoryEvents::default()),
            Arc::new(user::InMemoryUsers::default()),
            Arc::new(sensor_owner::InMemorySensorOwners::default()),
        )
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::in_memory()
    }
}
