//! Use cases of the telemetry service.
//!
//! Items from `entity_api` and `subscription` that callers need are re-exported here so the
//! `web` layer only talks to storage and subscriptions through this crate.

pub use entity_api::{events, sensor_owners, sensor_type, sensors, users, Id, Storage};

pub mod error;
pub mod event;
pub mod sensor;
pub mod subscription;
pub mod user;

/// Subscription registry carrying stored sensor events.
pub type EventRegistry = ::subscription::Registry<events::Model>;
