//! A single value reported by a sensor.

use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::events::Model)]
pub struct Model {
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,

    pub sensor_serial_number: String,

    /// Resolved from `sensor_serial_number` when the event is received
    pub sensor_id: Id,

    pub payload: i64,
}
