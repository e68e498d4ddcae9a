//! A sensor registered with the service along with its cached last-known state.

use crate::sensor_type::SensorType;
use crate::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::sensors::Model)]
pub struct Model {
    #[serde(skip_deserializing)]
    pub id: Id,

    /// Ten digit serial number printed on the device
    pub serial_number: String,

    #[serde(rename = "type")]
    pub sensor_type: SensorType,

    /// Payload of the most recent event reported by this sensor
    #[serde(default)]
    pub current_state: i64,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_active: bool,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub registered_at: DateTime<Utc>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub last_activity: DateTime<Utc>,
}
