use chrono::Utc;
use domain::event::ReportedEvent;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::event::CreateParams)]
pub struct CreateParams {
    #[schema(example = "1234567890")]
    pub sensor_serial_number: String,
    pub payload: i64,
}

impl CreateParams {
    /// Events are timestamped by the server when they arrive.
    pub fn into_reported_event(self) -> ReportedEvent {
        ReportedEvent {
            timestamp: Some(Utc::now()),
            sensor_serial_number: self.sensor_serial_number,
            payload: self.payload,
        }
    }
}
