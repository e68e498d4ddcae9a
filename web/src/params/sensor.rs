use chrono::{DateTime, Utc};
use domain::sensor::NewSensor;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::sensor::CreateParams)]
pub struct CreateParams {
    /// Ten digit serial number printed on the device
    #[schema(example = "1234567890")]
    pub serial_number: String,
    /// `cc` (contact closure) or `adc` (analog-to-digital converter)
    #[serde(rename = "type")]
    #[schema(example = "cc")]
    pub sensor_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active: bool,
}

impl From<CreateParams> for NewSensor {
    fn from(params: CreateParams) -> Self {
        NewSensor {
            serial_number: params.serial_number,
            sensor_type: params.sensor_type,
            description: params.description,
            is_active: params.is_active,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Start of the range, inclusive
    #[param(value_type = String, format = DateTime)]
    pub start_date: DateTime<Utc>,
    /// End of the range, inclusive
    #[param(value_type = String, format = DateTime)]
    pub end_date: DateTime<Utc>,
}
