use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// The kind of hardware a sensor reports from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, ToSchema)]
pub enum SensorType {
    /// Contact closure: reports an on/off state
    #[serde(rename = "cc")]
    ContactClosure,
    /// Analog-to-digital converter: reports a sampled value
    #[serde(rename = "adc")]
    Adc,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SensorTypeParseError(pub String);

impl std::fmt::Display for SensorTypeParseError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "unknown sensor type `{}`, expected `cc` or `adc`", self.0)
    }
}

impl std::error::Error for SensorTypeParseError {}

impl FromStr for SensorType {
    type Err = SensorTypeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cc" => Ok(SensorType::ContactClosure),
            "adc" => Ok(SensorType::Adc),
            other => Err(SensorTypeParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorType::ContactClosure => write!(fmt, "cc"),
            SensorType::Adc => write!(fmt, "adc"),
        }
    }
}
