use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every endpoint except `/health` wraps its payload in
/// `{ "success": .., "error": .., <payload fields> }`.
#[derive(Deserialize, Debug)]
pub(crate) struct Reply<T> {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Reply<T> {
    pub fn into_body(self) -> Result<T> {
        if self.success {
            Ok(self.body)
        } else {
            Err(Error::Application(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Just the message out of an error body, for non-200 responses.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DeviceBody {
    #[serde(default)]
    pub device: Option<DeviceRecord>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DevicesBody {
    #[serde(default)]
    pub devices: Option<Vec<DeviceRecord>>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SensorDataBody {
    #[serde(default)]
    pub sensor_data: Option<Vec<SensorReading>>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ControlHistoryBody {
    #[serde(default)]
    pub control_history: Option<Vec<ControlRecord>>,
}

/// Device as the backend reports it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,

    // null until the first reading arrives
    #[serde(default)]
    pub last_temperature: Option<f64>,
    pub fan_status: bool,
    pub auto_mode: bool,

    // null until the device has reported once
    #[serde(default)]
    pub last_seen: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Returned by both control endpoints. Only `success`/`error` are relied on;
/// the echoed state is informational.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ControlAck {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub fan_status: Option<bool>,
    #[serde(default)]
    pub auto_mode: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub id: i64,
    pub device_id: String,
    pub temperature: f64,
    pub fan_status: bool,
    pub auto_mode: bool,
    pub timestamp: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ControlRecord {
    pub id: i64,
    pub device_id: String,
    // fan_control, mode_change
    pub command_type: String,
    // on, off, auto, manual
    pub command_value: String,
    // app, auto, schedule
    pub source: String,
    pub timestamp: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Health {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

pub(crate) const SOURCE: &str = "app";

#[derive(Serialize, Debug)]
pub(crate) struct FanCommand {
    pub status: bool,
    pub source: &'static str,
}

#[derive(Serialize, Debug)]
pub(crate) struct ModeCommand {
    pub mode: bool,
    pub source: &'static str,
}
