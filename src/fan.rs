use crate::api::DeviceRecord;
use crate::error::Error;

/// Last known state of one exhaust fan.
#[derive(Debug, Clone, PartialEq)]
pub struct FanDevice {
    pub id: String,
    pub name: String,
    pub temperature: f32,
    pub fan_status: bool,
    pub auto_mode: bool,
    /// `yyyy-MM-ddTHH:mm:ss.SSSZ`, or empty if never seen.
    pub last_seen: String,
}

impl FanDevice {
    /// Start-up state before the first fetch: cold, off, in AUTO.
    pub fn placeholder(id: impl ToString, name: impl ToString) -> Self {
        FanDevice {
            id: id.to_string(),
            name: name.to_string(),
            temperature: 0.0,
            fan_status: false,
            auto_mode: true,
            last_seen: String::new(),
        }
    }
}

/// A monitored fan needs a reading; a device that never reported one is
/// refused rather than shown as 0.
impl TryFrom<DeviceRecord> for FanDevice {
    type Error = Error;

    fn try_from(record: DeviceRecord) -> Result<Self, Error> {
        let temperature = record
            .last_temperature
            .ok_or(Error::MissingField("last_temperature"))?;
        Ok(FanDevice {
            id: record.id,
            name: record.name,
            temperature: temperature as f32,
            fan_status: record.fan_status,
            auto_mode: record.auto_mode,
            last_seen: record.last_seen.unwrap_or_default(),
        })
    }
}
