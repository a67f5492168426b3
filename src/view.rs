//! What the user sees: one panel per fan.
//!
//! Panels are rebuilt from [`FanDevice`] records whenever the monitor
//! renders. Toggles distinguish programmatic updates from user gestures so
//! that re-rendering never looks like the user asked for something.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use crossterm::style::{Color, Stylize};
use log::debug;

use crate::FanDevice;

/// `yyyy-MM-ddTHH:mm:ss.SSSZ`, always UTC.
pub const WIRE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";

/// `HH:mm:ss dd/MM/yyyy`
pub const DISPLAY_TIMESTAMP: &str = "%H:%M:%S %d/%m/%Y";

pub fn format_temperature(temperature: f32) -> String {
    format!("{temperature:.1}")
}

pub fn parse_last_seen(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, WIRE_TIMESTAMP).map(|naive| naive.and_utc())
}

/// Renders a wire timestamp in `zone`. Unparseable input is returned as-is.
pub fn format_last_seen_in<Tz>(raw: &str, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match parse_last_seen(raw) {
        Ok(seen) => seen
            .with_timezone(zone)
            .format(DISPLAY_TIMESTAMP)
            .to_string(),
        Err(e) => {
            debug!("showing last_seen {raw:?} verbatim: {e}");
            raw.to_string()
        }
    }
}

pub fn format_last_seen(raw: &str) -> String {
    format_last_seen_in(raw, &Local)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    On,
    Off,
}

impl From<StatusColor> for Color {
    fn from(status: StatusColor) -> Self {
        match status {
            StatusColor::On => Color::Green,
            StatusColor::Off => Color::Red,
        }
    }
}

/// A two-state switch.
///
/// [`Toggle::set`] is the programmatic path and never reports a change.
/// [`Toggle::flip`] is the gesture path and reports only real changes, so an
/// echo of the state already shown is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toggle {
    checked: bool,
    enabled: bool,
}

impl Toggle {
    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set(&mut self, checked: bool, enabled: bool) {
        self.checked = checked;
        self.enabled = enabled;
    }

    #[must_use]
    pub fn flip(&mut self, checked: bool) -> Option<bool> {
        if self.checked == checked {
            return None;
        }
        self.checked = checked;
        Some(checked)
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.checked { "x" } else { " " };
        if self.enabled {
            write!(f, "[{mark}]")
        } else {
            write!(f, "[{mark}] (locked)")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub device_id: String,
    pub name: String,
    pub temperature: String,
    pub status: &'static str,
    pub status_color: StatusColor,
    pub last_updated: String,
    /// Follows `fan_status`. Enabled only in MANUAL.
    pub power: Toggle,
    /// Follows `auto_mode`.
    pub mode: Toggle,
}

impl Panel {
    pub fn new(fan: &FanDevice) -> Self {
        let mut panel = Panel {
            device_id: fan.id.clone(),
            name: String::new(),
            temperature: String::new(),
            status: "",
            status_color: StatusColor::Off,
            last_updated: String::new(),
            power: Toggle::default(),
            mode: Toggle::default(),
        };
        panel.update(fan);
        panel
    }

    pub fn update(&mut self, fan: &FanDevice) {
        self.update_in(fan, &Local)
    }

    pub fn update_in<Tz>(&mut self, fan: &FanDevice, zone: &Tz)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.device_id = fan.id.clone();
        self.name = fan.name.clone();
        self.temperature = format_temperature(fan.temperature);
        (self.status, self.status_color) = if fan.fan_status {
            ("ON", StatusColor::On)
        } else {
            ("OFF", StatusColor::Off)
        };
        self.last_updated = format!(
            "Last updated: {}",
            format_last_seen_in(&fan.last_seen, zone)
        );
        self.power.set(fan.fan_status, !fan.auto_mode);
        self.mode.set(fan.auto_mode, true);
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.mode.checked() { "AUTO" } else { "MANUAL" };
        writeln!(f, "{} ({})", self.name.as_str().bold(), self.device_id)?;
        writeln!(f, "  temperature  {}°C", self.temperature)?;
        writeln!(
            f,
            "  fan          {}    power {}",
            self.status.with(self.status_color.into()),
            self.power
        )?;
        writeln!(f, "  mode         {mode}  auto  {}", self.mode)?;
        write!(f, "  {}", self.last_updated)
    }
}
