//! Keeps the two fan records in step with the backend.
//!
//! Fetches replace a record wholesale. Control calls patch one field, and
//! only after the backend confirmed the change; any failure drops the
//! optimism and re-fetches both devices instead.

use std::collections::VecDeque;

use async_trait::async_trait;
use log::{error, info, warn};

use crate::api::DeviceRecord;
use crate::error::{Error, Result};
use crate::view::Panel;
use crate::FanDevice;

/// The three backend calls the monitor needs.
#[async_trait]
pub trait FanApi: Send + Sync {
    async fn device(&self, device_id: &str) -> Result<DeviceRecord>;
    async fn set_fan(&self, device_id: &str, on: bool) -> Result<()>;
    async fn set_mode(&self, device_id: &str, auto: bool) -> Result<()>;
}

/// Short message for the user, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Failure(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Failure(text) => text,
        }
    }
}

/// Something the user did to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Pull-to-refresh or the refresh button.
    Refresh,
    /// Dragged the power toggle of `device` to `on`.
    Power { device: String, on: bool },
    /// Dragged the mode toggle of `device` to `auto`.
    Mode { device: String, auto: bool },
}

pub struct FanMonitor<A> {
    api: A,
    // fixed slots, indexed the same as `fans` and `panels`
    ids: [String; 2],
    fans: [FanDevice; 2],
    panels: [Panel; 2],
    notices: VecDeque<Notice>,
    refreshing: bool,
    renders: usize,
}

impl<A: FanApi> FanMonitor<A> {
    pub fn new(api: A, device_ids: &[String; 2]) -> Self {
        let fans = [0usize, 1].map(|slot| {
            FanDevice::placeholder(&device_ids[slot], format!("Exhaust Fan {}", slot + 1))
        });
        let panels = [Panel::new(&fans[0]), Panel::new(&fans[1])];
        FanMonitor {
            api,
            ids: device_ids.clone(),
            fans,
            panels,
            notices: VecDeque::new(),
            refreshing: false,
            renders: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn fan(&self, device_id: &str) -> Option<&FanDevice> {
        self.slot(device_id).ok().map(|slot| &self.fans[slot])
    }

    pub fn panels(&self) -> &[Panel; 2] {
        &self.panels
    }

    pub fn panel(&self, device_id: &str) -> Option<&Panel> {
        self.slot(device_id).ok().map(|slot| &self.panels[slot])
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// How many times the panels have been rebuilt.
    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn slot(&self, device_id: &str) -> Result<usize> {
        self.ids
            .iter()
            .position(|id| id == device_id)
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    /// Rebuilds both panels from the records. Toggles are set without
    /// producing gestures.
    pub fn render(&mut self) {
        for (panel, fan) in self.panels.iter_mut().zip(&self.fans) {
            panel.update(fan);
        }
        self.renders += 1;
    }

    pub async fn handle(&mut self, gesture: Gesture) {
        // a refresh whose future was dropped never got to clear the flag
        self.refreshing = false;
        match gesture {
            Gesture::Refresh => {
                self.refresh().await;
            }
            Gesture::Power { device, on } => {
                let Ok(slot) = self.slot(&device) else {
                    warn!("power gesture for unknown device {device}");
                    return;
                };
                if self.panels[slot].power.flip(on).is_none() {
                    return;
                }
                let _ = self.set_fan_power(&device, on).await;
            }
            Gesture::Mode { device, auto } => {
                let Ok(slot) = self.slot(&device) else {
                    warn!("mode gesture for unknown device {device}");
                    return;
                };
                if self.panels[slot].mode.flip(auto).is_none() {
                    return;
                }
                let _ = self.set_auto_mode(&device, auto).await;
            }
        }
    }

    /// Fetches both devices, one after the other. A failure on one device
    /// leaves its record alone and does not stop the other from being
    /// fetched. Returns the number of devices that failed.
    pub async fn refresh(&mut self) -> usize {
        self.refreshing = true;

        let mut failed = 0;
        for id in self.ids.clone() {
            if let Err(e) = self.fetch_device(&id).await {
                failed += 1;
                self.notify(Notice::Failure(format!("Failed to refresh data: {e}")));
            }
        }

        self.render();
        self.refreshing = false;
        failed
    }

    /// Replaces the record for `device_id` with the backend's. Does not
    /// render.
    pub async fn fetch_device(&mut self, device_id: &str) -> Result<()> {
        let slot = self.slot(device_id)?;
        match self.api.device(device_id).await.and_then(FanDevice::try_from) {
            Ok(fan) => {
                self.fans[slot] = fan;
                Ok(())
            }
            Err(e) => {
                error!("fetching {device_id}: {e}");
                Err(e)
            }
        }
    }

    /// Switches the fan on or off. Refused locally, without a request, while
    /// the device is in AUTO.
    pub async fn set_fan_power(&mut self, device_id: &str, on: bool) -> Result<()> {
        self.refreshing = false;
        let slot = self.slot(device_id)?;
        if self.fans[slot].auto_mode {
            let e = Error::AutoModeActive;
            info!("not switching {device_id}: {e}");
            self.notify(Notice::Failure(e.to_string()));
            self.render();
            return Err(e);
        }

        match self.api.set_fan(device_id, on).await {
            Ok(()) => {
                self.fans[slot].fan_status = on;
                self.render();
                self.notify(Notice::Info(format!("Fan {}", on_off(on))));
                Ok(())
            }
            Err(e) => Err(self.resync("fan control", device_id, e).await),
        }
    }

    pub async fn set_auto_mode(&mut self, device_id: &str, auto: bool) -> Result<()> {
        self.refreshing = false;
        let slot = self.slot(device_id)?;
        match self.api.set_mode(device_id, auto).await {
            Ok(()) => {
                self.fans[slot].auto_mode = auto;
                self.render();
                self.notify(Notice::Info(format!("Mode changed to {}", auto_manual(auto))));
                Ok(())
            }
            Err(e) => Err(self.resync("mode control", device_id, e).await),
        }
    }

    async fn resync(&mut self, what: &str, device_id: &str, e: Error) -> Error {
        if e.is_server_reported() {
            warn!("{what} for {device_id} refused: {e}");
        } else {
            error!("{what} for {device_id} failed: {e}");
        }
        self.notify(Notice::Failure(format!("Control failed: {e}")));
        self.refresh().await;
        e
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn auto_manual(auto: bool) -> &'static str {
    if auto {
        "AUTO"
    } else {
        "MANUAL"
    }
}
