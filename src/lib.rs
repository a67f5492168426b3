pub mod api;
pub mod config;
mod error;
mod fan;
pub mod monitor;
pub mod view;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use api::{
    ControlAck, ControlHistoryBody, ControlRecord, DeviceBody, DeviceRecord, DevicesBody,
    ErrorBody, FanCommand, Health, ModeCommand, Reply, SensorDataBody, SensorReading, SOURCE,
};

pub use config::Config;
pub use error::{Error, Result};
pub use fan::FanDevice;
pub use monitor::{FanApi, FanMonitor, Gesture, Notice};

pub const DEFAULT_SENSOR_LIMIT: u32 = 100;
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// HTTP client for the fan backend's REST API.
#[derive(Clone)]
pub struct Client {
    url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::with_config(&Config::from_env()?)?)
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Client {
            url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn new(url: impl ToString) -> Result<Self> {
        Self::with_config(&Config {
            base_url: url.to_string(),
            ..Config::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// Sends the request and decodes a 200 body. Anything else becomes
    /// [`Error::Http`], keeping the server's message if it sent one.
    async fn exchange<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .unwrap_or_default()
                .error;
            warn!("backend answered {status}: {message:?}");
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.url, path);
        debug!("GET {url}");
        self.exchange(self.http.get(url)).await
    }

    /// `GET /devices/{id}`
    pub async fn device(&self, device_id: &str) -> Result<DeviceRecord> {
        let reply: Reply<DeviceBody> = self.get(&format!("/devices/{device_id}")).await?;
        reply.into_body()?.device.ok_or(Error::MissingField("device"))
    }

    /// `GET /devices/`
    pub async fn devices(&self) -> Result<Vec<DeviceRecord>> {
        let reply: Reply<DevicesBody> = self.get("/devices/").await?;
        reply.into_body()?.devices.ok_or(Error::MissingField("devices"))
    }

    /// `GET /devices/{id}/sensor-data`, newest first.
    pub async fn sensor_data(&self, device_id: &str, limit: u32) -> Result<Vec<SensorReading>> {
        let reply: Reply<SensorDataBody> = self
            .get(&format!("/devices/{device_id}/sensor-data?limit={limit}"))
            .await?;
        reply
            .into_body()?
            .sensor_data
            .ok_or(Error::MissingField("sensor_data"))
    }

    /// `GET /devices/{id}/control-history`, newest first.
    pub async fn control_history(
        &self,
        device_id: &str,
        limit: u32,
    ) -> Result<Vec<ControlRecord>> {
        let reply: Reply<ControlHistoryBody> = self
            .get(&format!("/devices/{device_id}/control-history?limit={limit}"))
            .await?;
        reply
            .into_body()?
            .control_history
            .ok_or(Error::MissingField("control_history"))
    }

    /// `GET /health`. Not wrapped in the usual success envelope.
    pub async fn health(&self) -> Result<Health> {
        self.get("/health").await
    }

    /// `POST /control/{id}/fan`
    pub async fn set_fan(&self, device_id: &str, on: bool) -> Result<ControlAck> {
        let url = format!("{}/control/{device_id}/fan", self.url);
        debug!("POST {url} status={on}");
        let command = FanCommand {
            status: on,
            source: SOURCE,
        };
        let reply: Reply<ControlAck> = self.exchange(self.http.post(url).json(&command)).await?;
        reply.into_body()
    }

    /// `POST /control/{id}/mode`
    pub async fn set_mode(&self, device_id: &str, auto: bool) -> Result<ControlAck> {
        let url = format!("{}/control/{device_id}/mode", self.url);
        debug!("POST {url} mode={auto}");
        let command = ModeCommand {
            mode: auto,
            source: SOURCE,
        };
        let reply: Reply<ControlAck> = self.exchange(self.http.post(url).json(&command)).await?;
        reply.into_body()
    }
}

#[async_trait]
impl FanApi for Client {
    async fn device(&self, device_id: &str) -> Result<DeviceRecord> {
        Client::device(self, device_id).await
    }

    async fn set_fan(&self, device_id: &str, on: bool) -> Result<()> {
        Client::set_fan(self, device_id, on).await.map(drop)
    }

    async fn set_mode(&self, device_id: &str, auto: bool) -> Result<()> {
        Client::set_mode(self, device_id, auto).await.map(drop)
    }
}
