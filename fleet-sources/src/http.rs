//! HTTP source: polls a telemetry producer's REST API
//!
//! Bulk endpoint (`GET {base}{bulk_path}`) must answer with a JSON array of
//! samples. The per-vehicle endpoint (`GET {base}{vehicle_path}/{id}`) may
//! answer with a single object, an array (first entry for the vehicle wins)
//! or 404.

use async_trait::async_trait;
use fleet_core::normalize::raw_vehicle_id;
use fleet_core::{ConfigError, RawSample, SourceError, TelemetrySource};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BULK_PATH: &str = "/api/telemetry";
pub const DEFAULT_VEHICLE_PATH: &str = "/api/vehicle-telemetry";

pub struct HttpSource {
    bulk_url: Url,
    vehicle_url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSource {
    /// Client for the producer at `base_url` using the default paths
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Self::with_paths(base_url, DEFAULT_BULK_PATH, DEFAULT_VEHICLE_PATH, timeout)
    }

    pub fn with_paths(
        base_url: &str,
        bulk_path: &str,
        vehicle_path: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let bulk_url = join_url(base_url, bulk_path)?;
        let vehicle_url = join_url(base_url, vehicle_path)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Source(format!("HTTP client: {}", e)))?;

        Ok(Self {
            bulk_url,
            vehicle_url,
            timeout,
            client,
        })
    }

    fn vehicle_url_for(&self, vehicle_id: &str) -> Result<Url, SourceError> {
        let mut url = self.vehicle_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Unavailable("vehicle URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push(vehicle_id);
        Ok(url)
    }

    /// Map a transport error onto the engine's error kinds
    fn classify_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }

    async fn get_json(&self, url: Url) -> Result<Option<Value>, SourceError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| self.classify_error(e))?;
        Ok(Some(body))
    }
}

fn join_url(base_url: &str, path: &str) -> Result<Url, ConfigError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let url = Url::parse(&joined)
        .map_err(|e| ConfigError::Source(format!("invalid URL {:?}: {}", joined, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Source(format!(
            "unsupported URL scheme {:?} in {}",
            other, joined
        ))),
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_all(&self) -> Result<Vec<RawSample>, SourceError> {
        match self.get_json(self.bulk_url.clone()).await? {
            Some(Value::Array(samples)) => Ok(samples),
            Some(other) => Err(SourceError::Malformed(format!(
                "expected a JSON array of samples, got {}",
                json_kind(&other)
            ))),
            // The bulk endpoint itself is missing: treat like any other bad status
            None => Err(SourceError::Status(StatusCode::NOT_FOUND.as_u16())),
        }
    }

    async fn fetch_vehicle(&self, vehicle_id: &str) -> Result<Option<RawSample>, SourceError> {
        let url = self.vehicle_url_for(vehicle_id)?;
        match self.get_json(url).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(samples)) => Ok(samples
                .into_iter()
                .find(|raw| raw_vehicle_id(raw).as_deref() == Some(vehicle_id))),
            Some(sample @ Value::Object(_)) => Ok(Some(sample)),
            Some(other) => Err(SourceError::Malformed(format!(
                "expected a sample object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
